// MANIMATOR PDF Tools - Document Acquisition & Compaction
// Copyright (c) 2026 Xing_The_Creator | MANIMATOR
//
// Shrinks uploaded or downloaded papers before they are inlined into a
// multimodal completion request. Compaction is best effort: any document
// lopdf cannot round-trip is sent as-is.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use flate2::{write::ZlibEncoder, Compression};
use lopdf::{Document, Object};
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("invalid document URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid arXiv identifier '{0}'")]
    InvalidPaperId(String),
    #[error("failed to fetch PDF from {url}: {reason}")]
    FetchFailed { url: String, reason: String },
    #[error("failed to fetch PDF from {url}: HTTP {status}")]
    FetchStatus { url: String, status: u16 },
    #[error("failed to read few-shot document {path}: {source}")]
    FewShotUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
enum RecompressError {
    #[error(transparent)]
    Pdf(#[from] lopdf::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("document has no pages")]
    NoPages,
}

/// Re-serialize `content` with its streams deflated at `level` (clamped to
/// 1..=9) and return it base64-encoded. Never fails: when the document cannot
/// be parsed or written back, the original bytes are encoded unchanged.
pub fn compress(content: &[u8], level: u8) -> String {
    let level = level.clamp(1, 9);
    match recompress(content, level) {
        Ok(compacted) => {
            debug!(
                "[PDF] Compacted document {} -> {} bytes (level {})",
                content.len(),
                compacted.len(),
                level
            );
            STANDARD.encode(compacted)
        }
        Err(e) => {
            warn!("[PDF] Compaction skipped, sending original bytes: {}", e);
            STANDARD.encode(content)
        }
    }
}

fn recompress(content: &[u8], level: u8) -> Result<Vec<u8>, RecompressError> {
    let mut doc = Document::load_mem(content)?;
    if doc.get_pages().is_empty() {
        return Err(RecompressError::NoPages);
    }

    // Drop everything the page tree no longer references.
    doc.prune_objects();

    for object in doc.objects.values_mut() {
        if let Object::Stream(stream) = object {
            if !stream.allows_compression || stream.dict.get(b"Filter").is_ok() {
                continue;
            }
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(u32::from(level)));
            encoder.write_all(&stream.content)?;
            let deflated = encoder.finish()?;
            if deflated.len() < stream.content.len() {
                stream.dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
                stream.set_content(deflated);
            }
        }
    }

    let mut out = Vec::with_capacity(content.len());
    doc.save_to(&mut out)?;
    Ok(out)
}

/// Download a PDF. No retry: a failed or non-2xx fetch is reported as is.
pub async fn fetch_remote_pdf(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, PdfError> {
    let parsed = Url::parse(url).map_err(|e| PdfError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(PdfError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    info!("[PDF] Fetching remote document: {}", parsed);
    let response = client
        .get(parsed.clone())
        .send()
        .await
        .map_err(|e| PdfError::FetchFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(PdfError::FetchStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let bytes = response.bytes().await.map_err(|e| PdfError::FetchFailed {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    info!("[PDF] Downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}

/// URL of the PDF for an arXiv paper id such as `1512.03385` or `1512.03385v1`.
pub fn arxiv_pdf_url(base: &str, paper_id: &str) -> Result<String, PdfError> {
    let id = paper_id.trim();
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        && !id.contains("..");
    if !valid {
        return Err(PdfError::InvalidPaperId(paper_id.to_string()));
    }
    Ok(format!("{}/{}", base.trim_end_matches('/'), id))
}

/// Load the PDF few-shot exemplar as base64. A file that already holds base64
/// text is used verbatim (trimmed); anything else is treated as raw PDF bytes.
pub fn encode_few_shot_document(path: &Path) -> Result<String, PdfError> {
    let bytes = std::fs::read(path).map_err(|source| PdfError::FewShotUnreadable {
        path: path.display().to_string(),
        source,
    })?;

    if bytes.starts_with(b"%PDF") {
        return Ok(STANDARD.encode(&bytes));
    }
    match std::str::from_utf8(&bytes) {
        Ok(text) => Ok(text.trim().to_string()),
        Err(_) => Ok(STANDARD.encode(&bytes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    fn sample_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let body = b"BT /F1 12 Tf 72 712 Td (Residual learning) Tj ET\n".repeat(64);
        let content_id = doc.add_object(Stream::new(dictionary! {}, body));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[test]
    fn test_malformed_input_falls_back_to_original() {
        let garbage = b"definitely not a pdf";
        assert_eq!(compress(garbage, 5), STANDARD.encode(garbage));
    }

    #[test]
    fn test_empty_input_falls_back_to_original() {
        assert_eq!(compress(b"", 5), "");
    }

    #[test]
    fn test_compacts_uncompressed_streams() {
        let original = sample_pdf();
        let encoded = compress(&original, 9);
        let decoded = STANDARD.decode(encoded).unwrap();

        assert!(decoded.starts_with(b"%PDF"));
        assert!(decoded.len() < original.len());

        let reloaded = Document::load_mem(&decoded).unwrap();
        assert_eq!(reloaded.get_pages().len(), 1);
    }

    #[test]
    fn test_recompressing_is_stable() {
        let once = STANDARD.decode(compress(&sample_pdf(), 5)).unwrap();
        let twice = STANDARD.decode(compress(&once, 5)).unwrap();
        let pages = Document::load_mem(&twice).unwrap().get_pages().len();
        assert_eq!(pages, 1);
        // Already deflated streams are left alone.
        assert!(twice.len() <= once.len() + 64);
    }

    #[test]
    fn test_out_of_range_level_is_clamped() {
        let pdf = sample_pdf();
        let zero = STANDARD.decode(compress(&pdf, 0)).unwrap();
        let huge = STANDARD.decode(compress(&pdf, 200)).unwrap();
        assert!(zero.starts_with(b"%PDF"));
        assert!(huge.starts_with(b"%PDF"));
    }

    #[test]
    fn test_arxiv_pdf_url() {
        assert_eq!(
            arxiv_pdf_url("https://arxiv.org/pdf/", "1512.03385").unwrap(),
            "https://arxiv.org/pdf/1512.03385"
        );
        assert!(arxiv_pdf_url("https://arxiv.org/pdf", "2310.11453v1").is_ok());
        assert!(arxiv_pdf_url("https://arxiv.org/pdf", "../etc/passwd").is_err());
        assert!(arxiv_pdf_url("https://arxiv.org/pdf", "a b").is_err());
        assert!(arxiv_pdf_url("https://arxiv.org/pdf", "").is_err());
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_http_urls() {
        let client = reqwest::Client::new();
        let err = fetch_remote_pdf(&client, "file:///etc/passwd").await.unwrap_err();
        assert!(matches!(err, PdfError::InvalidUrl { .. }));

        let err = fetch_remote_pdf(&client, "not a url").await.unwrap_err();
        assert!(matches!(err, PdfError::InvalidUrl { .. }));
    }

    #[test]
    fn test_few_shot_document_accepts_base64_or_pdf() {
        let dir = tempfile::tempdir().unwrap();

        let txt = dir.path().join("few_shot.txt");
        std::fs::write(&txt, "  SGVsbG8=\n").unwrap();
        assert_eq!(encode_few_shot_document(&txt).unwrap(), "SGVsbG8=");

        let pdf_path = dir.path().join("few_shot.pdf");
        let pdf = sample_pdf();
        std::fs::write(&pdf_path, &pdf).unwrap();
        assert_eq!(encode_few_shot_document(&pdf_path).unwrap(), STANDARD.encode(&pdf));

        let missing = dir.path().join("missing.pdf");
        assert!(encode_few_shot_document(&missing).is_err());
    }
}
