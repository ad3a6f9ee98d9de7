// MANIMATOR Error Taxonomy
// Copyright (c) 2026 Xing_The_Creator | MANIMATOR

use std::path::PathBuf;
use thiserror::Error;

use crate::agent::llm_bridge::CompletionError;
use crate::agent::pdf_tools::PdfError;
use crate::agent::render_supervisor::RenderError;
use crate::agent::workspace::WorkspaceError;

/// Failures of the two LLM-backed generation stages.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Empty PDF file provided")]
    EmptyDocument,
    #[error("A non-empty {0} is required")]
    EmptyInput(&'static str),
    #[error("{0} is not set; cannot run this stage")]
    MissingModel(&'static str),
    #[error("{stage} failed on model '{model}': {source}")]
    Completion {
        stage: &'static str,
        model: String,
        #[source]
        source: CompletionError,
    },
}

/// Why a model reply could not be turned into a renderable code unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOutputReason {
    NoCodeBlock,
    NoEntryPoint,
}

impl std::fmt::Display for NoOutputReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoOutputReason::NoCodeBlock => write!(f, "No valid Manim code generated"),
            NoOutputReason::NoEntryPoint => write!(f, "No Scene class found in code"),
        }
    }
}

/// Coarse classification used by HTTP and CLI surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Provider,
    NoUsableOutput,
    Render,
    Internal,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("no usable output: {0}")]
    NoUsableOutput(NoOutputReason),
    #[error(transparent)]
    Pdf(#[from] PdfError),
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("render failed: artifact missing at {}", .0.display())]
    ArtifactMissing(PathBuf),
    #[error("invalid pipeline setup: {0}")]
    Setup(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Generation(GenerationError::EmptyDocument)
            | PipelineError::Generation(GenerationError::EmptyInput(_)) => ErrorKind::Input,
            PipelineError::Generation(GenerationError::MissingModel(_)) => ErrorKind::Internal,
            PipelineError::Generation(GenerationError::Completion { .. }) => ErrorKind::Provider,
            PipelineError::NoUsableOutput(_) => ErrorKind::NoUsableOutput,
            PipelineError::Pdf(PdfError::InvalidUrl { .. })
            | PipelineError::Pdf(PdfError::InvalidPaperId(_)) => ErrorKind::Input,
            PipelineError::Pdf(PdfError::FetchFailed { .. })
            | PipelineError::Pdf(PdfError::FetchStatus { .. }) => ErrorKind::Provider,
            PipelineError::Pdf(PdfError::FewShotUnreadable { .. }) => ErrorKind::Internal,
            PipelineError::Render(_) | PipelineError::ArtifactMissing(_) => ErrorKind::Render,
            PipelineError::Workspace(_) | PipelineError::Setup(_) => ErrorKind::Internal,
        }
    }

    /// Whether a caller re-running the whole pipeline could get a different
    /// outcome. Bad input, missing artifacts and local faults repeat.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Generation(GenerationError::Completion { .. })
            | PipelineError::NoUsableOutput(_) => true,
            PipelineError::Render(RenderError::Failed { .. }) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(PipelineError::from(GenerationError::EmptyDocument).kind(), ErrorKind::Input);
        assert_eq!(
            PipelineError::NoUsableOutput(NoOutputReason::NoCodeBlock).kind(),
            ErrorKind::NoUsableOutput
        );
        assert_eq!(PipelineError::ArtifactMissing(PathBuf::from("x.mp4")).kind(), ErrorKind::Render);
        assert_eq!(
            PipelineError::Pdf(PdfError::FetchStatus { url: "u".into(), status: 404 }).kind(),
            ErrorKind::Provider
        );
    }

    #[test]
    fn test_messages_are_human_readable() {
        let err = PipelineError::NoUsableOutput(NoOutputReason::NoEntryPoint);
        assert_eq!(err.to_string(), "no usable output: No Scene class found in code");

        let err = PipelineError::ArtifactMissing(PathBuf::from("/tmp/w/videos/scene/480p15/A.mp4"));
        assert!(err.to_string().contains("artifact missing"));
    }

    #[test]
    fn test_retryability() {
        assert!(PipelineError::NoUsableOutput(NoOutputReason::NoCodeBlock).is_retryable());
        assert!(!PipelineError::from(GenerationError::EmptyDocument).is_retryable());
        assert!(!PipelineError::ArtifactMissing(PathBuf::new()).is_retryable());
        assert!(PipelineError::Render(RenderError::Failed {
            status: Some(1),
            stderr: "NameError".into()
        })
        .is_retryable());
    }
}
