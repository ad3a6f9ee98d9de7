// MANIMATOR Scene Description Generator
// Copyright (c) 2026 Xing_The_Creator | MANIMATOR
//
// First pipeline stage: concept or paper in, structured scene description
// out. Papers get one extra attempt on a fallback model when configured.

use tracing::{info, warn};

use crate::agent::few_shot;
use crate::agent::llm_bridge::{CompletionClient, ContentPart, Message, MessageContent};
use crate::agent::pdf_tools;
use crate::agent::prompts::SCENE_SYSTEM_PROMPT;
use crate::config::{AppConfig, StageConfig};
use crate::error::GenerationError;

const PROMPT_STAGE: &str = "prompt scene generation";
const PDF_STAGE: &str = "PDF scene generation";

/// Model-switch attempts for one document, fallback included.
pub const MAX_DOCUMENT_ATTEMPTS: u32 = 2;

pub struct SceneDescriptionGenerator {
    client: CompletionClient,
    prompt_stage: StageConfig,
    pdf_stage: StageConfig,
    fallback_model: Option<String>,
    pdf_exemplar: Vec<Message>,
    compression_level: u8,
}

impl SceneDescriptionGenerator {
    /// `pdf_exemplar_document` is the base64 exemplar paper sent ahead of
    /// every document.
    pub fn new(client: CompletionClient, config: &AppConfig, pdf_exemplar_document: &str) -> Self {
        Self {
            client,
            prompt_stage: config.prompt_scene.clone(),
            pdf_stage: config.pdf_scene.clone(),
            fallback_model: config.pdf_fallback_model.clone(),
            pdf_exemplar: few_shot::pdf_example(pdf_exemplar_document),
            compression_level: config.pdf_compression_level,
        }
    }

    /// Scene description for a free-text concept. No model fallback.
    pub async fn from_prompt(&self, prompt: &str) -> Result<String, GenerationError> {
        if prompt.trim().is_empty() {
            return Err(GenerationError::EmptyInput("prompt"));
        }
        let model = self
            .prompt_stage
            .model
            .as_deref()
            .ok_or(GenerationError::MissingModel("PROMPT_SCENE_GEN_MODEL"))?;

        info!("[SCENE] Describing prompt with {}: {}", model, prompt);
        let examples = few_shot::scene_examples();
        self.client
            .complete(
                SCENE_SYSTEM_PROMPT,
                &examples,
                prompt.into(),
                model,
                self.prompt_stage.max_auto_retries,
            )
            .await
            .map_err(|source| GenerationError::Completion {
                stage: PROMPT_STAGE,
                model: model.to_string(),
                source,
            })
    }

    /// Scene description for a PDF on the configured default model.
    pub async fn from_document(&self, pdf: &[u8]) -> Result<String, GenerationError> {
        self.from_document_with_model(pdf, None).await
    }

    /// Scene description for a PDF, starting on `model` (or the configured
    /// default). A failed first attempt is repeated once on the fallback
    /// model; the returned error is always the last attempt's.
    ///
    /// Every call starts as a first attempt. The retried state only exists
    /// inside the loop below.
    pub async fn from_document_with_model(
        &self,
        pdf: &[u8],
        model: Option<&str>,
    ) -> Result<String, GenerationError> {
        if pdf.is_empty() {
            return Err(GenerationError::EmptyDocument);
        }
        let mut model = match model.or(self.pdf_stage.model.as_deref()) {
            Some(m) => m.to_string(),
            None => return Err(GenerationError::MissingModel("PDF_SCENE_GEN_MODEL")),
        };

        let encoded = pdf_tools::compress(pdf, self.compression_level);
        let live_turn = MessageContent::Parts(vec![ContentPart::pdf_document(&encoded)]);

        let mut is_retry_attempt = false;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            info!(
                "[SCENE] Describing document with {} (attempt {}/{})",
                model, attempt, MAX_DOCUMENT_ATTEMPTS
            );

            let result = self
                .client
                .complete(
                    SCENE_SYSTEM_PROMPT,
                    &self.pdf_exemplar,
                    live_turn.clone(),
                    &model,
                    self.pdf_stage.max_auto_retries,
                )
                .await;

            let source = match result {
                Ok(text) => return Ok(text),
                Err(source) => source,
            };

            match (&self.fallback_model, is_retry_attempt) {
                (Some(fallback), false) => {
                    warn!(
                        "[SCENE] {} failed on document ({}). Switching to fallback {}",
                        model, source, fallback
                    );
                    model = fallback.clone();
                    is_retry_attempt = true;
                }
                _ => {
                    return Err(GenerationError::Completion {
                        stage: PDF_STAGE,
                        model,
                        source,
                    })
                }
            }
        }
    }
}
