// MANIMATOR Service State
// Copyright (c) 2026 Xing_The_Creator | MANIMATOR

use std::sync::Arc;

use crate::agent::llm_bridge::{CompletionClient, OpenAiCompatProvider};
use crate::agent::pipeline::GenerationPipeline;
use crate::config::AppConfig;
use crate::error::PipelineError;

/// Shared, read-only after construction. Requests never mutate it.
pub struct ServiceState {
    pub pipeline: GenerationPipeline,
    /// Client for arXiv downloads, separate from the completion provider.
    pub http: reqwest::Client,
    pub arxiv_pdf_base: String,
}

pub type AppState = Arc<ServiceState>;

impl ServiceState {
    pub fn new(pipeline: GenerationPipeline, http: reqwest::Client, arxiv_pdf_base: &str) -> Self {
        Self {
            pipeline,
            http,
            arxiv_pdf_base: arxiv_pdf_base.to_string(),
        }
    }

    /// Production wiring: OpenAI-compatible provider plus a download client
    /// sharing the provider timeout.
    pub fn from_config(config: &AppConfig) -> Result<Self, PipelineError> {
        let provider = OpenAiCompatProvider::new(&config.provider)
            .map_err(|e| PipelineError::Setup(e.to_string()))?;
        let client = CompletionClient::new(Arc::new(provider));
        let pipeline = GenerationPipeline::from_config(config, client)?;

        let http = reqwest::Client::builder()
            .timeout(config.provider.request_timeout)
            .build()
            .map_err(|e| PipelineError::Setup(e.to_string()))?;

        Ok(Self::new(pipeline, http, &config.arxiv_pdf_base))
    }
}
