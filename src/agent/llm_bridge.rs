// MANIMATOR LLM Bridge
// Copyright (c) 2026 Xing_The_Creator | MANIMATOR
//
// Message protocol, provider seam and same-model retry for every completion
// the pipeline makes. `CompletionProvider` is one dispatch to one model;
// `CompletionClient` owns message ordering and the bounded retry loop.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::ProviderConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    pub fn text(text: &str) -> Self {
        ContentPart::Text {
            text: text.to_string(),
        }
    }

    /// Inline PDF reference, sent as a base64 data URL.
    pub fn pdf_document(base64_pdf: &str) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: format!("data:application/pdf;base64,{}", base64_pdf),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    pub fn system(text: &str) -> Self {
        Self {
            role: Role::System,
            content: text.into(),
        }
    }

    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(text: &str) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
        }
    }
}

/// Ordered conversation sent to one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
}

impl CompletionRequest {
    /// `[system, exemplar user/assistant pairs.., live user]`
    pub fn build(
        model: &str,
        system_prompt: &str,
        few_shot: &[Message],
        user_content: MessageContent,
    ) -> Self {
        debug_assert!(exemplars_alternate(few_shot), "few-shot exemplars must be user/assistant pairs");

        let mut messages = Vec::with_capacity(few_shot.len() + 2);
        messages.push(Message::system(system_prompt));
        messages.extend(few_shot.iter().cloned());
        messages.push(Message::user(user_content));

        Self {
            model: model.to_string(),
            messages,
        }
    }
}

/// True when `messages` is a sequence of complete user -> assistant pairs.
pub fn exemplars_alternate(messages: &[Message]) -> bool {
    messages.len() % 2 == 0
        && messages.chunks(2).all(|pair| {
            pair[0].role == Role::User && pair.get(1).map(|m| m.role) == Some(Role::Assistant)
        })
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompletionError {
    #[error("provider unreachable: {message}")]
    Transport { message: String, transient: bool },
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
    #[error("provider returned an empty completion")]
    EmptyCompletion,
}

impl CompletionError {
    /// Rate limits, timeouts and server-side failures are worth another try
    /// on the same model. Everything else is the request's fault.
    pub fn is_transient(&self) -> bool {
        match self {
            CompletionError::Transport { transient, .. } => *transient,
            CompletionError::Status { status, .. } => {
                *status == 408 || *status == 429 || (500..=599).contains(status)
            }
            CompletionError::MalformedResponse(_) | CompletionError::EmptyCompletion => false,
        }
    }
}

/// One dispatch of a request to a model. No retries at this level.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

/// Backoff between same-model retries: doubles from `base_backoff`, capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// No sleeping between attempts.
    pub fn immediate() -> Self {
        Self {
            base_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (1-indexed).
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(10);
        let delay = self.base_backoff.saturating_mul(2u32.saturating_pow(exp));
        delay.min(self.max_backoff)
    }
}

#[derive(Clone)]
pub struct CompletionClient {
    provider: Arc<dyn CompletionProvider>,
    retry: RetryPolicy,
}

impl CompletionClient {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Build the message sequence and dispatch it to `model`, retrying
    /// transient failures up to `max_auto_retries` extra times.
    pub async fn complete(
        &self,
        system_prompt: &str,
        few_shot: &[Message],
        user_content: MessageContent,
        model: &str,
        max_auto_retries: u32,
    ) -> Result<String, CompletionError> {
        let request = CompletionRequest::build(model, system_prompt, few_shot, user_content);
        let attempts = max_auto_retries.saturating_add(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!("[LLM] Dispatching to {} (attempt {}/{})", model, attempt, attempts);

            match self.provider.complete(&request).await {
                Ok(text) => {
                    info!("[LLM] {} answered ({} chars)", model, text.len());
                    return Ok(text);
                }
                Err(e) if e.is_transient() && attempt < attempts => {
                    let delay = self.retry.backoff_delay(attempt);
                    warn!(
                        "[LLM] {} failed transiently (attempt {}/{}): {}. Retrying in {:?}",
                        model, attempt, attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!("[LLM] {} failed after {} attempt(s): {}", model, attempt, e);
                    return Err(e);
                }
            }
        }
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Standard OpenAI-compatible `POST {base}/chat/completions`.
pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl OpenAiCompatProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| CompletionError::Transport {
                message: e.to_string(),
                transient: false,
            })?;
        Ok(Self {
            client,
            api_url: config.api_base.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let payload = json!({
            "model": request.model,
            "messages": request.messages,
        });

        let mut builder = self.client.post(self.endpoint()).json(&payload);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let resp = builder.send().await.map_err(|e| CompletionError::Transport {
            transient: e.is_timeout() || e.is_connect() || e.is_request(),
            message: e.to_string(),
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(CompletionError::EmptyCompletion)
    }
}
