// MANIMATOR Animation Code Generator
// Copyright (c) 2026 Xing_The_Creator | MANIMATOR

use tracing::info;

use crate::agent::llm_bridge::CompletionClient;
use crate::agent::prompts::{ANIMATION_LIVE_INSTRUCTION, ANIMATION_SYSTEM_PROMPT};
use crate::config::StageConfig;
use crate::error::GenerationError;

const STAGE: &str = "animation code generation";

/// Scene description in, raw model text (expected to hold Manim code) out.
/// Fixed model; same-model auto-retry only.
pub struct AnimationCodeGenerator {
    client: CompletionClient,
    stage: StageConfig,
}

impl AnimationCodeGenerator {
    pub fn new(client: CompletionClient, stage: StageConfig) -> Self {
        Self { client, stage }
    }

    pub async fn from_scene_description(&self, description: &str) -> Result<String, GenerationError> {
        if description.trim().is_empty() {
            return Err(GenerationError::EmptyInput("scene description"));
        }
        let model = self
            .stage
            .model
            .as_deref()
            .ok_or(GenerationError::MissingModel("CODE_GEN_MODEL"))?;

        info!("[ANIMATOR] Generating Manim code with {}", model);
        self.client
            .complete(
                ANIMATION_SYSTEM_PROMPT,
                &[],
                live_turn(description).into(),
                model,
                self.stage.max_auto_retries,
            )
            .await
            .map_err(|source| GenerationError::Completion {
                stage: STAGE,
                model: model.to_string(),
                source,
            })
    }
}

fn live_turn(description: &str) -> String {
    format!("{}\n\n{}", description.trim_end(), ANIMATION_LIVE_INSTRUCTION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::llm_bridge::{
        CompletionError, CompletionProvider, CompletionRequest, MessageContent, RetryPolicy, Role,
    };
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct Echo {
        seen: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl CompletionProvider for Echo {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
            self.seen.lock().unwrap().push(request.clone());
            Ok("```python\nclass A(Scene):\n    pass\n```".into())
        }
    }

    #[tokio::test]
    async fn test_every_request_carries_the_layout_reminder() {
        let provider = Arc::new(Echo { seen: Mutex::new(Vec::new()) });
        let client = CompletionClient::new(provider.clone()).with_retry_policy(RetryPolicy::immediate());
        let animator = AnimationCodeGenerator::new(client, StageConfig::new("coder", 1));

        animator.from_scene_description("### *Topic*: SVM\n").await.unwrap();

        let seen = provider.seen.lock().unwrap();
        let request = &seen[0];
        assert_eq!(request.model, "coder");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        let MessageContent::Text(live) = &request.messages[1].content else {
            panic!("text turn expected");
        };
        assert!(live.starts_with("### *Topic*: SVM\n\n"));
        assert!(live.ends_with(ANIMATION_LIVE_INSTRUCTION));
    }

    #[tokio::test]
    async fn test_missing_model_is_reported() {
        let provider = Arc::new(Echo { seen: Mutex::new(Vec::new()) });
        let animator = AnimationCodeGenerator::new(CompletionClient::new(provider), StageConfig::default());
        let err = animator.from_scene_description("topic").await.unwrap_err();
        assert_eq!(err, GenerationError::MissingModel("CODE_GEN_MODEL"));
    }
}
