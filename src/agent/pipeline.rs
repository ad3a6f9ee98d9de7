// MANIMATOR Generation Pipeline
// Copyright (c) 2026 Xing_The_Creator | MANIMATOR
//
// Orchestrates: Describe -> Generate Code -> Extract -> Materialize -> Render
//
// One run is a linear sequence with no shared mutable state, so independent
// runs may execute concurrently. A workspace exists only between
// Materializing and the end of Rendering.

use std::path::PathBuf;
use tracing::{info, warn};

use crate::agent::animation::AnimationCodeGenerator;
use crate::agent::code_extract::{CodeExtractor, GeneratedCodeUnit, PatternExtractor};
use crate::agent::few_shot;
use crate::agent::llm_bridge::CompletionClient;
use crate::agent::pdf_tools;
use crate::agent::render_supervisor::RenderSupervisor;
use crate::agent::scene_description::SceneDescriptionGenerator;
use crate::agent::workspace::{self, Workspace};
use crate::config::AppConfig;
use crate::error::{ErrorKind, PipelineError};

/// Whole-pipeline attempts made by `generate_with_attempts` callers by default.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    DescribingScene,
    GeneratingCode,
    ExtractingCode,
    Materializing,
    Rendering,
    Succeeded(PathBuf),
    Failed(ErrorKind),
}

impl PipelineStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Succeeded(_) | PipelineStage::Failed(_))
    }
}

/// What a run starts from.
#[derive(Debug, Clone)]
pub enum GenerationSource {
    /// Free-text concept; goes through scene description first.
    Prompt(String),
    /// An already written scene description; skips the first stage.
    Description(String),
    /// Raw PDF bytes.
    Document(Vec<u8>),
}

struct StageTrace {
    stages: Vec<PipelineStage>,
}

impl StageTrace {
    fn new() -> Self {
        Self {
            stages: vec![PipelineStage::Idle],
        }
    }

    fn enter(&mut self, stage: PipelineStage) {
        info!("[PIPELINE] -> {:?}", stage);
        self.stages.push(stage);
    }
}

pub struct GenerationPipeline {
    scenes: SceneDescriptionGenerator,
    animator: AnimationCodeGenerator,
    extractor: Box<dyn CodeExtractor>,
    renderer: RenderSupervisor,
}

impl GenerationPipeline {
    pub fn new(
        scenes: SceneDescriptionGenerator,
        animator: AnimationCodeGenerator,
        extractor: Box<dyn CodeExtractor>,
        renderer: RenderSupervisor,
    ) -> Self {
        Self {
            scenes,
            animator,
            extractor,
            renderer,
        }
    }

    /// Wire every stage from `config`, sharing one completion client.
    pub fn from_config(config: &AppConfig, client: CompletionClient) -> Result<Self, PipelineError> {
        let exemplar = match &config.few_shot_pdf {
            Some(path) => pdf_tools::encode_few_shot_document(path)
                .map_err(|e| PipelineError::Setup(e.to_string()))?,
            None => few_shot::BUNDLED_PDF_EXEMPLAR.trim().to_string(),
        };
        if exemplar.is_empty() {
            return Err(PipelineError::Setup("PDF few-shot exemplar is empty".into()));
        }
        let extractor =
            PatternExtractor::manim().map_err(|e| PipelineError::Setup(e.to_string()))?;

        Ok(Self::new(
            SceneDescriptionGenerator::new(client.clone(), config, &exemplar),
            AnimationCodeGenerator::new(client, config.code_gen.clone()),
            Box::new(extractor),
            RenderSupervisor::new(config.render.clone()),
        ))
    }

    pub fn scenes(&self) -> &SceneDescriptionGenerator {
        &self.scenes
    }

    pub async fn render_from_prompt(&self, prompt: &str) -> Result<PathBuf, PipelineError> {
        self.run(&GenerationSource::Prompt(prompt.to_string())).await
    }

    pub async fn render_from_description(&self, description: &str) -> Result<PathBuf, PipelineError> {
        self.run(&GenerationSource::Description(description.to_string()))
            .await
    }

    pub async fn render_from_document(&self, pdf: &[u8]) -> Result<PathBuf, PipelineError> {
        self.run(&GenerationSource::Document(pdf.to_vec())).await
    }

    /// Run once and return the durable video path.
    pub async fn run(&self, source: &GenerationSource) -> Result<PathBuf, PipelineError> {
        self.run_with_trace(source).await.0
    }

    /// Run once, also returning every stage entered, terminal stage last.
    pub async fn run_with_trace(
        &self,
        source: &GenerationSource,
    ) -> (Result<PathBuf, PipelineError>, Vec<PipelineStage>) {
        let mut trace = StageTrace::new();
        let result = self.drive(source, &mut trace).await;
        match &result {
            Ok(path) => trace.enter(PipelineStage::Succeeded(path.clone())),
            Err(e) => {
                warn!("[PIPELINE] Run failed: {}", e);
                trace.enter(PipelineStage::Failed(e.kind()));
            }
        }
        (result, trace.stages)
    }

    /// Re-run the whole pipeline up to `max_attempts` times while the failure
    /// is one a fresh run could avoid. Each attempt is a brand-new request.
    pub async fn generate_with_attempts(
        &self,
        source: &GenerationSource,
        max_attempts: u32,
    ) -> Result<PathBuf, PipelineError> {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            info!("[PIPELINE] Generation attempt {}/{}", attempt, max_attempts);
            match self.run(source).await {
                Ok(path) => return Ok(path),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    warn!("[PIPELINE] Attempt {} failed: {}. Starting over", attempt, e);
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn drive(
        &self,
        source: &GenerationSource,
        trace: &mut StageTrace,
    ) -> Result<PathBuf, PipelineError> {
        let description = match source {
            GenerationSource::Prompt(prompt) => {
                trace.enter(PipelineStage::DescribingScene);
                self.scenes.from_prompt(prompt).await?
            }
            GenerationSource::Document(pdf) => {
                trace.enter(PipelineStage::DescribingScene);
                self.scenes.from_document(pdf).await?
            }
            GenerationSource::Description(text) => text.clone(),
        };

        trace.enter(PipelineStage::GeneratingCode);
        let model_text = self.animator.from_scene_description(&description).await?;

        trace.enter(PipelineStage::ExtractingCode);
        let unit = self
            .extractor
            .extract_unit(&model_text)
            .map_err(PipelineError::NoUsableOutput)?;
        info!("[PIPELINE] Entry point: {}", unit.entry_point);

        trace.enter(PipelineStage::Materializing);
        let mut workspace = match &self.renderer.config().workspace_root {
            Some(root) => Workspace::create_in(root)?,
            None => Workspace::create()?,
        };

        let outcome = self.render_in(&unit, &workspace, trace).await;

        if let Err(e) = workspace.close() {
            // The video, if any, was already copied out.
            warn!("[PIPELINE] {}", e);
        }
        outcome
    }

    async fn render_in(
        &self,
        unit: &GeneratedCodeUnit,
        workspace: &Workspace,
        trace: &mut StageTrace,
    ) -> Result<PathBuf, PipelineError> {
        let source_file = workspace::materialize(&unit.code, workspace)?;

        trace.enter(PipelineStage::Rendering);
        match self
            .renderer
            .render(&source_file, &unit.entry_point, workspace)
            .await?
        {
            Some(video) => Ok(video),
            None => Err(PipelineError::ArtifactMissing(
                self.renderer
                    .expected_output_path(workspace.path(), &source_file, &unit.entry_point)?,
            )),
        }
    }
}
