#![cfg(unix)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use manimator_core::agent::llm_bridge::{
    CompletionClient, CompletionError, CompletionProvider, CompletionRequest, RetryPolicy,
};
use manimator_core::agent::pipeline::{GenerationPipeline, GenerationSource, PipelineStage};
use manimator_core::agent::render_supervisor::RenderError;
use manimator_core::config::{AppConfig, StageConfig};
use manimator_core::error::{ErrorKind, PipelineError};

const SCENE_MODEL: &str = "scene-model";
const CODE_MODEL: &str = "code-model";
const CODE_REPLY: &str =
    "Sure!\n```python\nclass MyScene(Scene):\n    def construct(self):\n        self.play(Create(Circle()))\n```\n";

/// Answers by model: a description for the scene stage, `code` for the code stage.
struct ByModel {
    code: Vec<&'static str>,
    code_calls: AtomicUsize,
    scene_calls: AtomicUsize,
}

impl ByModel {
    fn new(code: Vec<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            code,
            code_calls: AtomicUsize::new(0),
            scene_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl CompletionProvider for ByModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        if request.model == SCENE_MODEL {
            self.scene_calls.fetch_add(1, Ordering::SeqCst);
            return Ok("### *Topic*: Circles\n*Key Points*: radius".into());
        }
        let n = self.code_calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.code.get(n).or(self.code.last()).copied().unwrap_or("");
        Ok(reply.to_string())
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    workspaces: PathBuf,
    artifacts: PathBuf,
    invocations: PathBuf,
}

impl Harness {
    /// `body` runs after the invocation is logged, with `$media`, `$src` and
    /// `$entry` set from the renderer arguments.
    fn new(body: &str) -> (Self, AppConfig) {
        let dir = tempfile::tempdir().unwrap();
        let workspaces = dir.path().join("workspaces");
        let artifacts = dir.path().join("artifacts");
        std::fs::create_dir_all(&workspaces).unwrap();
        std::fs::create_dir_all(&artifacts).unwrap();
        let invocations = dir.path().join("invocations.log");

        let script = dir.path().join("fake_manim.sh");
        std::fs::write(
            &script,
            format!(
                "quality=\"$1\"\nmedia=\"$3\"\nsrc=\"$4\"\nentry=\"$5\"\n\
                 echo \"$quality $entry $media\" >> '{}'\n\
                 head -n 1 \"$src\" >> '{}'\n{}\n",
                invocations.display(),
                invocations.display(),
                body
            ),
        )
        .unwrap();

        let mut config = AppConfig::default();
        config.prompt_scene = StageConfig::new(SCENE_MODEL, 0);
        config.pdf_scene = StageConfig::new(SCENE_MODEL, 0);
        config.code_gen = StageConfig::new(CODE_MODEL, 0);
        config.render.program = "sh".into();
        config.render.leading_args = vec![script.display().to_string()];
        config.render.workspace_root = Some(workspaces.clone());
        config.render.artifact_dir = Some(artifacts.clone());

        (
            Self {
                _dir: dir,
                workspaces,
                artifacts,
                invocations,
            },
            config,
        )
    }

    fn render_count(&self) -> usize {
        std::fs::read_to_string(&self.invocations)
            .map(|log| log.lines().filter(|l| l.starts_with("-ql ")).count())
            .unwrap_or(0)
    }

    fn media_dirs(&self) -> Vec<String> {
        std::fs::read_to_string(&self.invocations)
            .unwrap()
            .lines()
            .filter(|l| l.starts_with("-ql "))
            .filter_map(|l| l.splitn(3, ' ').nth(2).map(str::to_string))
            .collect()
    }

    fn leftover_workspaces(&self) -> usize {
        std::fs::read_dir(&self.workspaces).unwrap().count()
    }
}

const WRITES_VIDEO: &str = "stem=$(basename \"$src\" .py)\n\
    mkdir -p \"$media/videos/$stem/480p15\"\n\
    printf 'FAKE-MP4-BYTES' > \"$media/videos/$stem/480p15/$entry.mp4\"";

fn pipeline(config: &AppConfig, provider: Arc<ByModel>) -> GenerationPipeline {
    let client = CompletionClient::new(provider).with_retry_policy(RetryPolicy::immediate());
    GenerationPipeline::from_config(config, client).unwrap()
}

#[tokio::test]
async fn test_prompt_to_video_end_to_end() {
    let (harness, config) = Harness::new(WRITES_VIDEO);
    let provider = ByModel::new(vec![CODE_REPLY]);
    let pipeline = pipeline(&config, provider.clone());

    let (result, stages) = pipeline
        .run_with_trace(&GenerationSource::Prompt("Circles".into()))
        .await;
    let video = result.unwrap();

    assert_eq!(std::fs::read(&video).unwrap(), b"FAKE-MP4-BYTES");
    assert!(video.starts_with(&harness.artifacts));
    assert_eq!(video.extension().and_then(|e| e.to_str()), Some("mp4"));
    assert_eq!(harness.leftover_workspaces(), 0);

    let log = std::fs::read_to_string(&harness.invocations).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert!(lines[0].starts_with("-ql MyScene "));
    assert!(Path::new(&harness.media_dirs()[0]).starts_with(&harness.workspaces));
    assert_eq!(lines[1], "from manim import *");

    assert_eq!(
        &stages[..6],
        &[
            PipelineStage::Idle,
            PipelineStage::DescribingScene,
            PipelineStage::GeneratingCode,
            PipelineStage::ExtractingCode,
            PipelineStage::Materializing,
            PipelineStage::Rendering,
        ]
    );
    assert_eq!(stages.last(), Some(&PipelineStage::Succeeded(video.clone())));
    assert_eq!(provider.scene_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_slow_render_is_awaited_to_completion() {
    let (harness, config) = Harness::new(&format!("sleep 2\n{}", WRITES_VIDEO));
    let pipeline = pipeline(&config, ByModel::new(vec![CODE_REPLY]));

    let started = std::time::Instant::now();
    let video = pipeline.render_from_description("*Topic*: Circles").await.unwrap();

    assert!(started.elapsed() >= std::time::Duration::from_secs(2));
    assert_eq!(std::fs::read(&video).unwrap(), b"FAKE-MP4-BYTES");
    assert_eq!(harness.render_count(), 1);
    assert_eq!(harness.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_clean_exit_without_video_is_artifact_missing() {
    let (harness, config) = Harness::new("exit 0");
    let pipeline = pipeline(&config, ByModel::new(vec![CODE_REPLY]));

    let err = pipeline.render_from_description("*Topic*: Circles").await.unwrap_err();

    match &err {
        PipelineError::ArtifactMissing(path) => {
            assert!(path.ends_with("videos/scene/480p15/MyScene.mp4"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.kind(), ErrorKind::Render);
    assert_eq!(harness.leftover_workspaces(), 0);
    assert_eq!(std::fs::read_dir(&harness.artifacts).unwrap().count(), 0);
}

#[tokio::test]
async fn test_non_zero_exit_surfaces_engine_stderr() {
    let (harness, config) = Harness::new("echo \"NameError: name 'Circl' is not defined\" >&2\nexit 3");
    let pipeline = pipeline(&config, ByModel::new(vec![CODE_REPLY]));

    let err = pipeline.render_from_description("*Topic*: Circles").await.unwrap_err();

    match err {
        PipelineError::Render(RenderError::Failed { status, stderr }) => {
            assert_eq!(status, Some(3));
            assert!(stderr.contains("NameError"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(harness.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_missing_code_never_invokes_renderer() {
    let (harness, config) = Harness::new(WRITES_VIDEO);
    let pipeline = pipeline(&config, ByModel::new(vec!["I would rather describe it in words."]));

    let err = pipeline.render_from_prompt("Circles").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoUsableOutput);
    assert_eq!(err.to_string(), "no usable output: No valid Manim code generated");
    assert_eq!(harness.render_count(), 0);
    assert_eq!(harness.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_code_without_scene_class_never_invokes_renderer() {
    let (harness, config) = Harness::new(WRITES_VIDEO);
    let pipeline = pipeline(&config, ByModel::new(vec!["```python\nx = Circle()\n```"]));

    let err = pipeline.render_from_prompt("Circles").await.unwrap_err();

    assert_eq!(err.to_string(), "no usable output: No Scene class found in code");
    assert_eq!(harness.render_count(), 0);
}

#[tokio::test]
async fn test_empty_document_is_rejected_before_any_call() {
    let (harness, config) = Harness::new(WRITES_VIDEO);
    let provider = ByModel::new(vec![CODE_REPLY]);
    let pipeline = pipeline(&config, provider.clone());

    let err = pipeline.render_from_document(&[]).await.unwrap_err();

    assert_eq!(err.to_string(), "Empty PDF file provided");
    assert_eq!(provider.scene_calls.load(Ordering::SeqCst), 0);
    assert_eq!(provider.code_calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.render_count(), 0);
}

#[tokio::test]
async fn test_second_attempt_recovers_from_missing_code() {
    let (harness, config) = Harness::new(WRITES_VIDEO);
    let provider = ByModel::new(vec!["no code this time", CODE_REPLY]);
    let pipeline = pipeline(&config, provider.clone());

    let video = pipeline
        .generate_with_attempts(&GenerationSource::Prompt("Circles".into()), 2)
        .await
        .unwrap();

    assert!(video.is_file());
    assert_eq!(provider.scene_calls.load(Ordering::SeqCst), 2);
    assert_eq!(provider.code_calls.load(Ordering::SeqCst), 2);
    assert_eq!(harness.render_count(), 1);
}

#[tokio::test]
async fn test_missing_artifact_is_not_retried() {
    let (harness, config) = Harness::new("exit 0");
    let pipeline = pipeline(&config, ByModel::new(vec![CODE_REPLY]));

    let err = pipeline
        .generate_with_attempts(&GenerationSource::Description("d".into()), 2)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::ArtifactMissing(_)));
    assert_eq!(harness.render_count(), 1);
}

#[tokio::test]
async fn test_concurrent_runs_use_distinct_workspaces() {
    let (harness, config) = Harness::new(WRITES_VIDEO);
    let pipeline = Arc::new(pipeline(&config, ByModel::new(vec![CODE_REPLY])));

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.render_from_description("*Topic*: Circles").await })
        })
        .collect();

    let mut videos = HashSet::new();
    for handle in handles {
        videos.insert(handle.await.unwrap().unwrap());
    }
    assert_eq!(videos.len(), 6);

    let media_dirs: HashSet<String> = harness.media_dirs().into_iter().collect();
    assert_eq!(media_dirs.len(), 6);
    assert!(media_dirs.iter().all(|d| !Path::new(d).exists()));
    assert_eq!(harness.leftover_workspaces(), 0);
}
