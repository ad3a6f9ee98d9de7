// MANIMATOR Configuration
// Copyright (c) 2026 Xing_The_Creator | MANIMATOR
//
// Everything the pipeline needs from the environment is read exactly once,
// at process start, into an `AppConfig`. Generators receive the pieces they
// need at construction and never consult the environment themselves.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "https://api.sambanova.ai/v1";
pub const DEFAULT_ARXIV_PDF_BASE: &str = "https://arxiv.org/pdf";
pub const DEFAULT_MAX_AUTO_RETRIES: u32 = 2;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_COMPRESSION_LEVEL: u8 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got '{value}'")]
    InvalidValue {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Connection settings for the OpenAI-compatible completion endpoint.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
}

/// Model selection for one generation stage.
#[derive(Debug, Clone, Default)]
pub struct StageConfig {
    pub model: Option<String>,
    pub max_auto_retries: u32,
}

impl StageConfig {
    pub fn new(model: &str, max_auto_retries: u32) -> Self {
        Self {
            model: Some(model.to_string()),
            max_auto_retries,
        }
    }
}

/// How the external rendering engine is invoked and where its output lands.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Program to execute (`manim`, or `python` together with `-m manim`).
    pub program: String,
    /// Arguments placed before the render flags.
    pub leading_args: Vec<String>,
    pub quality_flag: String,
    /// Output sub-directory the engine uses for the selected quality.
    pub resolution_tag: String,
    pub video_extension: String,
    /// Parent directory for scratch workspaces. `None` uses the system temp dir.
    pub workspace_root: Option<PathBuf>,
    /// Where durable copies of rendered videos are written. `None` uses the system temp dir.
    pub artifact_dir: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            program: "manim".to_string(),
            leading_args: Vec::new(),
            quality_flag: "-ql".to_string(),
            resolution_tag: "480p15".to_string(),
            video_extension: "mp4".to_string(),
            workspace_root: None,
            artifact_dir: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub prompt_scene: StageConfig,
    pub pdf_scene: StageConfig,
    /// Alternate model for a single retry of PDF scene generation.
    pub pdf_fallback_model: Option<String>,
    pub code_gen: StageConfig,
    /// PDF few-shot exemplar, either a base64 text file or the PDF itself.
    /// `None` uses the exemplar bundled with the crate.
    pub few_shot_pdf: Option<PathBuf>,
    pub pdf_compression_level: u8,
    pub arxiv_pdf_base: String,
    pub render: RenderConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig {
                api_base: DEFAULT_API_BASE.to_string(),
                api_key: None,
                request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            },
            prompt_scene: StageConfig {
                model: None,
                max_auto_retries: DEFAULT_MAX_AUTO_RETRIES,
            },
            pdf_scene: StageConfig {
                model: None,
                max_auto_retries: DEFAULT_MAX_AUTO_RETRIES,
            },
            pdf_fallback_model: None,
            code_gen: StageConfig {
                model: None,
                max_auto_retries: DEFAULT_MAX_AUTO_RETRIES,
            },
            few_shot_pdf: None,
            pdf_compression_level: DEFAULT_COMPRESSION_LEVEL,
            arxiv_pdf_base: DEFAULT_ARXIV_PDF_BASE.to_string(),
            render: RenderConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = Self::default();

        let max_auto_retries = match get("MANIMATOR_MAX_AUTO_RETRIES") {
            Some(raw) => parse_number::<u32>("MANIMATOR_MAX_AUTO_RETRIES", &raw, "a non-negative integer")?,
            None => DEFAULT_MAX_AUTO_RETRIES,
        };

        let timeout_secs = match get("MANIMATOR_REQUEST_TIMEOUT_SECS") {
            Some(raw) => parse_number::<u64>("MANIMATOR_REQUEST_TIMEOUT_SECS", &raw, "a number of seconds")?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        let pdf_compression_level = match get("MANIMATOR_PDF_COMPRESSION") {
            Some(raw) => {
                let level = parse_number::<u8>("MANIMATOR_PDF_COMPRESSION", &raw, "an integer between 1 and 9")?;
                if !(1..=9).contains(&level) {
                    return Err(ConfigError::InvalidValue {
                        key: "MANIMATOR_PDF_COMPRESSION",
                        expected: "an integer between 1 and 9",
                        value: raw,
                    });
                }
                level
            }
            None => DEFAULT_COMPRESSION_LEVEL,
        };

        let render_defaults = defaults.render;
        let render = RenderConfig {
            program: get("MANIM_BIN").unwrap_or(render_defaults.program),
            leading_args: get("MANIM_ARGS")
                .map(|raw| raw.split_whitespace().map(str::to_string).collect())
                .unwrap_or(render_defaults.leading_args),
            quality_flag: get("MANIM_QUALITY_FLAG").unwrap_or(render_defaults.quality_flag),
            resolution_tag: get("MANIM_RESOLUTION_TAG").unwrap_or(render_defaults.resolution_tag),
            video_extension: render_defaults.video_extension,
            workspace_root: get("MANIMATOR_WORKSPACE_ROOT").map(PathBuf::from),
            artifact_dir: get("MANIMATOR_ARTIFACT_DIR").map(PathBuf::from),
        };

        Ok(Self {
            provider: ProviderConfig {
                api_base: get("MANIMATOR_API_BASE").unwrap_or(defaults.provider.api_base),
                api_key: get("MANIMATOR_API_KEY"),
                request_timeout: Duration::from_secs(timeout_secs),
            },
            prompt_scene: StageConfig {
                model: get("PROMPT_SCENE_GEN_MODEL"),
                max_auto_retries,
            },
            pdf_scene: StageConfig {
                model: get("PDF_SCENE_GEN_MODEL"),
                max_auto_retries,
            },
            pdf_fallback_model: get("PDF_RETRY_MODEL"),
            code_gen: StageConfig {
                model: get("CODE_GEN_MODEL"),
                max_auto_retries,
            },
            few_shot_pdf: get("MANIMATOR_FEW_SHOT_PDF").map(PathBuf::from),
            pdf_compression_level,
            arxiv_pdf_base: get("ARXIV_PDF_BASE").unwrap_or(defaults.arxiv_pdf_base),
            render,
        })
    }
}

fn parse_number<T: std::str::FromStr>(
    key: &'static str,
    raw: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    raw.parse::<T>().map_err(|_| ConfigError::InvalidValue {
        key,
        expected,
        value: raw.to_string(),
    })
}
