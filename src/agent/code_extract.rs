// MANIMATOR Code Extraction
// Copyright (c) 2026 Xing_The_Creator | MANIMATOR
//
// Pulls a single renderable unit out of free-form model text. Matching is
// purely textual; callers only see the `CodeExtractor` trait.

use regex::Regex;
use tracing::{debug, warn};

use crate::error::NoOutputReason;

/// Extracted source plus the scene class the renderer must instantiate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCodeUnit {
    pub code: String,
    pub entry_point: String,
}

pub trait CodeExtractor: Send + Sync {
    /// Body of the first fenced block with the expected language tag, trimmed.
    fn extract_code(&self, model_text: &str) -> Option<String>;

    /// Name of the first scene class declared in `code`, in text order.
    fn find_entry_point(&self, code: &str) -> Option<String>;

    fn extract_unit(&self, model_text: &str) -> Result<GeneratedCodeUnit, NoOutputReason> {
        let code = self.extract_code(model_text).ok_or(NoOutputReason::NoCodeBlock)?;
        let entry_point = self.find_entry_point(&code).ok_or(NoOutputReason::NoEntryPoint)?;
        Ok(GeneratedCodeUnit { code, entry_point })
    }
}

pub struct PatternExtractor {
    fence: Regex,
    scene_class: Regex,
}

impl PatternExtractor {
    pub fn new(language: &str, scene_base: &str) -> Result<Self, regex::Error> {
        let fence = Regex::new(&format!(r"(?s)```{}\r?\n(.*?)```", regex::escape(language)))?;
        let scene_class = Regex::new(&format!(
            r"\bclass\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(\s*{}\s*\)",
            regex::escape(scene_base)
        ))?;
        Ok(Self { fence, scene_class })
    }

    /// Python fences, classes deriving directly from Manim's `Scene`.
    pub fn manim() -> Result<Self, regex::Error> {
        Self::new("python", "Scene")
    }
}

impl CodeExtractor for PatternExtractor {
    fn extract_code(&self, model_text: &str) -> Option<String> {
        let code = self
            .fence
            .captures(model_text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string());
        match &code {
            Some(c) => debug!("[EXTRACT] Found fenced code ({} chars)", c.len()),
            None => warn!("[EXTRACT] No fenced code block in model output"),
        }
        code
    }

    fn find_entry_point(&self, code: &str) -> Option<String> {
        let mut matches = self.scene_class.captures_iter(code);
        let first = matches.next()?.get(1)?.as_str().to_string();
        let others = matches.count();
        if others > 0 {
            warn!(
                "[EXTRACT] {} additional scene classes found; rendering '{}' only",
                others, first
            );
        }
        Some(first)
    }
}
