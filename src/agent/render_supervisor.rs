// MANIMATOR Render Supervisor
// Copyright (c) 2026 Xing_The_Creator | MANIMATOR
//
// Runs the Manim CLI against a materialized scene, finds the video at the
// path Manim always uses for the chosen quality, and copies it out of the
// workspace before the workspace is destroyed.
//
// The subprocess is awaited without a deadline: a renderer that never exits
// holds its request open.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::agent::workspace::Workspace;
use crate::config::RenderConfig;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to launch renderer '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Render error (exit {}): {stderr}", .status.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()))]
    Failed { status: Option<i32>, stderr: String },
    #[error("scene source has no usable file name: {}", .0.display())]
    InvalidSource(PathBuf),
    #[error("failed to copy rendered video out of the workspace: {0}")]
    Copy(#[source] std::io::Error),
}

pub struct RenderSupervisor {
    config: RenderConfig,
}

impl RenderSupervisor {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// `<media>/videos/<source stem>/<resolution tag>/<entry point>.<ext>`
    pub fn expected_output_path(
        &self,
        media_dir: &Path,
        source_file: &Path,
        entry_point: &str,
    ) -> Result<PathBuf, RenderError> {
        let stem = source_file
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| RenderError::InvalidSource(source_file.to_path_buf()))?;
        Ok(media_dir
            .join("videos")
            .join(stem)
            .join(&self.config.resolution_tag)
            .join(format!("{}.{}", entry_point, self.config.video_extension)))
    }

    fn command(&self, source_file: &Path, entry_point: &str, media_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.leading_args)
            .arg(&self.config.quality_flag)
            .arg("--media_dir")
            .arg(media_dir)
            .arg(source_file)
            .arg(entry_point)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    /// Render `entry_point` from `source_file` into `workspace`.
    ///
    /// Returns the durable copy of the video, or `None` when the engine
    /// exited cleanly but produced nothing at the expected path.
    pub async fn render(
        &self,
        source_file: &Path,
        entry_point: &str,
        workspace: &Workspace,
    ) -> Result<Option<PathBuf>, RenderError> {
        let media_dir = workspace.path();
        let expected = self.expected_output_path(media_dir, source_file, entry_point)?;

        info!(
            "[RENDER] {} {} --media_dir {:?} {:?} {}",
            self.config.program, self.config.quality_flag, media_dir, source_file, entry_point
        );

        let output = self
            .command(source_file, entry_point, media_dir)
            .output()
            .await
            .map_err(|source| RenderError::Spawn {
                program: self.config.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            error!("[RENDER] Manim exited with {}: {}", output.status, stderr.trim());
            return Err(RenderError::Failed {
                status: output.status.code(),
                stderr,
            });
        }

        if !expected.is_file() {
            warn!("[RENDER] Manim exited cleanly but {:?} does not exist", expected);
            return Ok(None);
        }

        let durable = self.persist(&expected).await?;
        info!("[RENDER] Video ready: {:?}", durable);
        Ok(Some(durable))
    }

    /// Copy `video` into a new temp file outside the workspace. The file is
    /// only kept once every byte has been written.
    async fn persist(&self, video: &Path) -> Result<PathBuf, RenderError> {
        let video = video.to_path_buf();
        let artifact_dir = self.config.artifact_dir.clone();
        let suffix = format!(".{}", self.config.video_extension);

        tokio::task::spawn_blocking(move || -> std::io::Result<PathBuf> {
            let mut builder = tempfile::Builder::new();
            builder.prefix("manimator-render-").suffix(&suffix);
            let mut target = match &artifact_dir {
                Some(dir) => builder.tempfile_in(dir)?,
                None => builder.tempfile()?,
            };

            let mut source = std::fs::File::open(&video)?;
            std::io::copy(&mut source, target.as_file_mut())?;
            target.as_file().sync_all()?;

            let (_file, path) = target.keep().map_err(|e| e.error)?;
            Ok(path)
        })
        .await
        .map_err(|e| RenderError::Copy(std::io::Error::new(std::io::ErrorKind::Other, e)))?
        .map_err(RenderError::Copy)
    }
}
