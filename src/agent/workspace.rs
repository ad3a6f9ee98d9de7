// MANIMATOR Scratch Workspace
// Copyright (c) 2026 Xing_The_Creator | MANIMATOR
//
// One uniquely named temp directory per generation request. The directory
// and everything the renderer writes into it are deleted when the guard is
// closed or dropped, whichever happens first.

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, warn};

pub const SCENE_FILE_NAME: &str = "scene.py";
pub const IMPORT_PREAMBLE: &str = "from manim import *\n\n";
const PREFIX: &str = "manimator-";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to create workspace: {0}")]
    Create(#[source] std::io::Error),
    #[error("failed to write scene source {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to remove workspace {path}: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl Workspace {
    /// Fresh workspace under the system temp directory.
    pub fn create() -> Result<Self, WorkspaceError> {
        Self::wrap(tempfile::Builder::new().prefix(PREFIX).tempdir())
    }

    /// Fresh workspace under `parent`.
    pub fn create_in(parent: &Path) -> Result<Self, WorkspaceError> {
        Self::wrap(tempfile::Builder::new().prefix(PREFIX).tempdir_in(parent))
    }

    fn wrap(created: std::io::Result<TempDir>) -> Result<Self, WorkspaceError> {
        let dir = created.map_err(WorkspaceError::Create)?;
        let path = dir.path().to_path_buf();
        debug!("[WORKSPACE] Created {:?}", path);
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.dir.is_some()
    }

    /// Remove the directory now. Safe to call repeatedly, and safe when
    /// something else already deleted the directory.
    pub fn close(&mut self) -> Result<(), WorkspaceError> {
        let Some(dir) = self.dir.take() else {
            return Ok(());
        };
        match dir.close() {
            Ok(()) => {
                debug!("[WORKSPACE] Removed {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => {
                warn!("[WORKSPACE] Failed to remove {:?}: {}", self.path, source);
                Err(WorkspaceError::Cleanup {
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }
}

/// Write the engine import followed by `code` verbatim to `scene.py`.
pub fn materialize(code: &str, workspace: &Workspace) -> Result<PathBuf, WorkspaceError> {
    let path = workspace.path().join(SCENE_FILE_NAME);
    let mut source = String::with_capacity(IMPORT_PREAMBLE.len() + code.len());
    source.push_str(IMPORT_PREAMBLE);
    source.push_str(code);

    std::fs::write(&path, source).map_err(|source| WorkspaceError::Write {
        path: path.clone(),
        source,
    })?;
    debug!("[WORKSPACE] Scene source written to {:?}", path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let ws = Workspace::create_in(root.path()).unwrap();
            std::fs::create_dir_all(ws.path().join("videos/scene/480p15")).unwrap();
            std::fs::write(ws.path().join("videos/scene/480p15/A.mp4"), b"x").unwrap();
            ws.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut ws = Workspace::create().unwrap();
        let path = ws.path().to_path_buf();
        assert!(path.is_dir());

        ws.close().unwrap();
        assert!(!path.exists());
        assert!(!ws.is_open());
        ws.close().unwrap();
    }

    #[test]
    fn test_close_tolerates_external_removal() {
        let mut ws = Workspace::create().unwrap();
        std::fs::remove_dir_all(ws.path()).unwrap();
        ws.close().unwrap();
    }

    #[test]
    fn test_names_are_unique() {
        let workspaces: Vec<Workspace> = (0..16).map(|_| Workspace::create().unwrap()).collect();
        let names: HashSet<&Path> = workspaces.iter().map(|w| w.path()).collect();
        assert_eq!(names.len(), 16);
    }

    #[test]
    fn test_materialize_prepends_import() {
        let ws = Workspace::create().unwrap();
        let code = "class MyScene(Scene):\n    pass";
        let path = materialize(code, &ws).unwrap();

        assert_eq!(path, ws.path().join("scene.py"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "from manim import *\n\nclass MyScene(Scene):\n    pass");
    }
}
