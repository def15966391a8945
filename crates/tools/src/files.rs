//! Workspace-confined file reads and writes.

use std::path::{Path, PathBuf};

use devloop_core::{ExecutorError, Observation};
use tracing::debug;

use crate::path::resolve_in_workspace;

pub struct FileAccess {
    root: PathBuf,
}

impl FileAccess {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn read(&self, path: &str) -> Result<Observation, ExecutorError> {
        let full = resolve_in_workspace(&self.root, path)?;
        debug!(path = %full.display(), "Reading file");
        let content = tokio::fs::read_to_string(&full).await?;
        Ok(Observation::FileRead {
            path: path.to_string(),
            content,
        })
    }

    /// Write `content`, creating parent directories as needed.
    pub async fn write(&self, path: &str, content: &str) -> Result<Observation, ExecutorError> {
        let full = resolve_in_workspace(&self.root, path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        debug!(path = %full.display(), bytes = content.len(), "Writing file");
        tokio::fs::write(&full, content).await?;
        Ok(Observation::FileWrite {
            path: path.to_string(),
        })
    }
}
