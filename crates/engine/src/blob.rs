//! Blob storage collaborator for receipt images.
//!
//! The pipeline never streams the upload itself: `create_write_slot`
//! hands back a destination the client writes to directly, and
//! `download` fetches the stored bytes for extraction.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::EngineError;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Reserves a write destination for `path` and returns a reference
    /// the client can write the binary to.
    async fn create_write_slot(&self, path: &str) -> Result<String, EngineError>;

    /// Returns the stored bytes for `path`.
    async fn download(&self, path: &str) -> Result<Vec<u8>, EngineError>;
}

/// Filesystem-backed blob store rooted at a directory.
#[derive(Clone, Debug)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Rejects paths that would escape the storage root.
    fn resolve(&self, path: &str) -> Result<PathBuf, EngineError> {
        let relative = Path::new(path);
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes {
            return Err(EngineError::Validation(format!("invalid blob path: {path}")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn create_write_slot(&self, path: &str) -> Result<String, EngineError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| EngineError::Upstream(format!("failed to create slot: {err}")))?;
        }
        Ok(full.display().to_string())
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, EngineError> {
        let full = self.resolve(path)?;
        tokio::fs::read(&full)
            .await
            .map_err(|err| EngineError::Upstream(format!("failed to download image: {err}")))
    }
}
