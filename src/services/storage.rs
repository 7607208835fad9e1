use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::core::config::Settings;

#[derive(Debug, Error)]
pub(crate) enum StorageError {
    #[error("invalid file handle: {0}")]
    InvalidHandle(String),
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("file store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Opaque blob storage. Handles are stable strings that the store alone can resolve.
#[async_trait]
pub(crate) trait FileStore: Send + Sync {
    async fn store(&self, bytes: Vec<u8>) -> Result<String, StorageError>;

    async fn retrieve(&self, handle: &str) -> Result<Vec<u8>, StorageError>;
}

/// Content-addressed store on the local filesystem: the handle is the SHA-256
/// of the content, files live under `<root>/<first two hex chars>/<handle>`.
#[derive(Debug, Clone)]
pub(crate) struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub(crate) async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let root = PathBuf::from(&settings.storage().file_store_dir);
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("Failed to create file store at {}", root.display()))?;
        Ok(Self::new(root))
    }

    fn path_for(&self, handle: &str) -> Result<PathBuf, StorageError> {
        if !is_valid_handle(handle) {
            return Err(StorageError::InvalidHandle(handle.to_string()));
        }
        Ok(self.root.join(&handle[..2]).join(handle))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn store(&self, bytes: Vec<u8>) -> Result<String, StorageError> {
        let handle = hex::encode(Sha256::digest(&bytes));
        let path = self.path_for(&handle)?;

        if tokio::fs::try_exists(&path).await? {
            tracing::debug!(handle = %handle, "File already stored");
            return Ok(handle);
        }

        let dir = path.parent().unwrap_or(self.root.as_path());
        tokio::fs::create_dir_all(dir).await?;

        let staging = dir.join(format!(".{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&staging, &bytes).await?;
        if let Err(err) = tokio::fs::rename(&staging, &path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(err.into());
        }

        tracing::debug!(handle = %handle, size = bytes.len(), "Stored file");
        Ok(handle)
    }

    async fn retrieve(&self, handle: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(handle)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(handle.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }
}

pub(crate) fn is_valid_handle(handle: &str) -> bool {
    handle.len() == 64 && handle.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
