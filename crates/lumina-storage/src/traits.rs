//! Cache storage abstraction
//!
//! This module defines the CacheStorage trait that derivative backends implement
//! and the CacheFile handle they hand out.

use async_trait::async_trait;
use bytes::Bytes;
use lumina_core::{CacheFileRef, MediaError};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tokio::fs;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Another caller already created a file under this name.
    #[error("Cache file already exists: {0}")]
    AlreadyExists(String),

    #[error("Cache file not found: {0}")]
    NotFound(String),

    #[error("Invalid cache file name: {0}")]
    InvalidKey(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for MediaError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(name) => MediaError::NotCached(name),
            StorageError::InvalidKey(name) => MediaError::InvalidInput(name),
            other => MediaError::Storage(other.to_string()),
        }
    }
}

/// Handle to one file under the cache root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheFile {
    name: String,
    path: PathBuf,
}

impl CacheFile {
    pub(crate) fn new(name: impl Into<String>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn absolute_path(&self) -> &Path {
        &self.path
    }

    pub async fn read_all(&self) -> StorageResult<Bytes> {
        let start = std::time::Instant::now();

        let data = fs::read(&self.path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(self.name.clone()),
            _ => StorageError::ReadFailed(format!(
                "Failed to read file {}: {}",
                self.path.display(),
                e
            )),
        })?;

        tracing::debug!(
            name = %self.name,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Cache file read"
        );

        Ok(Bytes::from(data))
    }

    pub async fn modified(&self) -> StorageResult<SystemTime> {
        let metadata = fs::metadata(&self.path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(self.name.clone()),
            _ => StorageError::IoError(e),
        })?;
        Ok(metadata.modified()?)
    }

    /// Reference stored on the media record.
    pub fn to_ref(&self) -> CacheFileRef {
        CacheFileRef {
            name: self.name.clone(),
            path: self.path.clone(),
        }
    }
}

/// Cache storage abstraction trait
///
/// Creation is exclusive and publishes complete files only: two callers
/// racing to create the same name get one `Ok` and one
/// `StorageError::AlreadyExists`, and a name never resolves to a file whose
/// bytes are still being written. Derivative generation treats
/// `AlreadyExists` as success because encoding the same source twice yields
/// the same bytes.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Store `data` under `name`. The name becomes visible only once every
    /// byte is on disk.
    async fn create_cache_file(&self, name: &str, data: &[u8]) -> StorageResult<CacheFile>;

    /// Look up an existing cache file by its canonical name.
    async fn get_cache_file_by_name(&self, name: &str) -> StorageResult<CacheFile>;

    /// Directory holding the segmented stream for `content_id`, created if
    /// missing.
    async fn stream_dir(&self, content_id: &str) -> StorageResult<PathBuf>;

    /// Root directory of the cache.
    fn root(&self) -> &Path;
}
