use crate::traits::{CacheFile, CacheStorage, StorageError, StorageResult};
use async_trait::async_trait;
use lumina_core::constants::STREAM_DIR_SUFFIX;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem cache storage implementation
#[derive(Clone, Debug)]
pub struct LocalCacheStorage {
    base_path: PathBuf,
}

impl LocalCacheStorage {
    /// Create a new LocalCacheStorage rooted at `base_path`
    /// (e.g. "/var/lib/lumina/cache"), creating the directory if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create cache directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        let base_path = base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        Ok(LocalCacheStorage { base_path })
    }

    /// Convert a cache file name to a filesystem path.
    ///
    /// Names are flat: anything that could resolve outside the cache root is
    /// rejected.
    fn name_to_path(&self, name: &str) -> StorageResult<PathBuf> {
        if name.is_empty()
            || name.contains("..")
            || name.contains('/')
            || name.contains('\\')
            || name.contains('\0')
        {
            return Err(StorageError::InvalidKey(name.to_string()));
        }

        Ok(self.base_path.join(name))
    }
}

async fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(data).await?;
    file.sync_all().await
}

#[async_trait]
impl CacheStorage for LocalCacheStorage {
    async fn create_cache_file(&self, name: &str, data: &[u8]) -> StorageResult<CacheFile> {
        let start = std::time::Instant::now();
        let path = self.name_to_path(name)?;

        // Unique per writer so concurrent creators never share a temp file.
        let tmp_path = self
            .base_path
            .join(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4().simple()));

        let written = write_synced(&tmp_path, data).await;
        let published = match written {
            Ok(()) => fs::hard_link(&tmp_path, &path).await,
            Err(e) => Err(e),
        };
        // The inode lives on under `path` when the link succeeded.
        if let Err(e) = fs::remove_file(&tmp_path).await {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!(
                    path = %tmp_path.display(),
                    error = %e,
                    "Failed to remove temp file"
                );
            }
        }

        match published {
            Ok(()) => {
                tracing::info!(
                    name = %name,
                    size_bytes = data.len(),
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Cache file written"
                );
                Ok(CacheFile::new(name, path))
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(StorageError::AlreadyExists(name.to_string()))
            }
            Err(e) => Err(StorageError::WriteFailed(format!(
                "Failed to create file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn get_cache_file_by_name(&self, name: &str) -> StorageResult<CacheFile> {
        let path = self.name_to_path(name)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(name.to_string()));
        }

        Ok(CacheFile::new(name, path))
    }

    async fn stream_dir(&self, content_id: &str) -> StorageResult<PathBuf> {
        let path = self.name_to_path(&format!("{}{}", content_id, STREAM_DIR_SUFFIX))?;

        match fs::create_dir(&path).await {
            Ok(()) => Ok(path),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(path),
            Err(e) => Err(StorageError::IoError(e)),
        }
    }

    fn root(&self) -> &Path {
        &self.base_path
    }
}
