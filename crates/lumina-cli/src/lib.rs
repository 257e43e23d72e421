//! Wiring shared by the `lumina` operator binary.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use lumina_core::{LuminaConfig, SourceFile};
use lumina_services::{
    CacheStorage, CircuitBreaker, CircuitBreakerConfig, DerivativeCacheManager,
    DerivativeConfig, FfmpegTool, HdirClient, HotBytesCache, LocalCacheStorage, MediaCatalog,
    MediaImporter, PopplerTool, SimilarityRanker, StreamConfig, StreamRegistry, VideoTool,
    WebpCodec,
};
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

/// Content id of a file: lowercase hex SHA-256 of its bytes.
pub async fn content_id(path: &Path) -> anyhow::Result<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Source file for `path`, identified by its canonical path.
pub fn source_file(path: &Path) -> anyhow::Result<SourceFile> {
    let path = path
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", path.display()))?;
    Ok(SourceFile::new(path.to_string_lossy().into_owned(), path))
}

/// The services of one process, built from configuration.
pub struct Lumina {
    pub config: LuminaConfig,
    pub derivatives: Arc<DerivativeCacheManager>,
    pub importer: MediaImporter,
    pub streams: StreamRegistry,
    pub ranker: Option<SimilarityRanker>,
}

impl Lumina {
    pub async fn new(config: LuminaConfig) -> anyhow::Result<Self> {
        let storage: Arc<dyn CacheStorage> = Arc::new(
            LocalCacheStorage::new(&config.cache_dir)
                .await
                .context("Failed to open cache directory")?,
        );
        let video: Arc<dyn VideoTool> = Arc::new(
            FfmpegTool::new(&config.ffmpeg_path, &config.ffprobe_path)
                .context("Invalid FFmpeg configuration")?,
        );
        let documents = PopplerTool::new(
            &config.pdfinfo_path,
            &config.pdftoppm_path,
            config.document_render_dpi,
        )
        .context("Invalid document tool configuration")?;

        let derivatives = Arc::new(DerivativeCacheManager::new(
            Arc::clone(&storage),
            Arc::new(WebpCodec),
            Arc::clone(&video),
            Arc::new(documents),
            Arc::new(HotBytesCache::new(config.hot_cache_capacity)),
            DerivativeConfig::from(&config),
        ));

        let importer = MediaImporter::new(
            Arc::new(MediaCatalog::new()),
            Arc::clone(&derivatives),
            Arc::clone(&video),
        );
        let streams = StreamRegistry::new(storage, video, StreamConfig::from(&config));

        let ranker = if config.hdir_enabled {
            let client = HdirClient::new(&config.hdir_url, config.hdir_timeout)
                .context("Failed to create embedding client")?;
            let breaker = CircuitBreaker::new(
                "hdir",
                CircuitBreakerConfig {
                    recheck_after: config.hdir_recheck_after,
                },
            );
            Some(SimilarityRanker::new(
                Arc::new(client),
                Arc::clone(&derivatives),
                Arc::new(breaker),
            ))
        } else {
            None
        };

        Ok(Self {
            config,
            derivatives,
            importer,
            streams,
            ranker,
        })
    }
}
