//! Lumina Services Layer
//!
//! This crate hosts the derivative-media services: the derivative cache
//! manager with its in-memory hot-bytes cache, the per-media video streamer,
//! the similarity ranker with its embedding client and circuit breaker, and
//! media import. It re-exports the storage and processing types callers need
//! so a binary can depend on this crate alone.

pub mod derivatives;
pub mod hot_cache;
pub mod import;
pub mod similarity;
pub mod video;

pub use derivatives::{DerivativeCacheManager, DerivativeConfig};
pub use hot_cache::{hot_cache_key, HotBytesCache, HotCacheStats};
pub use import::{MediaCatalog, MediaImporter};
pub use lumina_processing::{
    DocumentTool, FfmpegTool, ImageCodec, PopplerTool, ProbeReport, SegmentParams, VideoTool,
    WebpCodec,
};
pub use lumina_storage::{CacheFile, CacheStorage, LocalCacheStorage, StorageError, StorageResult};
pub use similarity::{
    rank_scores, CircuitBreaker, CircuitBreakerConfig, CircuitState, EmbeddingError,
    EmbeddingService, HdirClient, RankedMedia, SimilarityRanker,
};
pub use video::{ListFile, StreamConfig, StreamError, StreamRegistry, TranscodeState, VideoStreamer};
