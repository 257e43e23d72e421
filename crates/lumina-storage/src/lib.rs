//! Lumina Storage Library
//!
//! This crate provides the cache file service: the place where derivatives
//! are written under their canonical names and looked up again later.
//!
//! # Layout
//!
//! Every derivative lives directly under the cache root:
//!
//! - **Stills**: `{content_id}-{quality}{_page}.webp`
//! - **Video streams**: `{content_id}-stream/` holding `list.m3u8` and `NNN.ts`
//!
//! Names must not contain `..`, path separators or a leading `/`. Files are
//! written under a hidden `.{name}.{uuid}.tmp` name and hard-linked into
//! place once complete.

pub mod local;
pub mod traits;

// Re-export commonly used types
pub use local::LocalCacheStorage;
pub use traits::{CacheFile, CacheStorage, StorageError, StorageResult};
