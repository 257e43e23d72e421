//! In-process LRU of derivative bytes.
//!
//! Sits in front of the cache storage so repeated fetches of the same
//! rendition skip the disk. Entries are never invalidated: derivative names
//! are content-addressed, so the bytes behind a key never change.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use lru::LruCache;
use lumina_core::Quality;
use parking_lot::Mutex;

/// Key for one rendition: content id, quality and page, concatenated.
pub fn hot_cache_key(content_id: &str, quality: Quality, page: u32) -> String {
    format!("{}{}{}", content_id, quality.as_str(), page)
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotCacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Shared, bounded key → bytes cache.
pub struct HotBytesCache {
    cache: Mutex<LruCache<String, Bytes>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl HotBytesCache {
    /// `capacity` is a count of entries; zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);

        Self {
            cache: Mutex::new(LruCache::new(cap)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        let found = self.cache.lock().get(key).cloned();
        match found {
            Some(bytes) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(bytes)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn set(&self, key: impl Into<String>, bytes: Bytes) {
        self.cache.lock().put(key.into(), bytes);
    }

    /// Presence check that does not touch recency or counters.
    pub fn contains(&self, key: &str) -> bool {
        self.cache.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    pub fn stats(&self) -> HotCacheStats {
        let cache = self.cache.lock();
        HotCacheStats {
            entries: cache.len(),
            capacity: cache.cap().get(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
