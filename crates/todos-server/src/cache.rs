//! Single-slot listing cache with TTL support.
//!
//! A read-through cache for the full-listing endpoint: the handler checks
//! the slot, falls back to the store on a miss, and writes the fresh
//! snapshot back with a fixed time-to-live. Expiry is passive — entries
//! are only checked when read, never evicted in the background — and no
//! write-side operation invalidates the slot, so a listing may be stale
//! until natural expiry. Concurrent misses each query the store and
//! overwrite the slot last-write-wins.
//!
//! [`ListingCache::invalidate`] is the eviction hook for adopting systems
//! that want write-through invalidation instead; no handler here calls it.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A cached entry with TTL support.
///
/// The data is wrapped in `Arc` to allow cheap cloning on cache hits.
#[derive(Clone, Debug)]
pub struct CachedEntry {
    pub data: Arc<Vec<u8>>,
    pub cached_at: Instant,
    pub ttl: Duration,
}

impl CachedEntry {
    /// Create a new cached entry.
    pub fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data: Arc::new(data),
            cached_at: Instant::now(),
            ttl,
        }
    }

    /// Check if this entry has expired.
    pub fn is_expired(&self) -> bool {
        self.cached_at.elapsed() > self.ttl
    }
}

/// Keyed cache of listing snapshots, shared across request tasks.
#[derive(Clone)]
pub struct ListingCache {
    entries: Arc<DashMap<&'static str, CachedEntry>>,
    ttl: Duration,
}

impl ListingCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Get a cached snapshot, or `None` on miss or expiry.
    pub fn get(&self, key: &'static str) -> Option<Arc<Vec<u8>>> {
        let result = self
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| Arc::clone(&entry.data));

        if result.is_some() {
            tracing::debug!(key, "cache hit");
        } else {
            tracing::debug!(key, "cache miss");
        }

        result
    }

    /// Store a snapshot under the configured TTL, replacing any previous
    /// entry.
    pub fn set(&self, key: &'static str, data: Vec<u8>) {
        self.entries.insert(key, CachedEntry::new(data, self.ttl));
    }

    /// Evict an entry. Exposed for write-through invalidation; the
    /// listing handlers never call this.
    pub fn invalidate(&self, key: &'static str) {
        self.entries.remove(key);
        tracing::debug!(key, "cache invalidated");
    }
}
