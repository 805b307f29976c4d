//! Memoization cache for resolvable computations.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};

use crate::error::ResolveError;
use crate::observability::metrics;

/// Type-erased value produced by a computation.
pub type ErasedValue = Arc<dyn Any + Send + Sync>;

/// Shared handle on one in-flight or settled computation.
pub type SharedResolution = Shared<BoxFuture<'static, Result<ErasedValue, ResolveError>>>;

struct CacheEntry {
    id: u64,
    resolution: SharedResolution,
    last_used: AtomicU64,
}

/// A concurrent, capacity-bounded cache of computations keyed by input.
///
/// At most one computation exists per key; every caller asking for that key
/// gets a clone of the same shared future. When the cache grows past its
/// capacity the least recently used entry is dropped. Dropping an entry
/// never aborts the computation, callers already holding it keep polling.
pub struct ResolvableCache {
    inner: DashMap<String, CacheEntry>,
    capacity: usize,
    clock: AtomicU64,
    ids: AtomicU64,
}

impl ResolvableCache {
    /// Create an empty cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: DashMap::new(),
            capacity: capacity.max(1),
            clock: AtomicU64::new(0),
            ids: AtomicU64::new(0),
        }
    }

    /// Return the computation for `key`, starting it with `start` if absent.
    ///
    /// The returned id identifies this particular entry for [`Self::evict_failed`].
    pub fn get_or_start<F>(&self, key: &str, start: F) -> (u64, SharedResolution)
    where
        F: FnOnce() -> BoxFuture<'static, Result<ErasedValue, ResolveError>>,
    {
        let tick = self.clock.fetch_add(1, Ordering::Relaxed);

        if let Some(entry) = self.inner.get(key) {
            entry.last_used.store(tick, Ordering::Relaxed);
            metrics::record_cache_hit();
            return (entry.id, entry.resolution.clone());
        }

        // Another caller may have inserted between the lookup and here
        let mut inserted = false;
        let (id, resolution) = {
            let entry = self.inner.entry(key.to_string()).or_insert_with(|| {
                inserted = true;
                CacheEntry {
                    id: self.ids.fetch_add(1, Ordering::Relaxed),
                    resolution: start().shared(),
                    last_used: AtomicU64::new(tick),
                }
            });
            entry.last_used.store(tick, Ordering::Relaxed);
            (entry.id, entry.resolution.clone())
        };

        if inserted {
            metrics::record_cache_miss();
            self.evict_overflow(key);
            metrics::record_cache_size(self.inner.len());
        } else {
            metrics::record_cache_hit();
        }
        (id, resolution)
    }

    /// Drop the entry for `key` if it is still the failed entry `id`.
    ///
    /// A newer computation started under the same key is left alone.
    pub fn evict_failed(&self, key: &str, id: u64) {
        if self.inner.remove_if(key, |_, entry| entry.id == id).is_some() {
            tracing::debug!(key, "Evicted failed resolution");
            metrics::record_cache_size(self.inner.len());
        }
    }

    /// Forget the computation for `key`.
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = self.inner.remove(key).is_some();
        metrics::record_cache_size(self.inner.len());
        removed
    }

    /// Forget every computation.
    pub fn clear(&self) {
        self.inner.clear();
        metrics::record_cache_size(0);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn evict_overflow(&self, keep: &str) {
        while self.inner.len() > self.capacity {
            let oldest = self
                .inner
                .iter()
                .filter(|r| r.key() != keep)
                .min_by_key(|r| r.value().last_used.load(Ordering::Relaxed))
                .map(|r| r.key().clone());

            match oldest {
                Some(key) => {
                    self.inner.remove(&key);
                    tracing::debug!(key = %key, capacity = self.capacity, "Evicted least recently used resolution");
                }
                None => break,
            }
        }
    }
}

impl Default for ResolvableCache {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for ResolvableCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvableCache")
            .field("entries", &self.inner.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
