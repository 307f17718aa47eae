//! Namespaced compute-or-fetch cache
//!
//! Callers hand the cache a computation; a live entry short-circuits it, a
//! missing or expired entry runs it and stores the result. A failed
//! computation is never cached and its error reaches the caller untouched.
//! Eviction is lazy: an expired entry is only removed at the next lookup
//! of that exact key, there is no background sweep.

use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

struct CacheEntry {
    value: Value,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_live(&self) -> bool {
        self.stored_at.elapsed() < self.ttl
    }
}

/// Hit/miss accounting snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

struct Inner {
    entries: HashMap<(String, String), CacheEntry>,
    hits: u64,
    misses: u64,
}

/// Async compute-or-fetch cache with per-entry TTL
pub struct OrchestrationCache {
    inner: Mutex<Inner>,
    default_ttl: Duration,
}

impl OrchestrationCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                hits: 0,
                misses: 0,
            }),
            default_ttl,
        }
    }

    /// Return the cached value for `(namespace, key)` or compute and store
    /// it with the default TTL
    pub async fn with_cache<F, Fut>(
        &self,
        namespace: &str,
        key: &str,
        compute: F,
    ) -> anyhow::Result<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Value>>,
    {
        self.with_cache_ttl(namespace, key, self.default_ttl, compute)
            .await
    }

    /// Compute-or-fetch with an explicit TTL for this entry
    pub async fn with_cache_ttl<F, Fut>(
        &self,
        namespace: &str,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> anyhow::Result<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Value>>,
    {
        let cache_key = (namespace.to_string(), key.to_string());
        {
            let mut inner = self.inner.lock();
            let live_value = match inner.entries.get(&cache_key) {
                Some(entry) if entry.is_live() => Some(entry.value.clone()),
                Some(_) => {
                    // Expired; evict now so a failed recompute leaves no
                    // stale value behind
                    inner.entries.remove(&cache_key);
                    None
                }
                None => None,
            };
            if let Some(value) = live_value {
                inner.hits += 1;
                debug!(namespace, key, "Cache hit");
                return Ok(value);
            }
            inner.misses += 1;
        }

        debug!(namespace, key, "Cache miss");
        let value = compute().await?;

        let mut inner = self.inner.lock();
        inner.entries.insert(
            cache_key,
            CacheEntry {
                value: value.clone(),
                stored_at: Instant::now(),
                ttl,
            },
        );
        Ok(value)
    }

    /// Drop every entry in a namespace
    pub fn invalidate_namespace(&self, namespace: &str) {
        self.inner
            .lock()
            .entries
            .retain(|(ns, _), _| ns != namespace);
    }

    /// Hit/miss counters and hit rate
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let total = inner.hits + inner.misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            inner.hits as f64 / total as f64
        };
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            hit_rate,
        }
    }

    /// Number of stored entries, live or not yet evicted
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }
}
