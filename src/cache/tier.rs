//! Two-tier cache: shared service first, process-local fallback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::local::LocalCache;
use super::shared::SharedCacheBackend;

/// Cache counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups that found a value.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Shared-tier failures that fell through to the local tier.
    pub shared_errors: u64,
    /// Local entries evicted for capacity.
    pub local_evictions: u64,
    /// Entries currently held locally.
    pub local_entries: usize,
}

impl CacheStats {
    /// Hit rate in `[0, 1]`.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Generic get/set/delete with TTL over two physical tiers.
///
/// The shared tier is authoritative whenever it answers. Any shared-tier
/// error falls through to the local tier, so callers never see cache
/// failures; writes go to both tiers. Safe to share across tasks.
pub struct CacheTier {
    shared: Option<Arc<dyn SharedCacheBackend>>,
    local: LocalCache,
    hits: AtomicU64,
    misses: AtomicU64,
    shared_errors: AtomicU64,
    local_evictions: AtomicU64,
}

impl CacheTier {
    /// Create a cache with an optional shared tier.
    pub fn new(shared: Option<Arc<dyn SharedCacheBackend>>, local_capacity: usize) -> Self {
        Self {
            shared,
            local: LocalCache::new(local_capacity),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            shared_errors: AtomicU64::new(0),
            local_evictions: AtomicU64::new(0),
        }
    }

    /// Local-only cache.
    pub fn local_only(local_capacity: usize) -> Self {
        Self::new(None, local_capacity)
    }

    /// Whether a shared tier is configured.
    pub fn has_shared(&self) -> bool {
        self.shared.is_some()
    }

    /// Fetch a value. A miss is `None`, never an error.
    pub async fn get(&self, key: &str) -> Option<String> {
        let value = match &self.shared {
            Some(shared) => match shared.get(key).await {
                Ok(value) => value,
                Err(e) => {
                    self.shared_errors.fetch_add(1, Ordering::Relaxed);
                    warn!(key, error = %e, "Shared cache read failed, using local tier");
                    self.local.get(key)
                }
            },
            None => self.local.get(key),
        };

        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        debug!(key, hit = value.is_some(), "Cache lookup");
        value
    }

    /// Store a value in both tiers.
    pub async fn set(&self, key: &str, value: &str, ttl: Duration) {
        let evicted = self.local.set(key, value, ttl);
        if evicted > 0 {
            self.local_evictions.fetch_add(evicted as u64, Ordering::Relaxed);
        }

        if let Some(shared) = &self.shared {
            // Redis-style TTLs are whole seconds; never send 0 (no expiry).
            let ttl_secs = ttl.as_secs().max(1);
            if let Err(e) = shared.set_ex(key, value, ttl_secs).await {
                self.shared_errors.fetch_add(1, Ordering::Relaxed);
                warn!(key, error = %e, "Shared cache write failed, kept locally");
            }
        }
    }

    /// Remove a key from both tiers.
    pub async fn delete(&self, key: &str) {
        self.local.delete(key);
        if let Some(shared) = &self.shared {
            if let Err(e) = shared.delete(key).await {
                self.shared_errors.fetch_add(1, Ordering::Relaxed);
                warn!(key, error = %e, "Shared cache delete failed");
            }
        }
    }

    /// Remove every key in a namespace (`"<ns>:"` prefix) from both tiers.
    pub async fn clear_namespace(&self, namespace: &str) -> u64 {
        let prefix = format!("{namespace}:");
        let mut removed = self.local.delete_prefix(&prefix) as u64;

        if let Some(shared) = &self.shared {
            match shared.delete_prefix(&prefix).await {
                Ok(n) => removed = removed.max(n),
                Err(e) => {
                    self.shared_errors.fetch_add(1, Ordering::Relaxed);
                    warn!(namespace, error = %e, "Shared cache namespace clear failed");
                }
            }
        }
        removed
    }

    /// Fetch and decode a JSON value. Undecodable entries are dropped and
    /// reported as a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Dropping undecodable cache entry");
                self.delete(key).await;
                None
            }
        }
    }

    /// Encode and store a JSON value.
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_string(value) {
            Ok(raw) => self.set(key, &raw, ttl).await,
            Err(e) => warn!(key, error = %e, "Value not cacheable"),
        }
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            shared_errors: self.shared_errors.load(Ordering::Relaxed),
            local_evictions: self.local_evictions.load(Ordering::Relaxed),
            local_entries: self.local.len(),
        }
    }
}

impl Default for CacheTier {
    fn default() -> Self {
        Self::local_only(super::local::DEFAULT_LOCAL_CAPACITY)
    }
}
