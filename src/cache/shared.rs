//! Shared (cross-process) cache backends.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

/// Error type for shared cache backends.
#[derive(Debug, thiserror::Error)]
pub enum CacheBackendError {
    /// The cache service could not be reached.
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// The cache service rejected the command.
    #[error("Cache command failed: {0}")]
    Command(String),
}

/// A namespaced key/value service with TTLs in seconds (Redis-like).
///
/// Only single-key operations are relied upon.
#[async_trait]
pub trait SharedCacheBackend: Send + Sync {
    /// Fetch a value.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheBackendError>;

    /// Store a value that expires after `ttl_secs`.
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheBackendError>;

    /// Remove a key.
    async fn delete(&self, key: &str) -> Result<(), CacheBackendError>;

    /// Remove every key starting with `prefix`; returns how many were removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheBackendError>;
}

/// In-process [`SharedCacheBackend`], for single-node deployments and tests.
#[derive(Debug, Default)]
pub struct InMemorySharedCache {
    entries: Mutex<HashMap<String, (String, Option<Instant>)>>,
}

impl InMemorySharedCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl SharedCacheBackend for InMemorySharedCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheBackendError> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some((_, Some(expires_at))) if Instant::now() >= *expires_at => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheBackendError> {
        // A TTL past the clock's range never expires.
        let expires_at = Instant::now().checked_add(Duration::from_secs(ttl_secs));
        self.entries
            .lock()
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheBackendError> {
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheBackendError> {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|k, _| !k.starts_with(prefix));
        Ok((before - entries.len()) as u64)
    }
}
