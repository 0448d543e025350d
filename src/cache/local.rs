//! Process-local cache tier.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Default number of entries kept locally.
pub const DEFAULT_LOCAL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
struct LocalEntry {
    value: String,
    /// `None` when the TTL overflows the clock; such entries never expire.
    expires_at: Option<Instant>,
}

impl LocalEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }

    /// Eviction order: soonest expiry first, never-expiring entries last.
    fn eviction_rank(&self) -> (bool, Option<Instant>) {
        (self.expires_at.is_none(), self.expires_at)
    }
}

/// TTL-aware, capacity-bounded in-process cache.
///
/// Expired entries are purged on read. Past capacity, the entry closest to
/// expiry is evicted first.
#[derive(Debug)]
pub struct LocalCache {
    entries: Mutex<HashMap<String, LocalEntry>>,
    capacity: usize,
}

impl LocalCache {
    /// Create a local cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Fetch a live value, dropping it if expired.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            Some(entry) if entry.is_live(Instant::now()) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        None
    }

    /// Store a value; returns how many entries were evicted to make room.
    pub fn set(&self, key: &str, value: &str, ttl: Duration) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        entries.insert(
            key.to_string(),
            LocalEntry {
                value: value.to_string(),
                expires_at: now.checked_add(ttl),
            },
        );

        let mut evicted = 0;
        if entries.len() > self.capacity {
            entries.retain(|_, e| e.is_live(now));
            while entries.len() > self.capacity {
                let oldest = entries
                    .iter()
                    .min_by(|a, b| a.1.eviction_rank().cmp(&b.1.eviction_rank()).then_with(|| a.0.cmp(b.0)))
                    .map(|(k, _)| k.clone());
                match oldest {
                    Some(k) => {
                        entries.remove(&k);
                        evicted += 1;
                    }
                    None => break,
                }
            }
        }
        evicted
    }

    /// Remove a key.
    pub fn delete(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Remove every key starting with `prefix`.
    pub fn delete_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|k, _| !k.starts_with(prefix));
        before - entries.len()
    }

    /// Drop every expired entry.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        before - entries.len()
    }
}

impl Default for LocalCache {
    fn default() -> Self {
        Self::new(DEFAULT_LOCAL_CAPACITY)
    }
}
