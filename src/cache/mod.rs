//! Multi-tier cache.
//!
//! A shared service (Redis-like) is tried first; any failure falls through
//! to a process-local tier with its own TTL bookkeeping. The cache is an
//! injected instance, never global state.

pub mod shared;
pub mod local;
pub mod tier;
pub mod keys;

pub use shared::{SharedCacheBackend, InMemorySharedCache, CacheBackendError};
pub use local::{LocalCache, DEFAULT_LOCAL_CAPACITY};
pub use tier::{CacheTier, CacheStats};
pub use keys::{
    synthesis_key, exploration_key, normalize_subject, TREE_NAMESPACE, EXPLORE_NAMESPACE, PROGRESSION_NAMESPACE,
};
