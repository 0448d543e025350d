//! Memoized pair scores.
//!
//! Traversal scores O(degree) pairs per expansion, and hub nodes are expanded
//! again and again across requests. Scores are deterministic, so a bounded LRU
//! of recent pairs is safe to share between concurrent traversals.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::RwLock;

use crate::types::NodeId;
use super::{ScoringStrategy, SimilarityScorer};

const DEFAULT_MEMO_CAPACITY: usize = 1000;

/// Unordered node pair, smaller id first.
type PairKey = (NodeId, NodeId);

fn pair_key(a: &NodeId, b: &NodeId) -> PairKey {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

/// Memo statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoStats {
    /// Current number of memoized pairs.
    pub len: usize,
    /// Maximum capacity.
    pub cap: usize,
    /// Lookups served from the memo.
    pub hits: u64,
    /// Lookups computed by the inner scorer.
    pub misses: u64,
}

/// LRU decorator around any [`SimilarityScorer`].
///
/// Thread-safe; the inner strategy is unchanged.
pub struct MemoizedScorer<S: SimilarityScorer> {
    inner: S,
    cache: RwLock<LruCache<PairKey, f32>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<S: SimilarityScorer> MemoizedScorer<S> {
    /// Wrap a scorer with a memo of `capacity` pairs (0 falls back to the default).
    pub fn new(inner: S, capacity: usize) -> Self {
        let size = NonZeroUsize::new(capacity)
            .or_else(|| NonZeroUsize::new(DEFAULT_MEMO_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: RwLock::new(LruCache::new(size)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Memo statistics.
    pub fn stats(&self) -> MemoStats {
        let cache = self.cache.read();
        MemoStats {
            len: cache.len(),
            cap: cache.cap().get(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Drop every memoized pair.
    pub fn clear(&self) {
        self.cache.write().clear();
    }
}

impl<S: SimilarityScorer> SimilarityScorer for MemoizedScorer<S> {
    fn similarity(&self, a: &NodeId, b: &NodeId) -> f32 {
        if a == b {
            return 1.0;
        }

        let key = pair_key(a, b);

        // Read lock first; peek does not reorder, so it needs no write access.
        if let Some(&score) = self.cache.read().peek(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return score;
        }

        let score = self.inner.similarity(&key.0, &key.1);
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.cache.write().put(key, score);
        score
    }

    fn strategy(&self) -> ScoringStrategy {
        self.inner.strategy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingScorer {
        calls: AtomicUsize,
    }

    impl SimilarityScorer for CountingScorer {
        fn similarity(&self, a: &NodeId, b: &NodeId) -> f32 {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if a.as_str() < b.as_str() { 0.25 } else { 0.75 }
        }

        fn strategy(&self) -> ScoringStrategy {
            ScoringStrategy::NeighborOverlap
        }
    }

    fn counting() -> CountingScorer {
        CountingScorer { calls: AtomicUsize::new(0) }
    }

    #[test]
    fn test_memo_hit_skips_inner() {
        let memo = MemoizedScorer::new(counting(), 10);
        let a = NodeId::from("skill::a");
        let b = NodeId::from("skill::b");

        memo.similarity(&a, &b);
        memo.similarity(&a, &b);

        assert_eq!(memo.inner.calls.load(Ordering::SeqCst), 1);
        let stats = memo.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.len, 1);
    }

    #[test]
    fn test_memo_is_order_insensitive() {
        let memo = MemoizedScorer::new(counting(), 10);
        let a = NodeId::from("skill::a");
        let b = NodeId::from("skill::b");

        // Inner scorer is deliberately asymmetric; the memo canonicalizes the pair.
        assert_eq!(memo.similarity(&b, &a), memo.similarity(&a, &b));
        assert_eq!(memo.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_identity_not_memoized() {
        let memo = MemoizedScorer::new(counting(), 10);
        let a = NodeId::from("skill::a");

        assert_eq!(memo.similarity(&a, &a), 1.0);
        assert_eq!(memo.stats().len, 0);
    }

    #[test]
    fn test_capacity_bounded() {
        let memo = MemoizedScorer::new(counting(), 2);
        let ids: Vec<NodeId> = ["a", "b", "c", "d"].iter().map(|k| NodeId::from(*k)).collect();

        memo.similarity(&ids[0], &ids[1]);
        memo.similarity(&ids[0], &ids[2]);
        memo.similarity(&ids[0], &ids[3]);

        assert_eq!(memo.stats().len, 2);
        assert_eq!(memo.stats().cap, 2);

        memo.clear();
        assert_eq!(memo.stats().len, 0);
    }
}
