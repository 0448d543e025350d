//! Node similarity.
//!
//! One interface, two strategies picked once at construction:
//!
//! | Strategy | Formula | Needs |
//! |----------|---------|-------|
//! | `Encoder` | `(cos(enc(a), enc(b)) + 1) / 2` | encoder + every node encodable |
//! | `NeighborOverlap` | `jaccard(N(a), N(b)) + 0.3·adjacent + 0.1·same_type`, clamped | topology only |
//!
//! Both are symmetric, deterministic and return exactly `1.0` for `(x, x)`.
//! Their scales are not calibrated against each other; see `ScoringStrategy`.

pub mod encoder;
pub mod encoded;
pub mod overlap;
pub mod memo;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::store::{GraphStore, NodeEmbeddingStore};
use crate::types::NodeId;

pub use encoder::{NodeEncoder, MeanAggregationEncoder, EncoderWeights, EncoderError};
pub use encoded::EncoderSimilarity;
pub use overlap::NeighborOverlapSimilarity;
pub use memo::{MemoizedScorer, MemoStats};

/// Which similarity strategy a scorer runs.
///
/// Scores from different strategies live on different scales and must not
/// be compared with each other; cache keys include the strategy for this reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringStrategy {
    /// Cosine over graph-encoder outputs.
    Encoder,
    /// Neighbor-overlap heuristic.
    NeighborOverlap,
}

impl std::fmt::Display for ScoringStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encoder => write!(f, "encoder"),
            Self::NeighborOverlap => write!(f, "neighbor_overlap"),
        }
    }
}

/// Normalized similarity between two graph nodes.
///
/// Implementations must be symmetric, deterministic, return values in
/// `[0, 1]`, and return `1.0` when both ids are equal.
pub trait SimilarityScorer: Send + Sync {
    /// Similarity of two nodes in `[0, 1]`.
    fn similarity(&self, a: &NodeId, b: &NodeId) -> f32;

    /// The strategy this scorer runs.
    fn strategy(&self) -> ScoringStrategy;
}

impl<S: SimilarityScorer + ?Sized> SimilarityScorer for Arc<S> {
    fn similarity(&self, a: &NodeId, b: &NodeId) -> f32 {
        (**self).similarity(a, b)
    }

    fn strategy(&self) -> ScoringStrategy {
        (**self).strategy()
    }
}

/// Pick the scoring strategy once.
///
/// The encoder strategy is used only when an encoder is given and every node
/// encodes; anything else falls back to the neighbor-overlap heuristic.
pub fn build_scorer<G>(
    nodes: Arc<NodeEmbeddingStore>,
    graph: Arc<G>,
    encoder: Option<Arc<dyn NodeEncoder>>,
) -> Arc<dyn SimilarityScorer>
where
    G: GraphStore + 'static,
{
    if let Some(encoder) = encoder {
        match EncoderSimilarity::build(&nodes, graph.as_ref(), encoder.as_ref()) {
            Ok(scorer) => {
                info!(nodes = nodes.len(), strategy = %ScoringStrategy::Encoder, "Similarity scorer ready");
                return Arc::new(scorer);
            }
            Err(e) => {
                warn!(error = %e, "Graph encoder unusable, falling back to neighbor-overlap similarity");
            }
        }
    }

    info!(strategy = %ScoringStrategy::NeighborOverlap, "Similarity scorer ready");
    Arc::new(NeighborOverlapSimilarity::new(nodes, graph))
}

/// Cosine similarity in `[-1, 1]`; zero vectors and length mismatches give 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

/// Rescale a cosine from `[-1, 1]` to `[0, 1]`.
pub fn rescale_cosine(cos: f32) -> f32 {
    ((cos + 1.0) / 2.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_cosine_symmetric_bitwise() {
        let a = [0.3, -0.7, 0.11, 0.5];
        let b = [0.9, 0.2, -0.4, 0.05];
        assert_eq!(cosine_similarity(&a, &b).to_bits(), cosine_similarity(&b, &a).to_bits());
    }

    #[test]
    fn test_rescale() {
        assert_eq!(rescale_cosine(-1.0), 0.0);
        assert_eq!(rescale_cosine(0.0), 0.5);
        assert_eq!(rescale_cosine(1.0), 1.0);
        assert_eq!(rescale_cosine(1.000_001), 1.0);
    }
}
