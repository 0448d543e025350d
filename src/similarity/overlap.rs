//! Neighbor-overlap similarity heuristic.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::store::{GraphStore, NodeEmbeddingStore};
use crate::types::NodeId;
use super::{ScoringStrategy, SimilarityScorer};

/// Bonus when the two nodes share an edge.
pub const ADJACENCY_BONUS: f32 = 0.3;
/// Bonus when the two nodes have the same type.
pub const SAME_TYPE_BONUS: f32 = 0.1;

/// Jaccard index of direct-neighbor sets plus adjacency/type bonuses.
///
/// ```text
/// sim(a, b) = min(1, |N(a) ∩ N(b)| / |N(a) ∪ N(b)| + 0.3·[a ~ b] + 0.1·[type(a) = type(b)])
/// ```
pub struct NeighborOverlapSimilarity<G: GraphStore + ?Sized> {
    nodes: Arc<NodeEmbeddingStore>,
    graph: Arc<G>,
}

impl<G: GraphStore + ?Sized> NeighborOverlapSimilarity<G> {
    /// Create the heuristic scorer over a topology.
    pub fn new(nodes: Arc<NodeEmbeddingStore>, graph: Arc<G>) -> Self {
        Self { nodes, graph }
    }

    fn jaccard(&self, a: &NodeId, b: &NodeId) -> f32 {
        let na: BTreeSet<NodeId> = self.graph.neighbors(a).into_iter().collect();
        let nb: BTreeSet<NodeId> = self.graph.neighbors(b).into_iter().collect();

        let union = na.union(&nb).count();
        if union == 0 {
            return 0.0;
        }
        na.intersection(&nb).count() as f32 / union as f32
    }

    fn same_type(&self, a: &NodeId, b: &NodeId) -> bool {
        let type_of = |id: &NodeId| self.nodes.get(id).map(|n| n.node_type).or_else(|| id.node_type());
        match (type_of(a), type_of(b)) {
            (Some(ta), Some(tb)) => ta == tb,
            _ => false,
        }
    }
}

impl<G: GraphStore + ?Sized> SimilarityScorer for NeighborOverlapSimilarity<G> {
    fn similarity(&self, a: &NodeId, b: &NodeId) -> f32 {
        if a == b {
            return 1.0;
        }

        let mut score = self.jaccard(a, b);
        if self.graph.are_connected(a, b) {
            score += ADJACENCY_BONUS;
        }
        if self.same_type(a, b) {
            score += SAME_TYPE_BONUS;
        }
        score.clamp(0.0, 1.0)
    }

    fn strategy(&self) -> ScoringStrategy {
        ScoringStrategy::NeighborOverlap
    }
}
