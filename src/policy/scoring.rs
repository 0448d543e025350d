//! Neighbor ranking for traversal expansion.

use crate::types::{EdgeType, NodeId};

/// A scored, not yet admitted neighbor.
#[derive(Debug, Clone)]
pub struct NeighborCandidate {
    /// Neighbor id.
    pub id: NodeId,
    /// Similarity to the node being expanded.
    pub similarity: f32,
    /// Relation type of the connecting edge.
    pub edge_type: EdgeType,
}

impl NeighborCandidate {
    /// Create a new candidate.
    pub fn new(id: NodeId, similarity: f32, edge_type: EdgeType) -> Self {
        Self { id, similarity, edge_type }
    }
}

impl PartialEq for NeighborCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for NeighborCandidate {}

impl PartialOrd for NeighborCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NeighborCandidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Primary: higher similarity first
        // Secondary: by NodeId for determinism
        match other.similarity.partial_cmp(&self.similarity) {
            Some(std::cmp::Ordering::Equal) | None => self.id.cmp(&other.id),
            Some(ord) => ord,
        }
    }
}

/// Keep candidates at or above `min_similarity`, best first, at most `limit`.
pub fn rank_candidates(
    mut candidates: Vec<NeighborCandidate>,
    min_similarity: f32,
    limit: usize,
) -> Vec<NeighborCandidate> {
    candidates.retain(|c| c.similarity.is_finite() && c.similarity >= min_similarity);
    candidates.sort();
    candidates.truncate(limit);
    candidates
}
