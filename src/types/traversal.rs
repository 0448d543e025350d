//! Traversal export types.
//!
//! ## Invariants
//!
//! 1. **Cap**: `nodes.len()` never exceeds the policy's node cap
//! 2. **Depth**: every non-anchor node has `depth == depth(parent) + 1`
//! 3. **Admission**: every non-anchor node's `score` met `min_similarity`
//! 4. **Uniqueness**: each id is admitted once (first parent wins)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::edge::EdgeType;
use super::node::{NodeId, NodeType};

/// A node admitted by a traversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraversedNode {
    /// Node type.
    pub node_type: NodeType,
    /// Human-readable label.
    pub label: String,
    /// Node metadata, copied from the store.
    pub metadata: BTreeMap<String, String>,
    /// Whether the node seeded the traversal.
    pub is_anchor: bool,
    /// BFS depth (0 for anchors).
    pub depth: u32,
    /// The node that discovered this one (`None` for anchors).
    pub parent: Option<NodeId>,
    /// Similarity to the discovering node (1.0 for anchors).
    pub score: f32,
}

/// Discovery edge between a parent and an admitted node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraversalEdge {
    /// Discovering node.
    pub source: NodeId,
    /// Admitted node.
    pub target: NodeId,
    /// Admission similarity.
    pub weight: f32,
    /// Relation type from the graph.
    pub edge_type: EdgeType,
}

/// Counters describing how a traversal ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalStats {
    /// Anchor ids passed in.
    pub anchors_requested: usize,
    /// Anchor ids that resolved to known nodes.
    pub anchors_used: usize,
    /// Nodes dequeued and expanded.
    pub expansions: usize,
    /// Similarity evaluations performed.
    pub pairs_scored: usize,
    /// Whether the hard node cap stopped the traversal.
    pub cap_reached: bool,
}

/// Result of a bounded similarity-weighted traversal.
///
/// Plain serializable data for presentation layers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraversalResult {
    /// Admitted nodes by id.
    pub nodes: BTreeMap<NodeId, TraversedNode>,
    /// Discovery edges in admission order.
    pub edges: Vec<TraversalEdge>,
    /// Run counters.
    pub stats: TraversalStats,
}

impl TraversalResult {
    /// An empty result.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of admitted nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether nothing was admitted.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check if a node was admitted.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Anchor ids, sorted.
    pub fn anchors(&self) -> Vec<&NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.is_anchor)
            .map(|(id, _)| id)
            .collect()
    }

    /// Admitted node ids at a given depth, sorted.
    pub fn at_depth(&self, depth: u32) -> Vec<&NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.depth == depth)
            .map(|(id, _)| id)
            .collect()
    }

    /// Deepest depth reached.
    pub fn max_depth(&self) -> u32 {
        self.nodes.values().map(|n| n.depth).max().unwrap_or(0)
    }
}
