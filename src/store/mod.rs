//! Graph storage backends.
//!
//! Topology (`GraphStore`) and node payloads (`NodeEmbeddingStore`) are kept
//! apart: traversal asks the former for neighbors and the latter for labels,
//! types and vectors. Both are read-only after load, so concurrent traversals
//! share them through `Arc` without locking.

pub mod memory;
pub mod embedding;
pub mod bundle;

use crate::types::{NodeId, EdgeType};

/// Trait for graph topology backends.
///
/// The graph is undirected. Implementations must return neighbors in a
/// deterministic order (ascending `NodeId`), and must not double count
/// duplicate edges.
pub trait GraphStore: Send + Sync {
    /// Whether the node takes part in the topology (has at least one edge).
    fn contains(&self, id: &NodeId) -> bool;

    /// Direct neighbors, ordered by id.
    fn neighbors(&self, id: &NodeId) -> Vec<NodeId>;

    /// Number of distinct neighbors.
    fn degree(&self, id: &NodeId) -> usize {
        self.neighbors(id).len()
    }

    /// Relation between two nodes, in either orientation.
    fn edge_between(&self, a: &NodeId, b: &NodeId) -> Option<(f32, EdgeType)>;

    /// Whether two nodes are directly connected.
    fn are_connected(&self, a: &NodeId, b: &NodeId) -> bool {
        self.edge_between(a, b).is_some()
    }
}

pub use memory::InMemoryGraphStore;
pub use embedding::NodeEmbeddingStore;
pub use bundle::{GraphBundle, LoadedGraph, BundleError};
