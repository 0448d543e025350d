//! Traversal policy definitions.

pub mod v1;
pub mod scoring;

pub use v1::{TraversalPolicy, DEFAULT_NODE_CAP};
pub use scoring::{NeighborCandidate, rank_candidates};
