//! Core types for the skill-tree kernel.

pub mod node;
pub mod edge;
pub mod traversal;
pub mod tier;
pub mod tree;
pub mod profile;

pub use node::{NodeId, NodeType, GraphNode, NODE_ID_SEPARATOR};
pub use edge::{GraphEdge, EdgeType};
pub use traversal::{TraversalResult, TraversedNode, TraversalEdge, TraversalStats};
pub use tier::{Tier, TierSkill};
pub use tree::{TypedTreeNode, TreeAction};
pub use profile::UserProfile;
