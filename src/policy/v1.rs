//! TraversalPolicy v1: similarity-gated, width-bounded BFS.
//!
//! ## Float Normalization for Deterministic Hashing
//!
//! `min_similarity` is quantized to an integer before hashing (multiply by
//! 1e6 and round to i64), so cache keys derived from `params_hash` do not
//! depend on float formatting.

use serde::{Deserialize, Serialize};

use crate::canonical::{canonical_hash_hex, quantize_float};
use crate::error::{KernelError, Result};
use crate::DEFAULT_POLICY_VERSION;

/// Hard safety cap on admitted nodes.
pub const DEFAULT_NODE_CAP: usize = 100;

/// Quantized policy parameters for deterministic hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct QuantizedPolicyParams {
    version: String,
    max_depth: u32,
    min_similarity: i64,
    max_nodes_per_level: usize,
    node_cap: usize,
}

/// Traversal policy version 1.
///
/// ## Parameters
///
/// - `max_depth`: Maximum BFS depth from any anchor (anchors sit at 0)
/// - `min_similarity`: Admission threshold against the discovering node
/// - `max_nodes_per_level`: Admissions per expansion (the only bound on hubs)
/// - `node_cap`: Global cap on admitted nodes, anchors included
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalPolicy {
    /// Policy version identifier.
    pub version: String,
    /// Maximum depth.
    pub max_depth: u32,
    /// Minimum similarity for admission.
    pub min_similarity: f32,
    /// Maximum admissions per expanded node.
    pub max_nodes_per_level: usize,
    /// Global node cap.
    pub node_cap: usize,
}

impl TraversalPolicy {
    /// Create a policy with the default node cap.
    pub fn new(max_depth: u32, min_similarity: f32, max_nodes_per_level: usize) -> Self {
        Self {
            version: DEFAULT_POLICY_VERSION.to_string(),
            max_depth,
            min_similarity: min_similarity.clamp(0.0, 1.0),
            max_nodes_per_level,
            node_cap: DEFAULT_NODE_CAP,
        }
    }

    /// Override the node cap (builder style).
    pub fn with_node_cap(mut self, node_cap: usize) -> Self {
        self.node_cap = node_cap;
        self
    }

    /// Get the policy ID.
    pub fn policy_id(&self) -> &str {
        &self.version
    }

    /// Reject policies that cannot admit anything sensible.
    pub fn validate(&self) -> Result<()> {
        if !self.min_similarity.is_finite() || !(0.0..=1.0).contains(&self.min_similarity) {
            return Err(KernelError::InvalidInput(format!(
                "min_similarity must be in [0, 1], got {}",
                self.min_similarity
            )));
        }
        if self.node_cap == 0 {
            return Err(KernelError::InvalidInput("node_cap must be positive".into()));
        }
        Ok(())
    }

    /// Compute a hash of the policy parameters.
    ///
    /// Uses quantized float representation so the hash is stable across
    /// platforms and serializer versions.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(&self.to_quantized())
    }

    fn to_quantized(&self) -> QuantizedPolicyParams {
        QuantizedPolicyParams {
            version: self.version.clone(),
            max_depth: self.max_depth,
            min_similarity: quantize_float(self.min_similarity),
            max_nodes_per_level: self.max_nodes_per_level,
            node_cap: self.node_cap,
        }
    }
}

impl Default for TraversalPolicy {
    fn default() -> Self {
        Self {
            version: DEFAULT_POLICY_VERSION.to_string(),
            max_depth: 2,
            min_similarity: 0.3,
            max_nodes_per_level: 5,
            node_cap: DEFAULT_NODE_CAP,
        }
    }
}
