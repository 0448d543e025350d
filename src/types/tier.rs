//! Ranked progression tiers.

use serde::{Deserialize, Serialize};

use super::node::{NodeId, NodeType};

/// A scored node reference inside a tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSkill {
    /// Node id.
    pub id: NodeId,
    /// Node type.
    pub node_type: NodeType,
    /// Human-readable label.
    pub label: String,
    /// Final ranking score (personalized when a profile was given).
    pub score: f32,
    /// Graph-only score.
    pub graph_score: f32,
    /// Affinity to the user profile, when personalized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_affinity: Option<f32>,
}

/// A depth-bucketed, ranked, de-duplicated slice of traversal results.
///
/// `skills` is sorted descending by score; an id appears in at most one tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    /// Tier number (the traversal depth it was bucketed from).
    pub tier_number: u32,
    /// Ranked entries.
    pub skills: Vec<TierSkill>,
}

impl Tier {
    /// Whether the tier contains a node.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.skills.iter().any(|s| &s.id == id)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.skills.len()
    }

    /// Whether the tier has no entries.
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}
