//! Edge types for the skill graph.

use serde::{Deserialize, Serialize};
use super::node::NodeId;

/// Type of relation between two graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    /// Occupation requires the skill.
    Requires,
    /// Loosely related nodes.
    Related,
    /// Skill belongs to a skill group.
    MemberOf,
    /// Career progression between occupations.
    ProgressesTo,
    /// Default/unspecified.
    Default,
}

impl EdgeType {
    /// Parse edge type from string. Unknown strings map to `Default`.
    pub fn parse_lossy(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "requires" | "essential" | "optional" => Self::Requires,
            "related" => Self::Related,
            "member_of" | "memberof" | "broader" => Self::MemberOf,
            "progresses_to" | "progression" => Self::ProgressesTo,
            _ => Self::Default,
        }
    }
}

impl Default for EdgeType {
    fn default() -> Self {
        Self::Default
    }
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Requires => write!(f, "requires"),
            Self::Related => write!(f, "related"),
            Self::MemberOf => write!(f, "member_of"),
            Self::ProgressesTo => write!(f, "progresses_to"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Edge in the skill graph.
///
/// Stored with a direction for provenance, but traversal treats it as undirected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Source node.
    pub source: NodeId,
    /// Target node.
    pub target: NodeId,
    /// Non-negative weight.
    pub weight: f32,
    /// Relation type.
    #[serde(default)]
    pub edge_type: EdgeType,
}

impl GraphEdge {
    /// Create a new edge. Negative or non-finite weights are clamped to zero.
    pub fn new(source: NodeId, target: NodeId, weight: f32, edge_type: EdgeType) -> Self {
        let weight = if weight.is_finite() { weight.max(0.0) } else { 0.0 };
        Self {
            source,
            target,
            weight,
            edge_type,
        }
    }

    /// Create a unit-weight edge of default type.
    pub fn unit(source: NodeId, target: NodeId) -> Self {
        Self::new(source, target, 1.0, EdgeType::Default)
    }

    /// Unordered endpoint pair, smaller id first.
    pub fn endpoints(&self) -> (&NodeId, &NodeId) {
        if self.source <= self.target {
            (&self.source, &self.target)
        } else {
            (&self.target, &self.source)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_are_unordered() {
        let a = NodeId::from("skill::a");
        let b = NodeId::from("skill::b");

        let e1 = GraphEdge::unit(a.clone(), b.clone());
        let e2 = GraphEdge::unit(b, a);

        assert_eq!(e1.endpoints(), e2.endpoints());
    }

    #[test]
    fn test_negative_weight_clamped() {
        let e = GraphEdge::new("skill::a".into(), "skill::b".into(), -2.0, EdgeType::Related);
        assert_eq!(e.weight, 0.0);

        let e = GraphEdge::new("skill::a".into(), "skill::b".into(), f32::NAN, EdgeType::Related);
        assert_eq!(e.weight, 0.0);
    }

    #[test]
    fn test_edge_type_parse_lossy() {
        assert_eq!(EdgeType::parse_lossy("REQUIRES"), EdgeType::Requires);
        assert_eq!(EdgeType::parse_lossy("member_of"), EdgeType::MemberOf);
        assert_eq!(EdgeType::parse_lossy("whatever"), EdgeType::Default);
    }
}
