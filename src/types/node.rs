//! Node types for the skill graph.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Separator between the type namespace and the key in a [`NodeId`].
pub const NODE_ID_SEPARATOR: &str = "::";

/// Kind of node in the occupation/skill knowledge graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// An occupation (job title / role).
    Occupation,
    /// An individual skill or competency.
    Skill,
    /// A grouping of related skills.
    #[serde(alias = "skill_group")]
    SkillGroup,
}

impl NodeType {
    /// All node types, in canonical order.
    pub const ALL: [NodeType; 3] = [Self::Occupation, Self::Skill, Self::SkillGroup];

    /// Parse node type from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "occupation" => Some(Self::Occupation),
            "skill" => Some(Self::Skill),
            "skillgroup" | "skill_group" => Some(Self::SkillGroup),
            _ => None,
        }
    }

    /// Namespace prefix used in node ids.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Occupation => "occupation",
            Self::Skill => "skill",
            Self::SkillGroup => "skillgroup",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a graph node, namespaced by type (`"occupation::key_123"`).
///
/// Implements `Ord` so traversal and export order is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Build a namespaced id from a type and a key.
    pub fn new(node_type: NodeType, key: &str) -> Self {
        Self(format!("{}{}{}", node_type.as_str(), NODE_ID_SEPARATOR, key))
    }

    /// Wrap a raw id string as-is.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Node type encoded in the namespace prefix, if any.
    pub fn node_type(&self) -> Option<NodeType> {
        self.0
            .split_once(NODE_ID_SEPARATOR)
            .and_then(|(prefix, _)| NodeType::from_str(prefix))
    }

    /// Key part after the namespace prefix (the whole id when unprefixed).
    pub fn key(&self) -> &str {
        self.0
            .split_once(NODE_ID_SEPARATOR)
            .map(|(_, key)| key)
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A node of the knowledge graph with its embedding.
///
/// Immutable after load; owned by the `NodeEmbeddingStore`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Namespaced node id.
    pub id: NodeId,
    /// Node type.
    pub node_type: NodeType,
    /// Human-readable label.
    pub label: String,
    /// Fixed-length embedding vector.
    pub embedding: Vec<f32>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl GraphNode {
    /// Create a new node.
    pub fn new(id: NodeId, node_type: NodeType, label: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id,
            node_type,
            label: label.into(),
            embedding,
            metadata: BTreeMap::new(),
        }
    }

    /// Attach a metadata entry (builder style).
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_namespacing() {
        let id = NodeId::new(NodeType::Occupation, "key_123");
        assert_eq!(id.as_str(), "occupation::key_123");
        assert_eq!(id.node_type(), Some(NodeType::Occupation));
        assert_eq!(id.key(), "key_123");
    }

    #[test]
    fn test_node_id_without_prefix() {
        let id = NodeId::from("plain");
        assert_eq!(id.node_type(), None);
        assert_eq!(id.key(), "plain");
    }

    #[test]
    fn test_node_type_parsing() {
        assert_eq!(NodeType::from_str("SkillGroup"), Some(NodeType::SkillGroup));
        assert_eq!(NodeType::from_str("skill_group"), Some(NodeType::SkillGroup));
        assert_eq!(NodeType::from_str("robot"), None);
    }

    #[test]
    fn test_node_type_serde_alias() {
        let parsed: NodeType = serde_json::from_str("\"skill_group\"").unwrap();
        assert_eq!(parsed, NodeType::SkillGroup);
        assert_eq!(serde_json::to_string(&NodeType::SkillGroup).unwrap(), "\"skillgroup\"");
    }
}
