//! Typed tree produced by the generative path.

use serde::{Deserialize, Serialize};

/// A concrete next step attached to a leaf node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeAction {
    /// What to do.
    pub label: String,
    /// Free-form action category (`learn`, `practice`, `build`, ...).
    #[serde(default = "default_action_type")]
    pub action_type: String,
}

fn default_action_type() -> String {
    "learn".to_string()
}

impl TreeAction {
    /// Create an action.
    pub fn new(label: impl Into<String>, action_type: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action_type: action_type.into(),
        }
    }
}

/// Recursive, rooted tree node. Children are owned by their parent.
///
/// Every value returned from the synthesis orchestrator satisfies the schema
/// invariants checked by `tree::validate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedTreeNode {
    /// Node id, unique within the tree.
    #[serde(default)]
    pub id: String,
    /// Display label.
    #[serde(default)]
    pub label: String,
    /// Schema kind (`root`, `domain`, ...).
    #[serde(default)]
    pub node_kind: String,
    /// Depth in the tree (root is 0).
    #[serde(default)]
    pub level: u32,
    /// Actions, only on leaf kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<TreeAction>>,
    /// Children, only on non-leaf kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TypedTreeNode>>,
}

impl TypedTreeNode {
    /// Create a bare node with no actions or children.
    pub fn new(id: impl Into<String>, label: impl Into<String>, node_kind: impl Into<String>, level: u32) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            node_kind: node_kind.into(),
            level,
            actions: None,
            children: None,
        }
    }

    /// Attach children (builder style).
    pub fn with_children(mut self, children: Vec<TypedTreeNode>) -> Self {
        self.children = Some(children);
        self
    }

    /// Attach actions (builder style).
    pub fn with_actions(mut self, actions: Vec<TreeAction>) -> Self {
        self.actions = Some(actions);
        self
    }

    /// Children as a slice (empty when absent).
    pub fn children(&self) -> &[TypedTreeNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Actions as a slice (empty when absent).
    pub fn actions(&self) -> &[TreeAction] {
        self.actions.as_deref().unwrap_or(&[])
    }

    /// Total number of nodes in the subtree, including this one.
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(TypedTreeNode::node_count).sum::<usize>()
    }

    /// Depth-first search by id.
    pub fn find(&self, id: &str) -> Option<&TypedTreeNode> {
        if self.id == id {
            return Some(self);
        }
        self.children().iter().find_map(|c| c.find(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_sparse_node() {
        let json = r#"{"label": "Data", "node_kind": "domain"}"#;
        let node: TypedTreeNode = serde_json::from_str(json).unwrap();

        assert_eq!(node.label, "Data");
        assert_eq!(node.level, 0);
        assert!(node.id.is_empty());
        assert!(node.children.is_none());
    }

    #[test]
    fn test_action_type_defaults_to_learn() {
        let action: TreeAction = serde_json::from_str(r#"{"label": "Read a book"}"#).unwrap();
        assert_eq!(action.action_type, "learn");
    }

    #[test]
    fn test_node_count_and_find() {
        let tree = TypedTreeNode::new("r", "Root", "root", 0).with_children(vec![
            TypedTreeNode::new("a", "A", "domain", 1),
            TypedTreeNode::new("b", "B", "domain", 1)
                .with_children(vec![TypedTreeNode::new("c", "C", "field", 2)]),
        ]);

        assert_eq!(tree.node_count(), 4);
        assert_eq!(tree.find("c").map(|n| n.level), Some(2));
        assert!(tree.find("zz").is_none());
    }
}
