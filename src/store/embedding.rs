//! Per-node vectors and id↔index mappings.

use std::collections::HashMap;

use crate::error::{KernelError, Result};
use crate::types::{GraphNode, NodeId, NodeType};

/// Holds every graph node with its fixed-length embedding.
///
/// Loaded once; read-only afterwards. Node index order is the load order,
/// which matches the row order of the bundle's feature matrix.
#[derive(Debug, Clone, Default)]
pub struct NodeEmbeddingStore {
    dimension: usize,
    nodes: Vec<GraphNode>,
    index: HashMap<NodeId, usize>,
}

impl NodeEmbeddingStore {
    /// Create an empty store for vectors of `dimension` floats.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            nodes: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Build a store from nodes. All embeddings must share `dimension`.
    pub fn from_nodes(dimension: usize, nodes: impl IntoIterator<Item = GraphNode>) -> Result<Self> {
        let mut store = Self::new(dimension);
        for node in nodes {
            store.insert(node)?;
        }
        Ok(store)
    }

    /// Insert a node. Fails on a wrong-size embedding or a duplicate id.
    pub fn insert(&mut self, node: GraphNode) -> Result<usize> {
        if node.embedding.len() != self.dimension {
            return Err(KernelError::DimensionMismatch {
                expected: self.dimension,
                actual: node.embedding.len(),
            });
        }
        if self.index.contains_key(&node.id) {
            return Err(KernelError::InvalidInput(format!("duplicate node id {}", node.id)));
        }
        let idx = self.nodes.len();
        self.index.insert(node.id.clone(), idx);
        self.nodes.push(node);
        Ok(idx)
    }

    /// Embedding dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node.
    pub fn get(&self, id: &NodeId) -> Option<&GraphNode> {
        self.index.get(id).map(|&idx| &self.nodes[idx])
    }

    /// Whether a node exists.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    /// Embedding for a node.
    pub fn vector(&self, id: &NodeId) -> Option<&[f32]> {
        self.get(id).map(|n| n.embedding.as_slice())
    }

    /// Row index of a node.
    pub fn index_of(&self, id: &NodeId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Node at a row index.
    pub fn node_at(&self, idx: usize) -> Option<&GraphNode> {
        self.nodes.get(idx)
    }

    /// Iterate nodes in index order.
    pub fn iter(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter()
    }

    /// Iterate nodes of one type in index order.
    pub fn iter_type(&self, node_type: NodeType) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter().filter(move |n| n.node_type == node_type)
    }

    /// Check a query vector against the store dimension.
    pub fn check_query(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(KernelError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(KernelError::InvalidInput("embedding contains non-finite values".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(key: &str, v: Vec<f32>) -> GraphNode {
        GraphNode::new(NodeId::new(NodeType::Skill, key), NodeType::Skill, key, v)
    }

    #[test]
    fn test_index_mapping() {
        let store = NodeEmbeddingStore::from_nodes(2, vec![
            node("a", vec![1.0, 0.0]),
            node("b", vec![0.0, 1.0]),
        ])
        .unwrap();

        let b = NodeId::new(NodeType::Skill, "b");
        assert_eq!(store.index_of(&b), Some(1));
        assert_eq!(store.node_at(1).map(|n| &n.id), Some(&b));
        assert_eq!(store.vector(&b), Some(&[0.0, 1.0][..]));
    }

    #[test]
    fn test_dimension_mismatch_on_insert() {
        let err = NodeEmbeddingStore::from_nodes(3, vec![node("a", vec![1.0])]).unwrap_err();
        assert!(matches!(err, KernelError::DimensionMismatch { expected: 3, actual: 1 }));
    }

    #[test]
    fn test_duplicate_rejected() {
        let err = NodeEmbeddingStore::from_nodes(1, vec![node("a", vec![1.0]), node("a", vec![2.0])])
            .unwrap_err();
        assert!(matches!(err, KernelError::InvalidInput(_)));
    }

    #[test]
    fn test_check_query() {
        let store = NodeEmbeddingStore::new(2);
        assert!(store.check_query(&[0.1, 0.2]).is_ok());
        assert!(matches!(store.check_query(&[0.1]), Err(KernelError::DimensionMismatch { .. })));
        assert!(matches!(store.check_query(&[0.1, f32::NAN]), Err(KernelError::InvalidInput(_))));
    }
}
