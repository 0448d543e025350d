//! In-memory graph topology.

use std::collections::BTreeMap;

use crate::types::{NodeId, GraphEdge, EdgeType};
use super::GraphStore;

/// Adjacency payload for one unordered node pair.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Link {
    weight: f32,
    edge_type: EdgeType,
}

/// In-memory undirected graph.
///
/// Uses BTreeMap for deterministic iteration order. Each unordered pair is
/// stored once; re-adding an existing pair keeps the larger weight.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGraphStore {
    /// Node -> (neighbor -> link).
    adjacency: BTreeMap<NodeId, BTreeMap<NodeId, Link>>,
    /// Edges as supplied, duplicates included.
    raw_edge_count: usize,
}

impl InMemoryGraphStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from an edge list.
    pub fn from_edges(edges: impl IntoIterator<Item = GraphEdge>) -> Self {
        let mut store = Self::new();
        for edge in edges {
            store.add_edge(edge);
        }
        store
    }

    /// Add an edge. Self-loops are ignored.
    pub fn add_edge(&mut self, edge: GraphEdge) {
        self.raw_edge_count += 1;
        if edge.source == edge.target {
            tracing::debug!(node = %edge.source, "Ignoring self-loop");
            return;
        }

        let link = Link {
            weight: edge.weight,
            edge_type: edge.edge_type,
        };
        Self::upsert(&mut self.adjacency, &edge.source, &edge.target, link);
        Self::upsert(&mut self.adjacency, &edge.target, &edge.source, link);
    }

    fn upsert(
        adjacency: &mut BTreeMap<NodeId, BTreeMap<NodeId, Link>>,
        from: &NodeId,
        to: &NodeId,
        link: Link,
    ) {
        let slot = adjacency.entry(from.clone()).or_default();
        match slot.get_mut(to) {
            Some(existing) if existing.weight >= link.weight => {}
            Some(existing) => *existing = link,
            None => {
                slot.insert(to.clone(), link);
            }
        }
    }

    /// Number of nodes that have at least one edge.
    pub fn num_nodes(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of distinct undirected edges.
    pub fn num_edges(&self) -> usize {
        self.adjacency.values().map(BTreeMap::len).sum::<usize>() / 2
    }

    /// Number of edges supplied, duplicates and self-loops included.
    pub fn num_raw_edges(&self) -> usize {
        self.raw_edge_count
    }
}

impl GraphStore for InMemoryGraphStore {
    fn contains(&self, id: &NodeId) -> bool {
        self.adjacency.contains_key(id)
    }

    fn neighbors(&self, id: &NodeId) -> Vec<NodeId> {
        self.adjacency
            .get(id)
            .map(|links| links.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn degree(&self, id: &NodeId) -> usize {
        self.adjacency.get(id).map(BTreeMap::len).unwrap_or(0)
    }

    fn edge_between(&self, a: &NodeId, b: &NodeId) -> Option<(f32, EdgeType)> {
        self.adjacency
            .get(a)
            .and_then(|links| links.get(b))
            .map(|link| (link.weight, link.edge_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> NodeId {
        NodeId::from(s)
    }

    #[test]
    fn test_undirected_neighbors() {
        let store = InMemoryGraphStore::from_edges(vec![
            GraphEdge::unit(id("skill::a"), id("skill::b")),
            GraphEdge::unit(id("skill::c"), id("skill::a")),
        ]);

        assert_eq!(store.neighbors(&id("skill::a")), vec![id("skill::b"), id("skill::c")]);
        assert_eq!(store.neighbors(&id("skill::b")), vec![id("skill::a")]);
        assert!(store.neighbors(&id("skill::zz")).is_empty());
    }

    #[test]
    fn test_duplicate_edges_not_double_counted() {
        let store = InMemoryGraphStore::from_edges(vec![
            GraphEdge::new(id("skill::a"), id("skill::b"), 0.2, EdgeType::Related),
            GraphEdge::new(id("skill::b"), id("skill::a"), 0.7, EdgeType::Requires),
            GraphEdge::new(id("skill::a"), id("skill::b"), 0.5, EdgeType::Related),
        ]);

        assert_eq!(store.degree(&id("skill::a")), 1);
        assert_eq!(store.num_edges(), 1);
        assert_eq!(store.num_raw_edges(), 3);
        // Max weight wins, in both orientations
        assert_eq!(store.edge_between(&id("skill::a"), &id("skill::b")), Some((0.7, EdgeType::Requires)));
        assert_eq!(store.edge_between(&id("skill::b"), &id("skill::a")), Some((0.7, EdgeType::Requires)));
    }

    #[test]
    fn test_self_loop_ignored() {
        let store = InMemoryGraphStore::from_edges(vec![GraphEdge::unit(id("skill::a"), id("skill::a"))]);
        assert!(!store.contains(&id("skill::a")));
    }
}
