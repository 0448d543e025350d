//! Similarity-weighted bounded graph traversal.
//!
//! The engine runs a multi-source BFS from a set of anchors and admits
//! neighbors by their similarity to the node that discovered them.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::policy::{rank_candidates, NeighborCandidate, TraversalPolicy};
use crate::similarity::{ScoringStrategy, SimilarityScorer};
use crate::store::{GraphStore, NodeEmbeddingStore};
use crate::types::{GraphNode, NodeId, TraversalEdge, TraversalResult, TraversedNode};

/// Bounded traversal over a read-only graph.
///
/// ## Algorithm
///
/// 1. Seed the queue at depth 0 with every known anchor (unknown ids and
///    duplicates are skipped)
/// 2. Pop a node; stop expanding it at `max_depth`
/// 3. Score its unvisited neighbors against it
/// 4. Keep those at or above `min_similarity`, best first (ties by id),
///    and admit at most `max_nodes_per_level`
/// 5. Mark each admitted node visited once; the first parent wins
/// 6. Stop on an empty queue or when `node_cap` nodes are admitted
///
/// Synchronous and CPU-bound. The stores are shared through `Arc` and never
/// mutated, so concurrent traversals need no locking.
pub struct GraphTraversalEngine<G: GraphStore + ?Sized> {
    nodes: Arc<NodeEmbeddingStore>,
    graph: Arc<G>,
    scorer: Arc<dyn SimilarityScorer>,
}

impl<G: GraphStore + ?Sized> GraphTraversalEngine<G> {
    /// Create an engine with a fixed similarity strategy.
    pub fn new(nodes: Arc<NodeEmbeddingStore>, graph: Arc<G>, scorer: Arc<dyn SimilarityScorer>) -> Self {
        Self { nodes, graph, scorer }
    }

    /// The scoring strategy in use.
    pub fn strategy(&self) -> ScoringStrategy {
        self.scorer.strategy()
    }

    /// Node store backing this engine.
    pub fn nodes(&self) -> &NodeEmbeddingStore {
        &self.nodes
    }

    /// Topology backing this engine.
    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// Traverse from `anchor_ids` under `policy`.
    ///
    /// Zero valid anchors gives an empty result, never an error.
    #[instrument(skip_all, fields(anchors = anchor_ids.len(), max_depth = policy.max_depth))]
    pub fn traverse(&self, anchor_ids: &[NodeId], policy: &TraversalPolicy) -> TraversalResult {
        let mut result = TraversalResult::empty();
        result.stats.anchors_requested = anchor_ids.len();

        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut queue: VecDeque<(NodeId, u32)> = VecDeque::new();

        for id in anchor_ids {
            if visited.contains(id) {
                continue;
            }
            let Some(node) = self.nodes.get(id) else {
                debug!(anchor = %id, "Skipping unknown anchor");
                continue;
            };
            if result.nodes.len() >= policy.node_cap {
                result.stats.cap_reached = true;
                break;
            }

            visited.insert(id.clone());
            result.nodes.insert(id.clone(), traversed(node, true, 0, None, 1.0));
            result.stats.anchors_used += 1;
            queue.push_back((id.clone(), 0));
        }

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= policy.max_depth {
                continue;
            }
            if result.nodes.len() >= policy.node_cap {
                result.stats.cap_reached = true;
                break;
            }

            result.stats.expansions += 1;

            let candidates: Vec<NeighborCandidate> = self
                .graph
                .neighbors(&current)
                .into_iter()
                .filter(|n| !visited.contains(n) && self.nodes.contains(n))
                .map(|n| {
                    let similarity = self.scorer.similarity(&current, &n);
                    let edge_type = self
                        .graph
                        .edge_between(&current, &n)
                        .map(|(_, t)| t)
                        .unwrap_or_default();
                    NeighborCandidate::new(n, similarity, edge_type)
                })
                .collect();
            result.stats.pairs_scored += candidates.len();

            let admitted = rank_candidates(candidates, policy.min_similarity, policy.max_nodes_per_level);

            for candidate in admitted {
                if result.nodes.len() >= policy.node_cap {
                    result.stats.cap_reached = true;
                    break;
                }
                let Some(node) = self.nodes.get(&candidate.id) else {
                    continue;
                };

                visited.insert(candidate.id.clone());
                result.nodes.insert(
                    candidate.id.clone(),
                    traversed(node, false, depth + 1, Some(current.clone()), candidate.similarity),
                );
                result.edges.push(TraversalEdge {
                    source: current.clone(),
                    target: candidate.id.clone(),
                    weight: candidate.similarity,
                    edge_type: candidate.edge_type,
                });
                queue.push_back((candidate.id, depth + 1));
            }
        }

        debug!(
            nodes = result.nodes.len(),
            edges = result.edges.len(),
            expansions = result.stats.expansions,
            pairs_scored = result.stats.pairs_scored,
            cap_reached = result.stats.cap_reached,
            "Traversal complete"
        );
        result
    }
}

fn traversed(node: &GraphNode, is_anchor: bool, depth: u32, parent: Option<NodeId>, score: f32) -> TraversedNode {
    TraversedNode {
        node_type: node.node_type,
        label: node.label.clone(),
        metadata: node.metadata.clone(),
        is_anchor,
        depth,
        parent,
        score,
    }
}
