//! Anchor discovery.
//!
//! Finds graph entry points for an embedding through a nearest-neighbor
//! index. An unreachable index is a degraded mode, not an error: discovery
//! logs it and returns no anchors.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::{KernelError, Result};
use crate::similarity::cosine_similarity;
use crate::store::NodeEmbeddingStore;
use crate::types::{NodeId, NodeType};

/// Error type for nearest-neighbor backends.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The index could not be reached.
    #[error("Index unavailable: {0}")]
    Unavailable(String),

    /// The index rejected the query.
    #[error("Query failed: {0}")]
    Query(String),
}

/// One raw hit from a nearest-neighbor index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborHit {
    /// Node id.
    pub id: NodeId,
    /// Cosine distance (`1 - cos`), smaller is closer.
    pub distance: f32,
    /// Metadata stored alongside the vector.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Nearest-neighbor query service.
#[async_trait]
pub trait NeighborIndex: Send + Sync {
    /// Return up to `top_k` nearest nodes, closest first.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        type_filter: Option<NodeType>,
    ) -> std::result::Result<Vec<NeighborHit>, IndexError>;
}

/// A discovered entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    /// Node id.
    pub id: NodeId,
    /// Node type.
    pub node_type: NodeType,
    /// Similarity to the query (`1 - distance`).
    pub score: f32,
    /// Index metadata.
    pub metadata: BTreeMap<String, String>,
}

/// Brute-force cosine index over a [`NodeEmbeddingStore`].
///
/// Suitable for graphs that fit in memory and for tests.
pub struct InMemoryNeighborIndex {
    nodes: Arc<NodeEmbeddingStore>,
}

impl InMemoryNeighborIndex {
    /// Index every node of the store.
    pub fn new(nodes: Arc<NodeEmbeddingStore>) -> Self {
        Self { nodes }
    }
}

#[async_trait]
impl NeighborIndex for InMemoryNeighborIndex {
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        type_filter: Option<NodeType>,
    ) -> std::result::Result<Vec<NeighborHit>, IndexError> {
        if vector.len() != self.nodes.dimension() {
            return Err(IndexError::Query(format!(
                "vector has {} dimensions, index has {}",
                vector.len(),
                self.nodes.dimension()
            )));
        }

        let mut hits: Vec<NeighborHit> = self
            .nodes
            .iter()
            .filter(|n| type_filter.map_or(true, |t| n.node_type == t))
            .map(|n| {
                let mut metadata = n.metadata.clone();
                metadata.insert("label".to_string(), n.label.clone());
                metadata.insert("type".to_string(), n.node_type.to_string());
                NeighborHit {
                    id: n.id.clone(),
                    distance: 1.0 - cosine_similarity(vector, &n.embedding),
                    metadata,
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(top_k);
        Ok(hits)
    }
}

/// Turns embeddings into ranked anchors.
#[derive(Clone)]
pub struct AnchorDiscovery {
    index: Arc<dyn NeighborIndex>,
    dimension: usize,
}

impl AnchorDiscovery {
    /// Create discovery over an index holding `dimension`-length vectors.
    pub fn new(index: Arc<dyn NeighborIndex>, dimension: usize) -> Self {
        Self { index, dimension }
    }

    /// Expected embedding length.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Nearest anchors with similarity at least `min_similarity`.
    ///
    /// Sorted descending by score (ties by id), at most `top_k`. Wrong-length
    /// input fails with `DimensionMismatch`; an unreachable index yields `[]`.
    #[instrument(skip(self, embedding), fields(dim = embedding.len()))]
    pub async fn find_anchors(
        &self,
        embedding: &[f32],
        top_k: usize,
        min_similarity: f32,
        type_filter: Option<NodeType>,
    ) -> Result<Vec<Anchor>> {
        self.check_embedding(embedding)?;
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let hits = match self.index.query(embedding, top_k, type_filter).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "Neighbor index unreachable, anchor discovery degraded");
                return Ok(Vec::new());
            }
        };

        let mut anchors: Vec<Anchor> = hits
            .into_iter()
            .filter_map(to_anchor)
            .filter(|a| type_filter.map_or(true, |t| a.node_type == t))
            .filter(|a| a.score >= min_similarity)
            .collect();

        sort_anchors(&mut anchors);
        anchors.truncate(top_k);

        debug!(count = anchors.len(), "Anchors found");
        Ok(anchors)
    }

    /// One query per node type, so no single dominant type crowds out the others.
    ///
    /// Types with no qualifying anchors are omitted from the map.
    pub async fn find_diverse_anchors(
        &self,
        embedding: &[f32],
        per_type_k: usize,
        min_similarity: f32,
    ) -> Result<BTreeMap<NodeType, Vec<Anchor>>> {
        self.check_embedding(embedding)?;

        let mut by_type = BTreeMap::new();
        for node_type in NodeType::ALL {
            let anchors = self
                .find_anchors(embedding, per_type_k, min_similarity, Some(node_type))
                .await?;
            if !anchors.is_empty() {
                by_type.insert(node_type, anchors);
            }
        }
        Ok(by_type)
    }

    /// Check an embedding's length and values.
    pub fn check_embedding(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.dimension {
            return Err(KernelError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(KernelError::InvalidInput("embedding contains non-finite values".into()));
        }
        Ok(())
    }
}

/// Sort anchors descending by score, ties by id.
pub fn sort_anchors(anchors: &mut [Anchor]) {
    anchors.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
}

fn to_anchor(hit: NeighborHit) -> Option<Anchor> {
    let score = 1.0 - hit.distance;
    if !score.is_finite() {
        return None;
    }

    let node_type = hit
        .metadata
        .get("type")
        .and_then(|t| NodeType::from_str(t))
        .or_else(|| hit.id.node_type());

    match node_type {
        Some(node_type) => Some(Anchor {
            id: hit.id,
            node_type,
            score,
            metadata: hit.metadata,
        }),
        None => {
            debug!(id = %hit.id, "Dropping hit of unknown node type");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GraphNode;

    /// Index returning a fixed hit list.
    struct FixedIndex {
        hits: Vec<NeighborHit>,
    }

    #[async_trait]
    impl NeighborIndex for FixedIndex {
        async fn query(
            &self,
            _vector: &[f32],
            top_k: usize,
            type_filter: Option<NodeType>,
        ) -> std::result::Result<Vec<NeighborHit>, IndexError> {
            Ok(self
                .hits
                .iter()
                .filter(|h| type_filter.map_or(true, |t| h.id.node_type() == Some(t)))
                .take(top_k)
                .cloned()
                .collect())
        }
    }

    struct DownIndex;

    #[async_trait]
    impl NeighborIndex for DownIndex {
        async fn query(
            &self,
            _vector: &[f32],
            _top_k: usize,
            _type_filter: Option<NodeType>,
        ) -> std::result::Result<Vec<NeighborHit>, IndexError> {
            Err(IndexError::Unavailable("connection refused".into()))
        }
    }

    fn hit(id: &str, similarity: f32) -> NeighborHit {
        NeighborHit {
            id: NodeId::from(id),
            distance: 1.0 - similarity,
            metadata: BTreeMap::new(),
        }
    }

    fn scenario_a() -> AnchorDiscovery {
        let index = FixedIndex {
            hits: vec![
                hit("occupation::engineer", 0.9),
                hit("skill::rust", 0.8),
                hit("skill::go", 0.5),
                hit("skill::sql", 0.4),
                hit("skill::cobol", 0.2),
            ],
        };
        AnchorDiscovery::new(Arc::new(index), 3)
    }

    #[tokio::test]
    async fn test_threshold_and_order() {
        let discovery = scenario_a();
        let anchors = discovery.find_anchors(&[0.1, 0.2, 0.3], 5, 0.3, None).await.unwrap();

        let scores: Vec<f32> = anchors.iter().map(|a| (a.score * 10.0).round() / 10.0).collect();
        assert_eq!(scores, vec![0.9, 0.8, 0.5, 0.4]);
        assert_eq!(anchors[0].node_type, NodeType::Occupation);
        assert!(anchors.iter().all(|a| a.id.as_str() != "skill::cobol"));
    }

    #[tokio::test]
    async fn test_top_k_and_type_filter() {
        let discovery = scenario_a();

        let anchors = discovery.find_anchors(&[0.0; 3], 2, 0.0, None).await.unwrap();
        assert_eq!(anchors.len(), 2);

        let skills = discovery
            .find_anchors(&[0.0; 3], 5, 0.0, Some(NodeType::Skill))
            .await
            .unwrap();
        assert_eq!(skills.len(), 4);
        assert!(skills.iter().all(|a| a.node_type == NodeType::Skill));
    }

    #[tokio::test]
    async fn test_dimension_mismatch() {
        let discovery = scenario_a();
        let err = discovery.find_anchors(&[0.1], 5, 0.3, None).await.unwrap_err();
        assert!(matches!(err, KernelError::DimensionMismatch { expected: 3, actual: 1 }));

        let err = discovery.find_anchors(&[f32::NAN, 0.0, 0.0], 5, 0.3, None).await.unwrap_err();
        assert!(matches!(err, KernelError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_unreachable_index_is_degraded_not_error() {
        let discovery = AnchorDiscovery::new(Arc::new(DownIndex), 2);
        assert!(discovery.find_anchors(&[1.0, 0.0], 5, 0.0, None).await.unwrap().is_empty());
        assert!(discovery.find_diverse_anchors(&[1.0, 0.0], 5, 0.0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_diverse_anchors_per_type() {
        let discovery = scenario_a();
        let by_type = discovery.find_diverse_anchors(&[0.0; 3], 2, 0.3).await.unwrap();

        assert_eq!(by_type[&NodeType::Occupation].len(), 1);
        assert_eq!(by_type[&NodeType::Skill].len(), 2);
        assert!(!by_type.contains_key(&NodeType::SkillGroup));
    }

    #[tokio::test]
    async fn test_in_memory_index() {
        let nodes = NodeEmbeddingStore::from_nodes(2, vec![
            GraphNode::new(NodeId::from("skill::x"), NodeType::Skill, "X", vec![1.0, 0.0]),
            GraphNode::new(NodeId::from("skill::y"), NodeType::Skill, "Y", vec![0.0, 1.0]),
            GraphNode::new(NodeId::from("occupation::z"), NodeType::Occupation, "Z", vec![0.7, 0.7]),
        ])
        .unwrap();
        let discovery = AnchorDiscovery::new(Arc::new(InMemoryNeighborIndex::new(Arc::new(nodes))), 2);

        let anchors = discovery.find_anchors(&[1.0, 0.0], 3, 0.5, None).await.unwrap();
        let ids: Vec<&str> = anchors.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["skill::x", "occupation::z"]);
        assert_eq!(anchors[1].metadata.get("label").map(String::as_str), Some("Z"));
    }
}
