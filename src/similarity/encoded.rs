//! Encoder-backed similarity.

use std::collections::HashMap;

use crate::store::{GraphStore, NodeEmbeddingStore};
use crate::types::NodeId;
use super::encoder::{EncoderError, NodeEncoder};
use super::{cosine_similarity, rescale_cosine, ScoringStrategy, SimilarityScorer};

/// Cosine similarity over graph-encoder outputs, rescaled to `[0, 1]`.
///
/// Every node is encoded once at construction, so scoring is a pure lookup
/// plus a dot product.
#[derive(Debug, Clone)]
pub struct EncoderSimilarity {
    encoded: HashMap<NodeId, Vec<f32>>,
}

impl EncoderSimilarity {
    /// Encode every node of the store.
    ///
    /// Fails if any node cannot be encoded; callers fall back to the
    /// heuristic strategy rather than mixing strategies per node.
    pub fn build<G: GraphStore + ?Sized>(
        nodes: &NodeEmbeddingStore,
        graph: &G,
        encoder: &dyn NodeEncoder,
    ) -> Result<Self, EncoderError> {
        let mut encoded = HashMap::with_capacity(nodes.len());

        for node in nodes.iter() {
            let neighbor_ids = graph.neighbors(&node.id);
            let neighbor_features: Vec<&[f32]> = neighbor_ids
                .iter()
                .filter_map(|id| nodes.vector(id))
                .collect();

            let vector = encoder.encode(&node.embedding, &neighbor_features)?;
            if vector.iter().any(|v| !v.is_finite()) {
                return Err(EncoderError::NonFinite(node.id.to_string()));
            }
            encoded.insert(node.id.clone(), vector);
        }

        Ok(Self { encoded })
    }

    /// Encoded vector of a node.
    pub fn encoding(&self, id: &NodeId) -> Option<&[f32]> {
        self.encoded.get(id).map(Vec::as_slice)
    }
}

impl SimilarityScorer for EncoderSimilarity {
    fn similarity(&self, a: &NodeId, b: &NodeId) -> f32 {
        if a == b {
            return 1.0;
        }
        match (self.encoded.get(a), self.encoded.get(b)) {
            (Some(va), Some(vb)) => rescale_cosine(cosine_similarity(va, vb)),
            _ => 0.0,
        }
    }

    fn strategy(&self) -> ScoringStrategy {
        ScoringStrategy::Encoder
    }
}
