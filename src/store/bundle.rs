//! Serialized graph bundle loading.
//!
//! ## Format (JSON)
//!
//! ```text
//! {
//!   "id_to_index":   { "<node id>": <row>, ... },
//!   "node_metadata": { "<node id>": { "label": "...", "type": "skill", ... }, ... },
//!   "edge_index":    [[src rows...], [dst rows...]],
//!   "edge_types":    ["requires", ...],          // optional, parallel to edge_index
//!   "edge_weights":  [1.0, ...],                 // optional, parallel to edge_index
//!   "node_features": [[f32; dim], ...],          // aligned to id_to_index rows
//!   "encoder":       { "self_weights": ..., "neighbor_weights": ... }   // optional
//! }
//! ```
//!
//! A missing bundle degrades to an empty graph; missing encoder weights
//! degrade similarity to the neighbor-overlap strategy.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::similarity::encoder::{EncoderWeights, MeanAggregationEncoder, NodeEncoder};
use crate::types::{EdgeType, GraphEdge, GraphNode, NodeId, NodeType};
use super::{InMemoryGraphStore, NodeEmbeddingStore};

/// Error type for bundle loading.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    /// File could not be read.
    #[error("Bundle I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// File is not valid bundle JSON.
    #[error("Bundle JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Arrays or mappings disagree with each other.
    #[error("Inconsistent bundle: {0}")]
    Inconsistent(String),
}

/// Raw bundle as serialized by the offline embedding pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphBundle {
    /// Node id -> feature row.
    pub id_to_index: BTreeMap<String, usize>,
    /// Node id -> metadata (label, type, anything else).
    #[serde(default)]
    pub node_metadata: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
    /// Parallel source/target row arrays.
    #[serde(default)]
    pub edge_index: [Vec<usize>; 2],
    /// Optional per-edge relation type.
    #[serde(default)]
    pub edge_types: Option<Vec<String>>,
    /// Optional per-edge weight.
    #[serde(default)]
    pub edge_weights: Option<Vec<f32>>,
    /// Node feature matrix, one row per index.
    #[serde(default)]
    pub node_features: Vec<Vec<f32>>,
    /// Optional graph encoder weights.
    #[serde(default)]
    pub encoder: Option<EncoderWeights>,
}

/// A bundle turned into ready-to-share stores.
#[derive(Debug, Clone)]
pub struct LoadedGraph {
    /// Node payloads and vectors.
    pub nodes: Arc<NodeEmbeddingStore>,
    /// Undirected topology.
    pub graph: Arc<InMemoryGraphStore>,
    /// Graph encoder, when weights were shipped and are consistent.
    pub encoder: Option<Arc<MeanAggregationEncoder>>,
}

impl LoadedGraph {
    /// An empty graph of the given dimension.
    pub fn empty(dimension: usize) -> Self {
        Self {
            nodes: Arc::new(NodeEmbeddingStore::new(dimension)),
            graph: Arc::new(InMemoryGraphStore::new()),
            encoder: None,
        }
    }
}

impl GraphBundle {
    /// Parse a bundle from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, BundleError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a bundle file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, BundleError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Load a bundle file, degrading to an empty graph when it is absent or broken.
    pub fn load_or_empty(path: impl AsRef<Path>, dimension: usize) -> LoadedGraph {
        let path = path.as_ref();
        match Self::from_path(path).and_then(|b| b.into_graph()) {
            Ok(graph) => graph,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Graph bundle unavailable, starting with an empty graph"
                );
                LoadedGraph::empty(dimension)
            }
        }
    }

    /// Convert into stores, checking that every array lines up.
    pub fn into_graph(self) -> Result<LoadedGraph, BundleError> {
        let n = self.id_to_index.len();
        if self.node_features.len() != n {
            return Err(BundleError::Inconsistent(format!(
                "{} ids but {} feature rows",
                n,
                self.node_features.len()
            )));
        }

        let dimension = self.node_features.first().map(Vec::len).unwrap_or(0);

        // Invert the mapping so rows are inserted in index order.
        let mut by_row: Vec<Option<&String>> = vec![None; n];
        for (id, &row) in &self.id_to_index {
            if row >= n {
                return Err(BundleError::Inconsistent(format!("row {} for {} out of range", row, id)));
            }
            if let Some(other) = by_row[row] {
                return Err(BundleError::Inconsistent(format!(
                    "row {} claimed by both {} and {}",
                    row, other, id
                )));
            }
            by_row[row] = Some(id);
        }

        let mut nodes = NodeEmbeddingStore::new(dimension);
        let mut row_ids: Vec<NodeId> = Vec::with_capacity(n);
        for (row, id) in by_row.into_iter().enumerate() {
            let raw_id = id.ok_or_else(|| BundleError::Inconsistent(format!("row {} unassigned", row)))?;
            let node = build_node(raw_id, self.node_metadata.get(raw_id), &self.node_features[row])?;
            row_ids.push(node.id.clone());
            nodes
                .insert(node)
                .map_err(|e| BundleError::Inconsistent(e.to_string()))?;
        }

        let [sources, targets] = &self.edge_index;
        if sources.len() != targets.len() {
            return Err(BundleError::Inconsistent(format!(
                "edge_index rows differ: {} vs {}",
                sources.len(),
                targets.len()
            )));
        }
        check_parallel("edge_types", self.edge_types.as_ref().map(Vec::len), sources.len())?;
        check_parallel("edge_weights", self.edge_weights.as_ref().map(Vec::len), sources.len())?;

        let mut graph = InMemoryGraphStore::new();
        for (i, (&s, &t)) in sources.iter().zip(targets.iter()).enumerate() {
            let (Some(source), Some(target)) = (row_ids.get(s), row_ids.get(t)) else {
                return Err(BundleError::Inconsistent(format!("edge {} references row out of range", i)));
            };
            let edge_type = self
                .edge_types
                .as_ref()
                .map(|types| EdgeType::parse_lossy(&types[i]))
                .unwrap_or_default();
            let weight = self.edge_weights.as_ref().map(|w| w[i]).unwrap_or(1.0);
            if !(weight.is_finite() && weight >= 0.0) {
                warn!(edge = i, weight, "Clamping invalid edge weight to 0");
            }
            graph.add_edge(GraphEdge::new(source.clone(), target.clone(), weight, edge_type));
        }

        let encoder = match self.encoder {
            Some(weights) => match MeanAggregationEncoder::new(weights) {
                Ok(enc) if enc.input_dim() == dimension => Some(Arc::new(enc)),
                Ok(enc) => {
                    warn!(
                        expected = dimension,
                        actual = enc.input_dim(),
                        "Encoder input dimension does not match node features, ignoring encoder"
                    );
                    None
                }
                Err(e) => {
                    warn!(error = %e, "Encoder weights rejected, ignoring encoder");
                    None
                }
            },
            None => None,
        };

        info!(
            nodes = nodes.len(),
            edges = graph.num_edges(),
            raw_edges = graph.num_raw_edges(),
            dimension,
            encoder = encoder.is_some(),
            "Graph bundle loaded"
        );

        Ok(LoadedGraph {
            nodes: Arc::new(nodes),
            graph: Arc::new(graph),
            encoder,
        })
    }
}

fn check_parallel(name: &str, len: Option<usize>, expected: usize) -> Result<(), BundleError> {
    match len {
        Some(len) if len != expected => Err(BundleError::Inconsistent(format!(
            "{} has {} entries for {} edges",
            name, len, expected
        ))),
        _ => Ok(()),
    }
}

fn build_node(
    raw_id: &str,
    metadata: Option<&BTreeMap<String, serde_json::Value>>,
    features: &[f32],
) -> Result<GraphNode, BundleError> {
    let id = NodeId::from(raw_id);
    let mut meta: BTreeMap<String, String> = metadata
        .map(|m| {
            m.iter()
                .map(|(k, v)| {
                    let s = match v {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), s)
                })
                .collect()
        })
        .unwrap_or_default();

    let node_type = meta
        .remove("type")
        .and_then(|t| NodeType::from_str(&t))
        .or_else(|| id.node_type())
        .ok_or_else(|| BundleError::Inconsistent(format!("cannot determine type of {}", raw_id)))?;
    let label = meta.remove("label").unwrap_or_else(|| id.key().to_string());

    let mut node = GraphNode::new(id, node_type, label, features.to_vec());
    node.metadata = meta;
    Ok(node)
}
