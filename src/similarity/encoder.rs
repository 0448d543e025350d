//! Graph-neural node encoder.
//!
//! A single GraphSAGE-style mean-aggregation layer:
//!
//! ```text
//! h(v) = act( W_self · x(v) + W_neigh · mean{ x(u) : u ∈ N(v) } + b )
//! ```
//!
//! Weights are trained offline and shipped in the graph bundle.

use serde::{Deserialize, Serialize};

/// Error type for encoder construction and inference.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncoderError {
    /// Input vector has the wrong size.
    #[error("Encoder input dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Encoder input dimension.
        expected: usize,
        /// Supplied dimension.
        actual: usize,
    },
    /// Weight matrices are malformed.
    #[error("Malformed encoder weights: {0}")]
    Shape(String),
    /// Inference produced NaN or infinity.
    #[error("Encoder produced non-finite output for {0}")]
    NonFinite(String),
}

/// Maps a node's features (and its neighbors') to an embedding.
pub trait NodeEncoder: Send + Sync {
    /// Encode one node given its own features and its neighbors' features.
    fn encode(&self, features: &[f32], neighbor_features: &[&[f32]]) -> Result<Vec<f32>, EncoderError>;

    /// Expected feature length.
    fn input_dim(&self) -> usize;

    /// Produced embedding length.
    fn output_dim(&self) -> usize;
}

/// Output non-linearity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// No activation.
    #[default]
    Identity,
    /// Hyperbolic tangent.
    Tanh,
    /// Rectified linear unit.
    Relu,
}

impl Activation {
    fn apply(&self, x: f32) -> f32 {
        match self {
            Self::Identity => x,
            Self::Tanh => x.tanh(),
            Self::Relu => x.max(0.0),
        }
    }
}

/// Serialized weights for [`MeanAggregationEncoder`].
///
/// Matrices are row-major, `output_dim` rows of `input_dim` columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderWeights {
    /// Weights applied to the node's own features.
    pub self_weights: Vec<Vec<f32>>,
    /// Weights applied to the mean of neighbor features.
    pub neighbor_weights: Vec<Vec<f32>>,
    /// Optional bias, one per output dimension.
    #[serde(default)]
    pub bias: Option<Vec<f32>>,
    /// Output activation.
    #[serde(default)]
    pub activation: Activation,
}

/// Single-layer mean-aggregation encoder.
#[derive(Debug, Clone)]
pub struct MeanAggregationEncoder {
    weights: EncoderWeights,
    input_dim: usize,
    output_dim: usize,
}

impl MeanAggregationEncoder {
    /// Validate weights and build the encoder.
    pub fn new(weights: EncoderWeights) -> Result<Self, EncoderError> {
        let output_dim = weights.self_weights.len();
        if output_dim == 0 {
            return Err(EncoderError::Shape("self_weights is empty".into()));
        }
        if weights.neighbor_weights.len() != output_dim {
            return Err(EncoderError::Shape(format!(
                "neighbor_weights has {} rows, self_weights has {}",
                weights.neighbor_weights.len(),
                output_dim
            )));
        }

        let input_dim = weights.self_weights[0].len();
        let rows = weights.self_weights.iter().chain(weights.neighbor_weights.iter());
        if let Some(bad) = rows.map(Vec::len).find(|&len| len != input_dim) {
            return Err(EncoderError::Shape(format!(
                "row of {} columns, expected {}",
                bad, input_dim
            )));
        }
        if let Some(bias) = &weights.bias {
            if bias.len() != output_dim {
                return Err(EncoderError::Shape(format!(
                    "bias has {} entries, expected {}",
                    bias.len(),
                    output_dim
                )));
            }
        }

        Ok(Self {
            weights,
            input_dim,
            output_dim,
        })
    }

    fn check(&self, v: &[f32]) -> Result<(), EncoderError> {
        if v.len() != self.input_dim {
            return Err(EncoderError::DimensionMismatch {
                expected: self.input_dim,
                actual: v.len(),
            });
        }
        Ok(())
    }
}

fn dot(row: &[f32], v: &[f32]) -> f32 {
    row.iter().zip(v).map(|(w, x)| w * x).sum()
}

impl NodeEncoder for MeanAggregationEncoder {
    fn encode(&self, features: &[f32], neighbor_features: &[&[f32]]) -> Result<Vec<f32>, EncoderError> {
        self.check(features)?;

        let mut mean = vec![0.0f32; self.input_dim];
        for neighbor in neighbor_features {
            self.check(neighbor)?;
            for (m, x) in mean.iter_mut().zip(neighbor.iter()) {
                *m += x;
            }
        }
        if !neighbor_features.is_empty() {
            let n = neighbor_features.len() as f32;
            mean.iter_mut().for_each(|m| *m /= n);
        }

        let out = (0..self.output_dim)
            .map(|i| {
                let bias = self.weights.bias.as_ref().map(|b| b[i]).unwrap_or(0.0);
                let z = dot(&self.weights.self_weights[i], features)
                    + dot(&self.weights.neighbor_weights[i], &mean)
                    + bias;
                self.weights.activation.apply(z)
            })
            .collect();
        Ok(out)
    }

    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn output_dim(&self) -> usize {
        self.output_dim
    }
}
