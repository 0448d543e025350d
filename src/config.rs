//! Kernel configuration.
//!
//! Every section has production defaults. `from_env` overrides them from
//! `SKILLTREE_*` variables; unparseable values are logged and ignored.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{KernelError, Result};
use crate::policy::TraversalPolicy;

/// Anchor discovery defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorConfig {
    /// Anchors per node type for diverse discovery.
    pub per_type_k: usize,
    /// Minimum anchor similarity.
    pub min_similarity: f32,
    /// Anchors handed to the traversal.
    pub max_anchors: usize,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            per_type_k: 5,
            min_similarity: 0.3,
            max_anchors: 3,
        }
    }
}

/// Progression aggregation defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    /// Weight of the graph score against profile affinity.
    pub alpha: f32,
    /// Admissions per expanded node while building tiers.
    pub expansion_width: usize,
    /// Default tier depth.
    pub depth: u32,
    /// Default tier width.
    pub max_skills_per_tier: usize,
    /// Default admission threshold.
    pub min_similarity: f32,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            alpha: 0.7,
            expansion_width: 10,
            depth: 3,
            max_skills_per_tier: 10,
            min_similarity: 0.2,
        }
    }
}

/// Cache defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entries kept in the process-local tier.
    pub local_capacity: usize,
    /// TTL for synthesized trees.
    pub synthesis_ttl_secs: u64,
    /// TTL for exploration and progression results.
    pub exploration_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            local_capacity: 1024,
            synthesis_ttl_secs: 24 * 3600,
            exploration_ttl_secs: 3600,
        }
    }
}

/// Generative path defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Generation attempts per request (backend and parse failures share the budget).
    pub max_attempts: u32,
    /// Linear backoff step between attempts.
    pub retry_backoff_ms: u64,
    /// In-flight generation calls for bulk synthesis.
    pub max_concurrency: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_backoff_ms: 500,
            max_concurrency: 5,
        }
    }
}

/// Top-level kernel configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Node embedding length.
    pub embedding_dimension: usize,
    /// Graph bundle to load, if any.
    pub bundle_path: Option<PathBuf>,
    /// Pair-score memo size (0 disables memoization).
    pub similarity_memo_capacity: usize,
    /// Default traversal policy.
    pub traversal: TraversalPolicy,
    /// Anchor discovery.
    pub anchors: AnchorConfig,
    /// Progression aggregation.
    pub progression: ProgressionConfig,
    /// Cache tiers.
    pub cache: CacheConfig,
    /// Generative path.
    pub synthesis: SynthesisConfig,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            embedding_dimension: 384,
            bundle_path: None,
            similarity_memo_capacity: 10_000,
            traversal: TraversalPolicy::default(),
            anchors: AnchorConfig::default(),
            progression: ProgressionConfig::default(),
            cache: CacheConfig::default(),
            synthesis: SynthesisConfig::default(),
        }
    }
}

impl KernelConfig {
    /// Load configuration from environment variables with production defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let var = |name: &str| lookup(name);

        Self {
            embedding_dimension: parse_or(&var, "SKILLTREE_EMBEDDING_DIM", d.embedding_dimension),
            bundle_path: var("SKILLTREE_BUNDLE_PATH").map(PathBuf::from),
            similarity_memo_capacity: parse_or(&var, "SKILLTREE_MEMO_CAPACITY", d.similarity_memo_capacity),
            traversal: TraversalPolicy {
                max_depth: parse_or(&var, "SKILLTREE_MAX_DEPTH", d.traversal.max_depth),
                min_similarity: parse_or(&var, "SKILLTREE_MIN_SIMILARITY", d.traversal.min_similarity),
                max_nodes_per_level: parse_or(&var, "SKILLTREE_MAX_NODES_PER_LEVEL", d.traversal.max_nodes_per_level),
                node_cap: parse_or(&var, "SKILLTREE_NODE_CAP", d.traversal.node_cap),
                ..d.traversal
            },
            anchors: AnchorConfig {
                per_type_k: parse_or(&var, "SKILLTREE_ANCHORS_PER_TYPE", d.anchors.per_type_k),
                min_similarity: parse_or(&var, "SKILLTREE_ANCHOR_MIN_SIMILARITY", d.anchors.min_similarity),
                max_anchors: parse_or(&var, "SKILLTREE_MAX_ANCHORS", d.anchors.max_anchors),
            },
            progression: ProgressionConfig {
                alpha: parse_or(&var, "SKILLTREE_PERSONALIZATION_ALPHA", d.progression.alpha),
                expansion_width: parse_or(&var, "SKILLTREE_EXPANSION_WIDTH", d.progression.expansion_width),
                ..d.progression
            },
            cache: CacheConfig {
                local_capacity: parse_or(&var, "SKILLTREE_CACHE_LOCAL_CAPACITY", d.cache.local_capacity),
                synthesis_ttl_secs: parse_or(&var, "SKILLTREE_SYNTHESIS_TTL_SECS", d.cache.synthesis_ttl_secs),
                exploration_ttl_secs: parse_or(&var, "SKILLTREE_EXPLORE_TTL_SECS", d.cache.exploration_ttl_secs),
            },
            synthesis: SynthesisConfig {
                max_attempts: parse_or(&var, "SKILLTREE_MAX_ATTEMPTS", d.synthesis.max_attempts),
                retry_backoff_ms: parse_or(&var, "SKILLTREE_RETRY_BACKOFF_MS", d.synthesis.retry_backoff_ms),
                max_concurrency: parse_or(&var, "SKILLTREE_BULK_CONCURRENCY", d.synthesis.max_concurrency),
            },
        }
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| KernelError::Config(e.to_string()))
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.embedding_dimension == 0 {
            return Err(KernelError::Config("embedding_dimension must be positive".into()));
        }
        self.traversal
            .validate()
            .map_err(|e| KernelError::Config(format!("traversal: {e}")))?;
        if !(0.0..=1.0).contains(&self.progression.alpha) {
            return Err(KernelError::Config(format!(
                "progression.alpha must be in [0, 1], got {}",
                self.progression.alpha
            )));
        }
        if !(0.0..=1.0).contains(&self.anchors.min_similarity) {
            return Err(KernelError::Config("anchors.min_similarity must be in [0, 1]".into()));
        }
        if self.synthesis.max_attempts == 0 {
            return Err(KernelError::Config("synthesis.max_attempts must be at least 1".into()));
        }
        if self.synthesis.max_concurrency == 0 {
            return Err(KernelError::Config("synthesis.max_concurrency must be at least 1".into()));
        }
        if self.cache.synthesis_ttl_secs == 0 || self.cache.exploration_ttl_secs == 0 {
            return Err(KernelError::Config("cache TTLs must be positive".into()));
        }
        Ok(())
    }
}

fn parse_or<T: FromStr>(var: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T {
    match var(name) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(variable = name, value = %raw, "Unparseable configuration value, using default");
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_validate() {
        let config = KernelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.progression.alpha, 0.7);
        assert_eq!(config.traversal.node_cap, 100);
        assert_eq!(config.synthesis.max_concurrency, 5);
    }

    #[test]
    fn test_env_overrides() {
        let config = KernelConfig::from_lookup(lookup(&[
            ("SKILLTREE_EMBEDDING_DIM", "1024"),
            ("SKILLTREE_MAX_DEPTH", "4"),
            ("SKILLTREE_PERSONALIZATION_ALPHA", "0.5"),
            ("SKILLTREE_BUNDLE_PATH", "/data/graph.json"),
        ]));

        assert_eq!(config.embedding_dimension, 1024);
        assert_eq!(config.traversal.max_depth, 4);
        assert_eq!(config.progression.alpha, 0.5);
        assert_eq!(config.bundle_path, Some(PathBuf::from("/data/graph.json")));
    }

    #[test]
    fn test_bad_env_value_falls_back() {
        let config = KernelConfig::from_lookup(lookup(&[("SKILLTREE_MAX_ATTEMPTS", "lots")]));
        assert_eq!(config.synthesis.max_attempts, 3);
    }

    #[test]
    fn test_json_partial_document() {
        let config = KernelConfig::from_json_str(r#"{"progression": {"alpha": 0.9}, "embedding_dimension": 8}"#).unwrap();
        assert_eq!(config.progression.alpha, 0.9);
        assert_eq!(config.progression.expansion_width, 10);
        assert_eq!(config.embedding_dimension, 8);

        assert!(matches!(KernelConfig::from_json_str("{"), Err(KernelError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = KernelConfig::default();
        config.progression.alpha = 1.5;
        assert!(config.validate().is_err());

        let mut config = KernelConfig::default();
        config.synthesis.max_attempts = 0;
        assert!(config.validate().is_err());
    }
}
