//! Deterministic cache keys.
//!
//! Keys are `"<namespace>:<hash>"`. Consumers rely only on "same logical
//! request, same key"; the hash layout is not a contract.

use serde::Serialize;

use crate::canonical::{canonical_hash_hex, quantize_vector};
use crate::similarity::ScoringStrategy;
use crate::tree::SchemaVariant;

/// Namespace for synthesized trees.
pub const TREE_NAMESPACE: &str = "tree";
/// Namespace for exploration subgraphs.
pub const EXPLORE_NAMESPACE: &str = "explore";
/// Namespace for progression tiers.
pub const PROGRESSION_NAMESPACE: &str = "progression";

#[derive(Serialize)]
struct SynthesisKeyInput<'a> {
    subject: String,
    profile: Option<&'a str>,
    schema: &'a str,
}

#[derive(Serialize)]
struct ExplorationKeyInput<'a> {
    embedding: Vec<i64>,
    params: &'a str,
    strategy: ScoringStrategy,
}

/// Lowercase and collapse whitespace, so trivially different spellings share a key.
pub fn normalize_subject(subject: &str) -> String {
    subject
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Key for a tree synthesis request.
pub fn synthesis_key(subject: &str, profile_fingerprint: Option<&str>, schema: SchemaVariant) -> String {
    let input = SynthesisKeyInput {
        subject: normalize_subject(subject),
        profile: profile_fingerprint,
        schema: schema.name(),
    };
    format!("{TREE_NAMESPACE}:{}", canonical_hash_hex(&input))
}

/// Key for a graph-path request in `namespace`.
///
/// The scoring strategy is part of the key: scores from different strategies
/// are not comparable, so their results must never be served for each other.
pub fn exploration_key(
    namespace: &str,
    embedding: &[f32],
    params_hash: &str,
    strategy: ScoringStrategy,
) -> String {
    let input = ExplorationKeyInput {
        embedding: quantize_vector(embedding),
        params: params_hash,
        strategy,
    };
    format!("{namespace}:{}", canonical_hash_hex(&input))
}
