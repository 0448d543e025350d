//! User profile used for personalization and cache keying.

use serde::{Deserialize, Serialize};

use crate::canonical::{canonical_hash_hex, quantize_vector};

/// What we know about the user requesting a tree or progression.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Stated interests.
    #[serde(default)]
    pub interests: Vec<String>,
    /// Skills the user already has.
    #[serde(default)]
    pub skills: Vec<String>,
    /// Optional profile embedding in the node embedding space.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

#[derive(Serialize)]
struct FingerprintInput {
    interests: Vec<String>,
    skills: Vec<String>,
    embedding: Option<Vec<i64>>,
}

impl UserProfile {
    /// Create a profile from interests and skills.
    pub fn new(interests: Vec<String>, skills: Vec<String>) -> Self {
        Self {
            interests,
            skills,
            embedding: None,
        }
    }

    /// Attach an embedding (builder style).
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Whether the profile carries no signal at all.
    pub fn is_empty(&self) -> bool {
        self.interests.is_empty() && self.skills.is_empty() && self.embedding.is_none()
    }

    /// Deterministic fingerprint.
    ///
    /// Insensitive to list order, case and surrounding whitespace; the
    /// embedding is quantized so float noise does not change the value.
    pub fn fingerprint(&self) -> String {
        let input = FingerprintInput {
            interests: normalize_terms(&self.interests),
            skills: normalize_terms(&self.skills),
            embedding: self.embedding.as_deref().map(quantize_vector),
        };
        canonical_hash_hex(&input)
    }
}

fn normalize_terms(terms: &[String]) -> Vec<String> {
    let mut out: Vec<String> = terms
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}
