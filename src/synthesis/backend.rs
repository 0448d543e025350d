//! Generation backend seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tree::SchemaVariant;

/// Error type for generation backends.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// The backend could not be reached.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// The backend is throttling requests.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The call did not finish in time.
    #[error("Generation timed out after {0} ms")]
    Timeout(u64),

    /// The backend refused the request.
    #[error("Request rejected: {0}")]
    Rejected(String),
}

/// Requested output shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Free text.
    Text,
    /// Structured output constrained by a JSON schema.
    JsonSchema {
        /// Schema name.
        name: String,
        /// The schema document.
        schema: Value,
        /// Whether the backend must adhere strictly.
        strict: bool,
    },
}

impl ResponseFormat {
    /// Structured-output format for a tree schema.
    pub fn for_schema(schema: SchemaVariant) -> Self {
        Self::JsonSchema {
            name: schema.name().to_string(),
            schema: schema.json_schema(),
            strict: true,
        }
    }
}

/// Completion service producing tree JSON.
///
/// Implementations are shared across tasks and must be safe to call
/// concurrently.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Complete `prompt`, honoring `format` where the backend supports it.
    async fn complete(&self, prompt: &str, format: &ResponseFormat) -> Result<String, GenerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_carries_schema() {
        match ResponseFormat::for_schema(SchemaVariant::CareerPath) {
            ResponseFormat::JsonSchema { name, schema, strict } => {
                assert_eq!(name, "career_path");
                assert!(strict);
                assert_eq!(schema["title"], "career_path");
            }
            other => panic!("unexpected format: {other:?}"),
        }
    }
}
