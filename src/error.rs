//! Error taxonomy surfaced to callers.
//!
//! The set is small and closed. Cache misses, empty anchor lists and empty
//! tiers are ordinary values, never errors.

use std::fmt;
use thiserror::Error;

use crate::tree::Violation;

/// External collaborator that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Nearest-neighbor index.
    NeighborIndex,
    /// Language-model generation backend.
    Generation,
    /// Shared cache service.
    Cache,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NeighborIndex => write!(f, "neighbor index"),
            Self::Generation => write!(f, "generation"),
            Self::Cache => write!(f, "cache"),
        }
    }
}

/// What a caller should do about an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Retry with different input.
    InvalidInput,
    /// The same request may succeed later.
    RetryLater,
    /// A backend is down; the service runs degraded.
    ServiceDegraded,
}

/// Main error type for kernel operations.
#[derive(Debug, Error)]
pub enum KernelError {
    /// Embedding has the wrong number of dimensions.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Store dimension.
        expected: usize,
        /// Supplied dimension.
        actual: usize,
    },

    /// Malformed input (non-finite values, empty subject, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A node id that must exist does not.
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    /// A backend stayed unreachable after the degraded-mode fallback ran out.
    #[error("{backend} backend unavailable after {attempts} attempt(s): {message}")]
    BackendUnavailable {
        /// Which backend.
        backend: Backend,
        /// Attempts made.
        attempts: u32,
        /// Last failure.
        message: String,
    },

    /// Generated tree still fails validation after repair.
    #[error("Tree violates schema '{schema}' ({} violation(s), kinds: {})", .violations.len(), offending_kinds_display(.violations))]
    SchemaViolation {
        /// Schema variant name.
        schema: String,
        /// Every violation found.
        violations: Vec<Violation>,
    },

    /// Generation output could not be parsed.
    #[error("Unparseable generation output after {attempts} attempt(s): {message}")]
    Parse {
        /// Attempts made.
        attempts: u32,
        /// Last parse failure.
        message: String,
    },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;

impl KernelError {
    /// Classify the error for callers.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::DimensionMismatch { .. }
            | Self::InvalidInput(_)
            | Self::UnknownNode(_)
            | Self::Config(_) => ErrorClass::InvalidInput,
            Self::BackendUnavailable { .. } => ErrorClass::ServiceDegraded,
            Self::SchemaViolation { .. } | Self::Parse { .. } => ErrorClass::RetryLater,
        }
    }

    /// Whether retrying the identical request can help.
    pub fn is_retryable(&self) -> bool {
        !matches!(self.class(), ErrorClass::InvalidInput)
    }

    /// Distinct node kinds involved in a schema violation (empty otherwise).
    pub fn offending_kinds(&self) -> Vec<String> {
        match self {
            Self::SchemaViolation { violations, .. } => offending_kinds(violations),
            _ => Vec::new(),
        }
    }
}

fn offending_kinds(violations: &[Violation]) -> Vec<String> {
    let mut kinds: Vec<String> = violations.iter().map(|v| v.found_kind.clone()).collect();
    kinds.sort();
    kinds.dedup();
    kinds
}

fn offending_kinds_display(violations: &[Violation]) -> String {
    offending_kinds(violations).join(", ")
}
