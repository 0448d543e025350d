//! # skilltree-kernel
//!
//! Skill-to-career graph kernel over an occupation/skill knowledge graph.
//!
//! The kernel answers two questions:
//!
//! > Given an embedding, which occupations and skills lie nearby, and in what
//! > order should they be learned?
//!
//! > Given a subject, what does a well-formed learning tree for it look like?
//!
//! ## Architecture
//!
//! ```text
//! embedding → AnchorDiscovery → GraphTraversalEngine → CareerProgressionAggregator → tiers
//!                                      ↓
//!                              SimilarityScorer (encoder | neighbor overlap)
//!
//! subject → TreeSynthesisOrchestrator → GenerationBackend → repair → validate → CacheTier → tree
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same anchors + same policy + same graph → identical traversal
//! - Ties are always broken by node id
//! - Cache keys are canonical hashes of quantized inputs

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod canonical;
pub mod error;
pub mod store;
pub mod similarity;
pub mod anchor;
pub mod policy;
pub mod traversal;
pub mod progression;
pub mod explorer;
pub mod tree;
pub mod cache;
pub mod synthesis;
pub mod config;
pub mod telemetry;

// Re-exports
pub use types::{
    NodeId, NodeType, GraphNode, GraphEdge, EdgeType, TraversalResult, TraversedNode, TraversalEdge,
    TraversalStats, Tier, TierSkill, TypedTreeNode, TreeAction, UserProfile,
};
pub use error::{KernelError, ErrorClass, Backend, Result};
pub use store::{GraphStore, InMemoryGraphStore, NodeEmbeddingStore, GraphBundle, LoadedGraph};
pub use similarity::{
    SimilarityScorer, ScoringStrategy, EncoderSimilarity, NeighborOverlapSimilarity, MemoizedScorer,
    NodeEncoder, MeanAggregationEncoder, build_scorer,
};
pub use anchor::{Anchor, AnchorDiscovery, NeighborIndex, InMemoryNeighborIndex};
pub use policy::TraversalPolicy;
pub use traversal::GraphTraversalEngine;
pub use progression::CareerProgressionAggregator;
pub use explorer::{GraphExplorer, ExploreRequest};
pub use tree::{SchemaVariant, validate, repair, Violation};
pub use cache::{CacheTier, SharedCacheBackend, InMemorySharedCache};
pub use synthesis::{
    TreeSynthesisOrchestrator, SynthesisRequest, SynthesisOutcome, GenerationBackend, GenerationError,
    ResponseFormat,
};
pub use config::KernelConfig;
pub use canonical::{canonical_hash, canonical_hash_hex};

/// Default traversal policy version identifier.
pub const DEFAULT_POLICY_VERSION: &str = "traversal_policy_v1";
