//! Generative path: subject text → validated, cached typed tree.
//!
//! The language model is behind [`GenerationBackend`]; everything it returns
//! goes through `tree::repair` and `tree::validate` before a caller sees it.

pub mod backend;
pub mod prompt;
pub mod orchestrator;

pub use backend::{GenerationBackend, GenerationError, ResponseFormat};
pub use prompt::build_prompt;
pub use orchestrator::{parse_tree, SynthesisOutcome, SynthesisRequest, TreeSynthesisOrchestrator};
