//! Schema enforcement for generated trees.
//!
//! `repair` runs first and never fails; `validate` then decides. A tree that
//! still fails after repair is a terminal generation failure.

pub mod schema;
pub mod validate;
pub mod repair;

pub use schema::SchemaVariant;
pub use validate::{validate, violations, Violation, ViolationReason};
pub use repair::{repair, repair_with_report, slugify, Coercion, CoercionKind, RepairReport};
