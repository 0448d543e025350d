//! Schema validation for generated trees.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};
use crate::types::TypedTreeNode;
use super::schema::SchemaVariant;

/// Why a node violates the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationReason {
    /// `level` differs from the node's depth.
    LevelMismatch,
    /// `node_kind` differs from the table entry for its depth.
    KindMismatch,
    /// Leaf without actions.
    MissingActions,
    /// Leaf with children.
    LeafHasChildren,
    /// Non-leaf without children.
    MissingChildren,
    /// Non-leaf with actions.
    UnexpectedActions,
    /// Deeper than the table.
    TooDeep,
    /// Empty id.
    EmptyId,
    /// Id already used elsewhere in the tree.
    DuplicateId,
    /// Empty label.
    EmptyLabel,
}

impl fmt::Display for ViolationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::LevelMismatch => "level_mismatch",
            Self::KindMismatch => "kind_mismatch",
            Self::MissingActions => "missing_actions",
            Self::LeafHasChildren => "leaf_has_children",
            Self::MissingChildren => "missing_children",
            Self::UnexpectedActions => "unexpected_actions",
            Self::TooDeep => "too_deep",
            Self::EmptyId => "empty_id",
            Self::DuplicateId => "duplicate_id",
            Self::EmptyLabel => "empty_label",
        };
        f.write_str(s)
    }
}

/// One schema violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Offending node id (may be empty).
    pub node_id: String,
    /// Depth of the node in the tree.
    pub level: u32,
    /// Kind the node carries.
    pub found_kind: String,
    /// Kind the table expects at that depth (`None` past the table).
    pub expected_kind: Option<String>,
    /// What is wrong.
    pub reason: ViolationReason,
}

/// Check a tree against a schema.
///
/// Fails with `KernelError::SchemaViolation` carrying every violation found.
pub fn validate(tree: &TypedTreeNode, schema: SchemaVariant) -> Result<()> {
    let violations = violations(tree, schema);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(KernelError::SchemaViolation {
            schema: schema.name().to_string(),
            violations,
        })
    }
}

/// Every violation in the tree, in pre-order.
pub fn violations(tree: &TypedTreeNode, schema: SchemaVariant) -> Vec<Violation> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    check(tree, 0, schema, &mut seen, &mut out);
    out
}

fn check<'a>(
    node: &'a TypedTreeNode,
    depth: u32,
    schema: SchemaVariant,
    seen: &mut HashSet<&'a str>,
    out: &mut Vec<Violation>,
) {
    let expected = schema.kind_at(depth);
    let mut report = |reason| {
        out.push(Violation {
            node_id: node.id.clone(),
            level: depth,
            found_kind: node.node_kind.clone(),
            expected_kind: expected.map(str::to_string),
            reason,
        })
    };

    if node.id.trim().is_empty() {
        report(ViolationReason::EmptyId);
    } else if !seen.insert(node.id.as_str()) {
        report(ViolationReason::DuplicateId);
    }
    if node.label.trim().is_empty() {
        report(ViolationReason::EmptyLabel);
    }
    if node.level != depth {
        report(ViolationReason::LevelMismatch);
    }

    match expected {
        None => report(ViolationReason::TooDeep),
        Some(kind) => {
            if node.node_kind != kind {
                report(ViolationReason::KindMismatch);
            }
            if schema.is_leaf_level(depth) {
                if node.actions().is_empty() {
                    report(ViolationReason::MissingActions);
                }
                if !node.children().is_empty() {
                    report(ViolationReason::LeafHasChildren);
                }
            } else {
                if node.children().is_empty() {
                    report(ViolationReason::MissingChildren);
                }
                if !node.actions().is_empty() {
                    report(ViolationReason::UnexpectedActions);
                }
            }
        }
    }

    for child in node.children() {
        check(child, depth + 1, schema, seen, out);
    }
}
