//! Best-effort repair of generated trees.
//!
//! `repair` is a pure function: it reads the caller's tree and builds a new
//! one. Every rewrite is recorded as a [`Coercion`] and logged, so silent
//! fixes of model output stay observable.
//!
//! Post-condition: `validate(&repair(t, s), s)` succeeds for every `t`.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex_lite::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::types::{TreeAction, TypedTreeNode};
use super::schema::SchemaVariant;

/// What a repair step changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoercionKind {
    /// `level` rewritten from the node's position.
    Level,
    /// `node_kind` rewritten to the table entry.
    Kind,
    /// Empty label filled in.
    Label,
    /// Empty or duplicate id replaced.
    Id,
    /// Children below the leaf level folded into leaf actions.
    FoldedChildren,
    /// Children below the leaf level dropped.
    DroppedChildren,
    /// Generic actions synthesized for a leaf.
    SynthesizedActions,
    /// Actions removed from a non-leaf.
    StrippedActions,
    /// Childless branch removed.
    PrunedBranch,
    /// Childless branch with actions extended down to the leaf level.
    ExtendedBranch,
    /// Minimal chain synthesized under a childless root.
    SynthesizedChain,
}

/// One recorded rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Coercion {
    /// Node id at the time of the rewrite.
    pub node_id: String,
    /// Position of the node.
    pub level: u32,
    /// What changed.
    pub kind: CoercionKind,
}

/// Every rewrite a repair performed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    /// Rewrites in the order they were made.
    pub coercions: Vec<Coercion>,
}

impl RepairReport {
    /// Whether the input was already valid.
    pub fn is_clean(&self) -> bool {
        self.coercions.is_empty()
    }

    /// Number of rewrites of a given kind.
    pub fn count(&self, kind: CoercionKind) -> usize {
        self.coercions.iter().filter(|c| c.kind == kind).count()
    }

    fn record(&mut self, node_id: &str, level: u32, kind: CoercionKind) {
        info!(node_id, level, coercion = ?kind, "Repaired generated tree node");
        self.coercions.push(Coercion {
            node_id: node_id.to_string(),
            level,
            kind,
        });
    }
}

/// Repair a tree so it satisfies `schema`. Never fails.
pub fn repair(tree: &TypedTreeNode, schema: SchemaVariant) -> TypedTreeNode {
    repair_with_report(tree, schema).0
}

/// Repair a tree and report every rewrite.
pub fn repair_with_report(tree: &TypedTreeNode, schema: SchemaVariant) -> (TypedTreeNode, RepairReport) {
    let mut report = RepairReport::default();

    let mut root = repair_node(tree, 0, schema, &mut report).unwrap_or_else(|| {
        TypedTreeNode::new(tree.id.trim(), tree.label.trim(), "root", 0)
    });
    if root.children().is_empty() {
        report.record(&root.id, 0, CoercionKind::SynthesizedChain);
        let label = root.label.clone();
        root.children = Some(vec![synthesize_chain(&label, 1, None, schema)]);
    }

    let mut seen = HashSet::new();
    assign_ids(&mut root, &mut seen, &mut report);

    debug!(schema = %schema, coercions = report.coercions.len(), "Tree repair complete");
    (root, report)
}

/// Repair one node at `position`. `None` prunes it from its parent.
fn repair_node(
    node: &TypedTreeNode,
    position: u32,
    schema: SchemaVariant,
    report: &mut RepairReport,
) -> Option<TypedTreeNode> {
    let expected_kind = schema.kind_at(position)?;

    if node.level != position {
        report.record(&node.id, position, CoercionKind::Level);
    }
    if node.node_kind != expected_kind {
        report.record(&node.id, position, CoercionKind::Kind);
    }

    let label = match node.label.trim() {
        "" => {
            report.record(&node.id, position, CoercionKind::Label);
            fallback_label(node, expected_kind)
        }
        trimmed => trimmed.to_string(),
    };

    let mut out = TypedTreeNode::new(node.id.trim(), label, expected_kind, position);
    let own_actions: Vec<TreeAction> = node
        .actions()
        .iter()
        .filter(|a| !a.label.trim().is_empty())
        .cloned()
        .collect();

    if schema.is_leaf_level(position) {
        let mut actions = own_actions;
        if !node.children().is_empty() {
            if actions.is_empty() {
                actions = node
                    .children()
                    .iter()
                    .filter(|c| !c.label.trim().is_empty())
                    .map(|c| TreeAction::new(c.label.trim(), "learn"))
                    .collect();
                report.record(&node.id, position, CoercionKind::FoldedChildren);
            } else {
                report.record(&node.id, position, CoercionKind::DroppedChildren);
            }
        }
        if actions.is_empty() {
            report.record(&node.id, position, CoercionKind::SynthesizedActions);
            actions = generic_actions(&out.label);
        }
        out.actions = Some(actions);
        return Some(out);
    }

    // Children first, then decide about this node.
    let children: Vec<TypedTreeNode> = node
        .children()
        .iter()
        .filter_map(|c| repair_node(c, position + 1, schema, report))
        .collect();

    if !children.is_empty() {
        if !own_actions.is_empty() {
            report.record(&node.id, position, CoercionKind::StrippedActions);
        }
        out.children = Some(children);
        return Some(out);
    }

    if own_actions.is_empty() {
        if position == 0 {
            // The caller gives an empty root a synthesized chain.
            return Some(out);
        }
        report.record(&node.id, position, CoercionKind::PrunedBranch);
        return None;
    }

    // A leaf placed too shallow: keep its content by pushing it down.
    report.record(&node.id, position, CoercionKind::ExtendedBranch);
    let label = out.label.clone();
    out.children = Some(vec![synthesize_chain(&label, position + 1, Some(own_actions), schema)]);
    Some(out)
}

/// A single path from `from_level` to the leaf level, all labelled `label`.
fn synthesize_chain(
    label: &str,
    from_level: u32,
    actions: Option<Vec<TreeAction>>,
    schema: SchemaVariant,
) -> TypedTreeNode {
    let leaf_level = schema.leaf_level();
    let mut node = TypedTreeNode::new("", label, schema.leaf_kind(), leaf_level)
        .with_actions(actions.unwrap_or_else(|| generic_actions(label)));

    for level in (from_level..leaf_level).rev() {
        let kind = schema.kind_at(level).unwrap_or_default();
        node = TypedTreeNode::new("", label, kind, level).with_children(vec![node]);
    }
    node
}

fn generic_actions(label: &str) -> Vec<TreeAction> {
    vec![
        TreeAction::new(format!("Learn the fundamentals of {label}"), "learn"),
        TreeAction::new(format!("Practice {label} on a small project"), "practice"),
    ]
}

fn fallback_label(node: &TypedTreeNode, kind: &str) -> String {
    let from_id = node.id.replace(['_', '-'], " ");
    match from_id.trim() {
        "" => format!("Untitled {kind}"),
        words => words.to_string(),
    }
}

fn slug_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^a-z0-9]+").ok()).as_ref()
}

/// Lowercase, non-alphanumeric runs collapsed to `-`.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let slug = match slug_pattern() {
        Some(pattern) => pattern.replace_all(&lowered, "-").into_owned(),
        None => lowered
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect(),
    };
    slug.trim_matches('-').to_string()
}

/// Pre-order: fill empty ids from labels and make every id unique.
fn assign_ids(node: &mut TypedTreeNode, seen: &mut HashSet<String>, report: &mut RepairReport) {
    let base = match node.id.trim() {
        "" => {
            let slug = slugify(&node.label);
            if slug.is_empty() {
                node.node_kind.clone()
            } else {
                slug
            }
        }
        id => id.to_string(),
    };

    let mut candidate = base.clone();
    let mut suffix = 2;
    while seen.contains(&candidate) {
        candidate = format!("{base}-{suffix}");
        suffix += 1;
    }

    if candidate != node.id {
        report.record(&node.id, node.level, CoercionKind::Id);
        node.id = candidate.clone();
    }
    seen.insert(candidate);

    if let Some(children) = node.children.as_mut() {
        for child in children {
            assign_ids(child, seen, report);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::validate::validate;

    fn skill(id: &str) -> TypedTreeNode {
        TypedTreeNode::new(id, id.to_uppercase(), "skill", 3)
            .with_actions(vec![TreeAction::new("Build a model", "practice")])
    }

    #[test]
    fn test_mistagged_level_one_kind() {
        let tree = TypedTreeNode::new("root", "Data", "root", 0).with_children(vec![
            TypedTreeNode::new("d1", "Analytics", "field", 1).with_children(vec![
                TypedTreeNode::new("f1", "Statistics", "field", 2).with_children(vec![skill("s1")]),
            ]),
        ]);
        assert!(validate(&tree, SchemaVariant::SkillTree).is_err());

        let (repaired, report) = repair_with_report(&tree, SchemaVariant::SkillTree);

        let domain = repaired.find("d1").unwrap();
        assert_eq!(domain.node_kind, "domain");
        assert_eq!(domain.level, 1);
        assert_eq!(report.count(CoercionKind::Kind), 1);
        assert_eq!(report.coercions.len(), 1);
        assert!(validate(&repaired, SchemaVariant::SkillTree).is_ok());
    }

    #[test]
    fn test_input_untouched() {
        let tree = TypedTreeNode::new("", "", "banana", 9);
        let before = tree.clone();
        let _ = repair(&tree, SchemaVariant::CareerPath);
        assert_eq!(tree, before);
    }

    #[test]
    fn test_valid_tree_is_fixed_point() {
        let tree = TypedTreeNode::new("root", "Data", "root", 0).with_children(vec![
            TypedTreeNode::new("d1", "Analytics", "domain", 1).with_children(vec![
                TypedTreeNode::new("f1", "Statistics", "field", 2).with_children(vec![skill("s1")]),
            ]),
        ]);
        let (repaired, report) = repair_with_report(&tree, SchemaVariant::SkillTree);
        assert!(report.is_clean());
        assert_eq!(repaired, tree);
    }

    #[test]
    fn test_children_below_leaf_fold_into_actions() {
        let tree = TypedTreeNode::new("root", "Data", "root", 0).with_children(vec![
            TypedTreeNode::new("d1", "Analytics", "domain", 1).with_children(vec![
                TypedTreeNode::new("f1", "Statistics", "field", 2).with_children(vec![
                    TypedTreeNode::new("s1", "Regression", "skill", 3).with_children(vec![
                        TypedTreeNode::new("x", "Linear models", "skill", 4),
                        TypedTreeNode::new("y", "Logistic models", "skill", 4),
                    ]),
                ]),
            ]),
        ]);

        let repaired = repair(&tree, SchemaVariant::SkillTree);
        let leaf = repaired.find("s1").unwrap();
        let labels: Vec<&str> = leaf.actions().iter().map(|a| a.label.as_str()).collect();
        assert_eq!(labels, vec!["Linear models", "Logistic models"]);
        assert!(leaf.children.is_none());
        assert!(validate(&repaired, SchemaVariant::SkillTree).is_ok());
    }

    #[test]
    fn test_leaf_without_actions_gets_generic_ones() {
        let tree = TypedTreeNode::new("root", "Data", "root", 0).with_children(vec![
            TypedTreeNode::new("d1", "Analytics", "domain", 1).with_children(vec![
                TypedTreeNode::new("f1", "Statistics", "field", 2)
                    .with_children(vec![TypedTreeNode::new("s1", "Sampling", "skill", 3)]),
            ]),
        ]);

        let (repaired, report) = repair_with_report(&tree, SchemaVariant::SkillTree);
        assert_eq!(repaired.find("s1").unwrap().actions().len(), 2);
        assert_eq!(report.count(CoercionKind::SynthesizedActions), 1);
    }

    #[test]
    fn test_shallow_leaf_extended_and_empty_branch_pruned() {
        let tree = TypedTreeNode::new("root", "Careers", "root", 0).with_children(vec![
            TypedTreeNode::new("d1", "Health", "domain", 1)
                .with_actions(vec![TreeAction::new("Shadow a nurse", "explore")]),
            TypedTreeNode::new("d2", "Empty", "domain", 1),
        ]);

        let (repaired, report) = repair_with_report(&tree, SchemaVariant::CareerPath);

        assert!(repaired.find("d2").is_none());
        assert_eq!(report.count(CoercionKind::PrunedBranch), 1);
        assert_eq!(report.count(CoercionKind::ExtendedBranch), 1);

        let health = repaired.find("d1").unwrap();
        assert!(health.actions.is_none());
        let leaf = &health.children()[0].children()[0];
        assert_eq!(leaf.node_kind, "competency");
        assert_eq!(leaf.actions()[0].label, "Shadow a nurse");
        assert!(validate(&repaired, SchemaVariant::CareerPath).is_ok());
    }

    #[test]
    fn test_garbage_root_gets_minimal_chain() {
        let tree = TypedTreeNode::new("", "", "banana", 9);
        let repaired = repair(&tree, SchemaVariant::SkillTree);

        assert_eq!(repaired.node_kind, "root");
        assert_eq!(repaired.node_count(), 4);
        assert!(validate(&repaired, SchemaVariant::SkillTree).is_ok());
    }

    #[test]
    fn test_root_actions_move_to_leaf() {
        let tree = TypedTreeNode::new("root", "Cooking", "root", 0)
            .with_actions(vec![TreeAction::new("Bake bread", "practice")]);

        let repaired = repair(&tree, SchemaVariant::SkillTree);
        assert!(repaired.actions.is_none());
        let leaf = &repaired.children()[0].children()[0].children()[0];
        assert_eq!(leaf.actions()[0].label, "Bake bread");
        assert!(validate(&repaired, SchemaVariant::SkillTree).is_ok());
    }

    #[test]
    fn test_ids_filled_and_deduplicated() {
        let tree = TypedTreeNode::new("root", "Data", "root", 0).with_children(vec![
            TypedTreeNode::new("", "Machine Learning!", "domain", 1).with_children(vec![
                TypedTreeNode::new("dup", "A", "field", 2).with_children(vec![skill("dup")]),
            ]),
        ]);

        let repaired = repair(&tree, SchemaVariant::SkillTree);
        assert!(repaired.find("machine-learning").is_some());
        assert!(repaired.find("dup").is_some());
        assert!(repaired.find("dup-2").is_some());
        assert!(validate(&repaired, SchemaVariant::SkillTree).is_ok());
    }

    #[test]
    fn test_separator_only_id_with_empty_label() {
        for id in ["_", "--", " -_ "] {
            let tree = TypedTreeNode::new(id, "", "root", 0);
            let repaired = repair(&tree, SchemaVariant::SkillTree);

            assert_eq!(repaired.label, "Untitled root", "id {id:?}");
            assert!(validate(&repaired, SchemaVariant::SkillTree).is_ok(), "id {id:?}");
        }
    }

    #[test]
    fn test_fallback_label_from_id() {
        let tree = TypedTreeNode::new("root", "Data", "root", 0).with_children(vec![
            TypedTreeNode::new("machine_learning", " ", "domain", 1).with_children(vec![
                TypedTreeNode::new("--", "", "field", 2).with_children(vec![skill("reg")]),
            ]),
        ]);

        let (repaired, report) = repair_with_report(&tree, SchemaVariant::SkillTree);
        assert_eq!(repaired.find("machine_learning").unwrap().label, "machine learning");
        assert_eq!(repaired.find("--").unwrap().label, "Untitled field");
        assert_eq!(report.count(CoercionKind::Label), 2);
        assert!(validate(&repaired, SchemaVariant::SkillTree).is_ok());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("  Data Science & AI "), "data-science-ai");
        assert_eq!(slugify("!!!"), "");
    }
}
