//! Prompt rendering for tree synthesis.

use crate::cache::normalize_subject;
use crate::tree::SchemaVariant;
use crate::types::UserProfile;

/// Actions requested per leaf.
const ACTIONS_PER_LEAF: &str = "2-4";

/// Render the generation prompt for `subject`.
///
/// Contains the subject, the optional learner profile, the level table of
/// `schema` and the output contract. Deterministic for equal inputs.
pub fn build_prompt(subject: &str, profile: Option<&UserProfile>, schema: SchemaVariant) -> String {
    let subject = subject.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut lines = vec![
        format!("Build a {} for the subject \"{}\".", schema.name().replace('_', " "), subject),
        String::new(),
        "Levels:".to_string(),
    ];

    lines.extend(schema.levels().iter().enumerate().map(|(level, kind)| {
        let role = if level == 0 {
            "the subject itself"
        } else if schema.is_leaf_level(level as u32) {
            "leaf, carries actions"
        } else {
            "groups the level below"
        };
        format!("  {level}: {kind} ({role})")
    }));
    lines.push(String::new());

    if let Some(profile) = profile.filter(|p| !p.is_empty()) {
        lines.push("Learner profile:".to_string());
        if !profile.interests.is_empty() {
            lines.push(format!("  Interests: {}", join_terms(&profile.interests)));
        }
        if !profile.skills.is_empty() {
            lines.push(format!("  Current skills: {}", join_terms(&profile.skills)));
            lines.push("  Favor what builds on these skills; do not repeat them as leaves.".to_string());
        }
        lines.push(String::new());
    }

    lines.extend([
        "Rules:".to_string(),
        "  - Every node has a unique id, a label, its node_kind and its level.".to_string(),
        format!("  - Each {} node has {ACTIONS_PER_LEAF} actions and no children.", schema.leaf_kind()),
        "  - Every other node has children and no actions.".to_string(),
        format!("  - Do not nest deeper than level {}.", schema.leaf_level()),
        String::new(),
        "Respond with a single JSON object {\"tree\": <root node>} and nothing else.".to_string(),
    ]);

    lines.join("\n")
}

fn join_terms(terms: &[String]) -> String {
    terms
        .iter()
        .map(|t| normalize_subject(t))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}
