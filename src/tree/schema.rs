//! Level→kind tables for generated trees.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

const SKILL_TREE_LEVELS: &[&str] = &["root", "domain", "field", "skill"];
const CAREER_PATH_LEVELS: &[&str] = &["root", "domain", "occupation", "competency"];

/// Schema variant a generated tree must follow.
///
/// Each variant is a fixed table from level (depth, root is 0) to node kind.
/// The last level holds the leaf kind; only leaves carry actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaVariant {
    /// `root → domain → field → skill`.
    #[default]
    SkillTree,
    /// `root → domain → occupation → competency`.
    CareerPath,
}

impl SchemaVariant {
    /// Stable name, used in cache keys and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SkillTree => "skill_tree",
            Self::CareerPath => "career_path",
        }
    }

    /// Parse a variant name.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "skill_tree" | "skilltree" => Some(Self::SkillTree),
            "career_path" | "careerpath" => Some(Self::CareerPath),
            _ => None,
        }
    }

    /// The level→kind table.
    pub fn levels(&self) -> &'static [&'static str] {
        match self {
            Self::SkillTree => SKILL_TREE_LEVELS,
            Self::CareerPath => CAREER_PATH_LEVELS,
        }
    }

    /// Kind expected at `level`, if the table is that deep.
    pub fn kind_at(&self, level: u32) -> Option<&'static str> {
        self.levels().get(level as usize).copied()
    }

    /// Level of the leaf kind.
    pub fn leaf_level(&self) -> u32 {
        (self.levels().len() - 1) as u32
    }

    /// The leaf kind.
    pub fn leaf_kind(&self) -> &'static str {
        self.levels()[self.levels().len() - 1]
    }

    /// Whether `level` is the leaf level.
    pub fn is_leaf_level(&self, level: u32) -> bool {
        level == self.leaf_level()
    }

    /// JSON schema for structured generation output.
    pub fn json_schema(&self) -> Value {
        json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "title": self.name(),
            "$ref": "#/$defs/node",
            "$defs": {
                "action": {
                    "type": "object",
                    "properties": {
                        "label": { "type": "string", "minLength": 1 },
                        "action_type": { "type": "string" }
                    },
                    "required": ["label"]
                },
                "node": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "minLength": 1 },
                        "label": { "type": "string", "minLength": 1 },
                        "node_kind": { "enum": self.levels() },
                        "level": { "type": "integer", "minimum": 0, "maximum": self.leaf_level() },
                        "actions": { "type": "array", "items": { "$ref": "#/$defs/action" } },
                        "children": { "type": "array", "items": { "$ref": "#/$defs/node" } }
                    },
                    "required": ["id", "label", "node_kind", "level"]
                }
            }
        })
    }
}

impl fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
