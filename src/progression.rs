//! Career progression tiers.
//!
//! Drives a traversal from one seed, buckets admitted nodes by depth and
//! ranks each bucket, optionally blending in the user's profile:
//!
//! ```text
//! final = α · graph_score + (1 − α) · (cos(user, node) + 1) / 2
//! ```

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::config::ProgressionConfig;
use crate::error::{KernelError, Result};
use crate::policy::{TraversalPolicy, DEFAULT_NODE_CAP};
use crate::similarity::{cosine_similarity, rescale_cosine};
use crate::store::GraphStore;
use crate::traversal::GraphTraversalEngine;
use crate::types::{NodeId, Tier, TierSkill};

/// Buckets traversal output into ranked, de-duplicated tiers.
pub struct CareerProgressionAggregator<G: GraphStore + ?Sized> {
    engine: Arc<GraphTraversalEngine<G>>,
    config: ProgressionConfig,
    node_cap: usize,
}

impl<G: GraphStore + ?Sized> CareerProgressionAggregator<G> {
    /// Create an aggregator; α and expansion width come from `config`.
    pub fn new(engine: Arc<GraphTraversalEngine<G>>, config: ProgressionConfig) -> Self {
        Self {
            engine,
            config,
            node_cap: DEFAULT_NODE_CAP,
        }
    }

    /// Override the traversal node cap (builder style).
    pub fn with_node_cap(mut self, node_cap: usize) -> Self {
        self.node_cap = node_cap;
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &ProgressionConfig {
        &self.config
    }

    /// Ranked tiers reachable from `seed_id`.
    ///
    /// An unknown seed yields no tiers. A `user_vector` of the wrong length
    /// fails with `DimensionMismatch`.
    #[instrument(skip(self, user_vector), fields(seed = %seed_id, personalized = user_vector.is_some()))]
    pub fn extract_progression(
        &self,
        seed_id: &NodeId,
        depth: u32,
        max_skills_per_tier: usize,
        min_similarity: f32,
        user_vector: Option<&[f32]>,
    ) -> Result<Vec<Tier>> {
        let nodes = self.engine.nodes();
        if let Some(user) = user_vector {
            nodes.check_query(user)?;
        }
        if !(0.0..=1.0).contains(&min_similarity) {
            return Err(KernelError::InvalidInput(format!(
                "min_similarity must be in [0, 1], got {min_similarity}"
            )));
        }
        if !nodes.contains(seed_id) {
            debug!("Unknown seed, no progression");
            return Ok(Vec::new());
        }

        let policy = TraversalPolicy::new(depth, min_similarity, self.config.expansion_width)
            .with_node_cap(self.node_cap);
        let result = self.engine.traverse(std::slice::from_ref(seed_id), &policy);

        let alpha = self.config.alpha;
        let candidates = result
            .nodes
            .into_iter()
            .filter(|(_, node)| !node.is_anchor)
            .map(|(id, node)| {
                let graph_score = node.score;
                let affinity = user_vector.and_then(|user| {
                    nodes
                        .vector(&id)
                        .filter(|v| v.iter().any(|x| *x != 0.0))
                        .map(|v| rescale_cosine(cosine_similarity(user, v)))
                });
                let score = match affinity {
                    Some(a) => alpha * graph_score + (1.0 - alpha) * a,
                    None => graph_score,
                };
                let skill = TierSkill {
                    id,
                    node_type: node.node_type,
                    label: node.label,
                    score,
                    graph_score,
                    profile_affinity: affinity,
                };
                (node.depth, skill)
            });

        let tiers = build_tiers(candidates, max_skills_per_tier);
        debug!(tiers = tiers.len(), "Progression extracted");
        Ok(tiers)
    }

    /// [`extract_progression`](Self::extract_progression) with the configured depth, width and threshold.
    pub fn extract_default(&self, seed_id: &NodeId, user_vector: Option<&[f32]>) -> Result<Vec<Tier>> {
        self.extract_progression(
            seed_id,
            self.config.depth,
            self.config.max_skills_per_tier,
            self.config.min_similarity,
            user_vector,
        )
    }
}

/// Assemble `(tier_number, entry)` candidates into tiers.
///
/// Tiers are processed in ascending order. Within a tier the best score per
/// id is kept, ids placed in a shallower tier are dropped, entries are sorted
/// descending by score (ties by id) and truncated to `max_per_tier`. Only
/// entries that survive truncation count as placed. Empty tiers are omitted.
pub fn build_tiers(candidates: impl IntoIterator<Item = (u32, TierSkill)>, max_per_tier: usize) -> Vec<Tier> {
    let mut buckets: BTreeMap<u32, BTreeMap<NodeId, TierSkill>> = BTreeMap::new();
    for (tier_number, skill) in candidates {
        let bucket = buckets.entry(tier_number).or_default();
        match bucket.get(&skill.id) {
            Some(existing) if existing.score >= skill.score => {}
            _ => {
                bucket.insert(skill.id.clone(), skill);
            }
        }
    }

    let mut placed: HashSet<NodeId> = HashSet::new();
    let mut tiers = Vec::new();

    for (tier_number, bucket) in buckets {
        let mut skills: Vec<TierSkill> = bucket
            .into_values()
            .filter(|s| !placed.contains(&s.id))
            .collect();
        skills.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        skills.truncate(max_per_tier);

        if skills.is_empty() {
            continue;
        }
        placed.extend(skills.iter().map(|s| s.id.clone()));
        tiers.push(Tier { tier_number, skills });
    }
    tiers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryGraphStore, NodeEmbeddingStore};
    use crate::traversal::tests::{graph_of, TableScorer};
    use crate::types::{GraphNode, NodeType};

    fn entry(id: &str, score: f32) -> TierSkill {
        TierSkill {
            id: NodeId::from(id),
            node_type: NodeType::Skill,
            label: id.to_string(),
            score,
            graph_score: score,
            profile_affinity: None,
        }
    }

    fn ids(tier: &Tier) -> Vec<&str> {
        tier.skills.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_shallowest_tier_wins() {
        let tiers = build_tiers(
            vec![
                (1, entry("skill::x", 0.4)),
                (1, entry("skill::a", 0.9)),
                (2, entry("skill::x", 0.95)),
                (2, entry("skill::b", 0.5)),
            ],
            3,
        );

        assert_eq!(tiers.len(), 2);
        assert_eq!(ids(&tiers[0]), vec!["skill::a", "skill::x"]);
        assert_eq!(ids(&tiers[1]), vec!["skill::b"]);
    }

    #[test]
    fn test_truncation_and_empty_tiers() {
        let tiers = build_tiers(
            vec![
                (1, entry("skill::a", 0.9)),
                (1, entry("skill::b", 0.8)),
                (1, entry("skill::c", 0.7)),
                (2, entry("skill::a", 0.6)),
                (3, entry("skill::c", 0.99)),
            ],
            2,
        );

        // c was truncated out of tier 1, so it may still appear deeper.
        assert_eq!(tiers.iter().map(|t| t.tier_number).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(ids(&tiers[0]), vec!["skill::a", "skill::b"]);
        assert_eq!(ids(&tiers[1]), vec!["skill::c"]);
    }

    #[test]
    fn test_duplicate_within_tier_keeps_best() {
        let tiers = build_tiers(vec![(1, entry("skill::a", 0.2)), (1, entry("skill::a", 0.7))], 5);
        assert_eq!(tiers[0].skills.len(), 1);
        assert_eq!(tiers[0].skills[0].score, 0.7);
    }

    fn aggregator() -> CareerProgressionAggregator<InMemoryGraphStore> {
        let node = |raw: &str, v: Vec<f32>| {
            let id = NodeId::from(raw);
            GraphNode::new(id.clone(), id.node_type().unwrap_or(NodeType::Skill), id.key().to_string(), v)
        };
        let nodes = NodeEmbeddingStore::from_nodes(2, vec![
            node("occupation::seed", vec![1.0, 1.0]),
            node("skill::a", vec![1.0, 0.0]),
            node("skill::b", vec![0.0, 1.0]),
            node("skill::c", vec![0.0, 0.0]),
        ])
        .unwrap();
        let graph = graph_of(&[
            ("occupation::seed", "skill::a"),
            ("occupation::seed", "skill::b"),
            ("skill::a", "skill::c"),
        ]);
        let scorer = TableScorer::new(&[
            ("occupation::seed", "skill::a", 0.6),
            ("occupation::seed", "skill::b", 0.6),
            ("skill::a", "skill::c", 0.8),
        ]);
        let engine = GraphTraversalEngine::new(Arc::new(nodes), graph, Arc::new(scorer));
        CareerProgressionAggregator::new(Arc::new(engine), ProgressionConfig::default())
    }

    #[test]
    fn test_progression_tiers_by_depth() {
        let tiers = aggregator()
            .extract_progression(&NodeId::from("occupation::seed"), 2, 5, 0.3, None)
            .unwrap();

        assert_eq!(tiers.len(), 2);
        assert_eq!(ids(&tiers[0]), vec!["skill::a", "skill::b"]);
        assert_eq!(ids(&tiers[1]), vec!["skill::c"]);
        assert!(tiers.iter().all(|t| !t.contains(&NodeId::from("occupation::seed"))));
    }

    #[test]
    fn test_personalization_reorders() {
        let tiers = aggregator()
            .extract_progression(&NodeId::from("occupation::seed"), 2, 5, 0.3, Some(&[0.0, 1.0]))
            .unwrap();

        let first = &tiers[0].skills[0];
        assert_eq!(first.id.as_str(), "skill::b");
        assert!((first.score - (0.7 * 0.6 + 0.3 * 1.0)).abs() < 1e-5);
        assert!((first.graph_score - 0.6).abs() < 1e-6);

        // skill::c has no embedding signal and keeps its graph score.
        let c = &tiers[1].skills[0];
        assert_eq!(c.profile_affinity, None);
        assert!((c.score - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_seed_and_bad_vector() {
        let agg = aggregator();
        assert!(agg
            .extract_progression(&NodeId::from("occupation::ghost"), 2, 5, 0.3, None)
            .unwrap()
            .is_empty());

        let err = agg
            .extract_progression(&NodeId::from("occupation::seed"), 2, 5, 0.3, Some(&[1.0]))
            .unwrap_err();
        assert!(matches!(err, KernelError::DimensionMismatch { expected: 2, actual: 1 }));
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let agg = aggregator();
        let seed = NodeId::from("occupation::seed");
        for bad in [f32::NAN, -0.1, 1.5] {
            let err = agg.extract_progression(&seed, 2, 5, bad, None).unwrap_err();
            assert!(matches!(err, KernelError::InvalidInput(_)), "threshold {bad}");
        }
    }
}
