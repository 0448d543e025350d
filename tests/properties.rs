//! Property tests for the kernel's invariants.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use proptest::prelude::*;
use skilltree_kernel::anchor::{IndexError, NeighborHit};
use skilltree_kernel::progression::build_tiers;
use skilltree_kernel::{
    repair, validate, AnchorDiscovery, GraphEdge, GraphNode, GraphTraversalEngine, InMemoryGraphStore,
    NeighborIndex, NeighborOverlapSimilarity, NodeEmbeddingStore, NodeId, NodeType, SchemaVariant,
    SimilarityScorer, TierSkill, TraversalPolicy, TreeAction, TypedTreeNode,
};

struct FixedIndex {
    hits: Vec<NeighborHit>,
}

#[async_trait]
impl NeighborIndex for FixedIndex {
    async fn query(
        &self,
        _vector: &[f32],
        top_k: usize,
        _type_filter: Option<NodeType>,
    ) -> Result<Vec<NeighborHit>, IndexError> {
        Ok(self.hits.iter().take(top_k).cloned().collect())
    }
}

fn node_id(i: usize) -> NodeId {
    if i % 4 == 0 {
        NodeId::new(NodeType::Occupation, &format!("o{i}"))
    } else {
        NodeId::new(NodeType::Skill, &format!("s{i}"))
    }
}

fn build_graph(n: usize, edges: &[(usize, usize)]) -> (Arc<NodeEmbeddingStore>, Arc<InMemoryGraphStore>) {
    let nodes = (0..n).map(|i| {
        let id = node_id(i);
        let node_type = id.node_type().unwrap_or(NodeType::Skill);
        GraphNode::new(id.clone(), node_type, id.key().to_string(), vec![i as f32, 1.0])
    });
    let store = NodeEmbeddingStore::from_nodes(2, nodes).unwrap();
    let graph = InMemoryGraphStore::from_edges(
        edges
            .iter()
            .map(|(a, b)| (a % n, b % n))
            .filter(|(a, b)| a != b)
            .map(|(a, b)| GraphEdge::unit(node_id(a), node_id(b))),
    );
    (Arc::new(store), Arc::new(graph))
}

fn arb_graph() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (2usize..24).prop_flat_map(|n| (Just(n), prop::collection::vec((0..n, 0..n), 0..60)))
}

fn arb_tree() -> impl Strategy<Value = TypedTreeNode> {
    // Short ids collide often; separator-only ids and labels exercise the fallbacks.
    let ids = prop_oneof![
        prop::sample::select(vec!["", "a", "b", "ml", "  "]).prop_map(String::from),
        "[ _\\-a-z]{0,4}",
    ];
    let labels = prop_oneof![
        prop::sample::select(vec!["Data", "Machine Learning", "Julienne", "C++"]).prop_map(String::from),
        "[ _\\-a-z]{0,4}",
    ];
    let kinds = prop::sample::select(vec![
        "", "root", "domain", "field", "skill", "occupation", "competency", "banana",
    ]);
    let actions = prop::option::of(prop::collection::vec(
        prop::sample::select(vec!["", "Read a book", "Build a project"]).prop_map(|l| TreeAction::new(l, "learn")),
        0..3,
    ));

    let leaf = (ids.clone(), labels.clone(), kinds.clone(), 0u32..9, actions.clone()).prop_map(
        |(id, label, kind, level, actions)| {
            let mut node = TypedTreeNode::new(id, label, kind, level);
            node.actions = actions;
            node
        },
    );

    leaf.prop_recursive(5, 48, 4, move |inner| {
        (
            ids.clone(),
            labels.clone(),
            kinds.clone(),
            0u32..9,
            actions.clone(),
            prop::option::of(prop::collection::vec(inner, 0..4)),
        )
            .prop_map(|(id, label, kind, level, actions, children)| {
                let mut node = TypedTreeNode::new(id, label, kind, level);
                node.actions = actions;
                node.children = children;
                node
            })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_anchors_sorted_thresholded_bounded(
        sims in prop::collection::vec(-0.5f32..1.0, 0..20),
        top_k in 0usize..10,
        min_similarity in 0.0f32..1.0,
    ) {
        let hits = sims
            .iter()
            .enumerate()
            .map(|(i, s)| NeighborHit { id: node_id(i), distance: 1.0 - s, metadata: BTreeMap::new() })
            .collect();
        let discovery = AnchorDiscovery::new(Arc::new(FixedIndex { hits }), 2);
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();

        let anchors = rt.block_on(discovery.find_anchors(&[1.0, 0.0], top_k, min_similarity, None)).unwrap();

        prop_assert!(anchors.len() <= top_k);
        prop_assert!(anchors.iter().all(|a| a.score >= min_similarity));
        prop_assert!(anchors.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn prop_traversal_invariants(
        (n, edges) in arb_graph(),
        anchor_picks in prop::collection::vec(0usize..24, 1..4),
        max_depth in 0u32..4,
        min_similarity in 0.0f32..0.8,
        width in 1usize..5,
        node_cap in 1usize..30,
    ) {
        let (nodes, graph) = build_graph(n, &edges);
        let scorer = Arc::new(NeighborOverlapSimilarity::new(Arc::clone(&nodes), Arc::clone(&graph)));
        let engine = GraphTraversalEngine::new(nodes, graph, scorer);
        let anchors: Vec<NodeId> = anchor_picks.iter().map(|i| node_id(i % n)).collect();
        let policy = TraversalPolicy::new(max_depth, min_similarity, width).with_node_cap(node_cap);

        let result = engine.traverse(&anchors, &policy);

        prop_assert!(result.len() <= node_cap);
        for (id, node) in &result.nodes {
            prop_assert!(node.depth <= max_depth);
            if node.is_anchor {
                prop_assert!(anchors.contains(id));
                prop_assert_eq!(node.depth, 0);
                continue;
            }
            let parent = node.parent.as_ref().unwrap();
            prop_assert_eq!(node.depth, result.nodes[parent].depth + 1);
            prop_assert!(node.score >= min_similarity);
        }
        let mut targets = HashSet::new();
        prop_assert!(result.edges.iter().all(|e| targets.insert(e.target.clone())));
    }

    #[test]
    fn prop_overlap_similarity_symmetric_and_bounded(
        (n, edges) in arb_graph(),
        a in 0usize..24,
        b in 0usize..24,
    ) {
        let (nodes, graph) = build_graph(n, &edges);
        let scorer = NeighborOverlapSimilarity::new(nodes, graph);
        let (a, b) = (node_id(a % n), node_id(b % n));

        let ab = scorer.similarity(&a, &b);
        prop_assert_eq!(ab, scorer.similarity(&b, &a));
        prop_assert!((0.0..=1.0).contains(&ab));
        prop_assert_eq!(scorer.similarity(&a, &a), 1.0);
    }

    #[test]
    fn prop_repair_always_validates(tree in arb_tree(), career in any::<bool>()) {
        let schema = if career { SchemaVariant::CareerPath } else { SchemaVariant::SkillTree };
        let repaired = repair(&tree, schema);

        prop_assert!(validate(&repaired, schema).is_ok(), "{:?}", validate(&repaired, schema));
        prop_assert_eq!(repair(&repaired, schema), repaired);
    }

    #[test]
    fn prop_tiers_disjoint_sorted_bounded(
        entries in prop::collection::vec((1u32..5, 0usize..12, 0.0f32..1.0), 0..40),
        max_per_tier in 1usize..5,
    ) {
        let candidates = entries.iter().map(|(tier, i, score)| {
            let id = NodeId::new(NodeType::Skill, &format!("s{i}"));
            (*tier, TierSkill {
                label: id.key().to_string(),
                id,
                node_type: NodeType::Skill,
                score: *score,
                graph_score: *score,
                profile_affinity: None,
            })
        });

        let tiers = build_tiers(candidates, max_per_tier);

        let mut seen = HashSet::new();
        for tier in &tiers {
            prop_assert!(!tier.skills.is_empty());
            prop_assert!(tier.skills.len() <= max_per_tier);
            prop_assert!(tier.skills.windows(2).all(|w| w[0].score >= w[1].score));
            for skill in &tier.skills {
                prop_assert!(seen.insert(skill.id.clone()), "{} placed twice", skill.id);
            }
        }
        prop_assert!(tiers.windows(2).all(|w| w[0].tier_number < w[1].tier_number));
    }
}
