//! Embedding-driven exploration.
//!
//! Glues the graph path together: embedding → diverse anchors → best
//! `max_anchors` → bounded traversal, with results cached per
//! {quantized embedding, request parameters, scoring strategy}.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::anchor::{sort_anchors, Anchor, AnchorDiscovery, InMemoryNeighborIndex};
use crate::cache::{exploration_key, CacheTier, EXPLORE_NAMESPACE, PROGRESSION_NAMESPACE};
use crate::canonical::{canonical_hash_hex, quantize_float, quantize_vector};
use crate::config::{KernelConfig, ProgressionConfig};
use crate::error::Result;
use crate::policy::TraversalPolicy;
use crate::progression::CareerProgressionAggregator;
use crate::similarity::{build_scorer, MemoizedScorer, NodeEncoder, SimilarityScorer};
use crate::store::{GraphStore, InMemoryGraphStore, LoadedGraph};
use crate::traversal::GraphTraversalEngine;
use crate::types::{Tier, TraversalResult};

/// Parameters of one exploration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExploreRequest {
    /// Anchors requested per node type.
    pub per_type_k: usize,
    /// Minimum anchor similarity.
    pub anchor_min_similarity: f32,
    /// Anchors handed to the traversal.
    pub max_anchors: usize,
    /// Traversal bounds.
    pub policy: TraversalPolicy,
}

#[derive(Serialize)]
struct ExploreParams<'a> {
    policy: &'a str,
    per_type_k: usize,
    anchor_min_similarity: i64,
    max_anchors: usize,
}

#[derive(Serialize)]
struct ProgressionParams {
    per_type_k: usize,
    anchor_min_similarity: i64,
    alpha: i64,
    expansion_width: usize,
    depth: u32,
    max_skills_per_tier: usize,
    min_similarity: i64,
    node_cap: usize,
    user: Option<Vec<i64>>,
}

impl ExploreRequest {
    /// Request built from the configured defaults.
    pub fn from_config(config: &KernelConfig) -> Self {
        Self {
            per_type_k: config.anchors.per_type_k,
            anchor_min_similarity: config.anchors.min_similarity,
            max_anchors: config.anchors.max_anchors,
            policy: config.traversal.clone(),
        }
    }

    /// Hash of every parameter that changes the result.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(&ExploreParams {
            policy: &self.policy.params_hash(),
            per_type_k: self.per_type_k,
            anchor_min_similarity: quantize_float(self.anchor_min_similarity),
            max_anchors: self.max_anchors,
        })
    }
}

impl Default for ExploreRequest {
    fn default() -> Self {
        Self::from_config(&KernelConfig::default())
    }
}

/// Entry point for graph-path requests.
pub struct GraphExplorer<G: GraphStore + ?Sized> {
    discovery: AnchorDiscovery,
    engine: Arc<GraphTraversalEngine<G>>,
    aggregator: CareerProgressionAggregator<G>,
    cache: Arc<CacheTier>,
    anchor_defaults: ExploreRequest,
    ttl: Duration,
}

impl<G: GraphStore + ?Sized> GraphExplorer<G> {
    /// Assemble an explorer from its parts.
    ///
    /// `defaults` supplies the anchor settings used by
    /// [`explore_progression`](Self::explore_progression).
    pub fn new(
        discovery: AnchorDiscovery,
        engine: Arc<GraphTraversalEngine<G>>,
        progression: ProgressionConfig,
        cache: Arc<CacheTier>,
        defaults: ExploreRequest,
        ttl: Duration,
    ) -> Self {
        let aggregator = CareerProgressionAggregator::new(Arc::clone(&engine), progression)
            .with_node_cap(defaults.policy.node_cap);
        Self {
            discovery,
            engine,
            aggregator,
            cache,
            anchor_defaults: defaults,
            ttl,
        }
    }

    /// Traversal engine in use.
    pub fn engine(&self) -> &GraphTraversalEngine<G> {
        &self.engine
    }

    /// Shared cache handle.
    pub fn cache(&self) -> &Arc<CacheTier> {
        &self.cache
    }

    /// Subgraph around the best anchors for `embedding`.
    ///
    /// No qualifying anchors (including a degraded index) gives an empty
    /// result; empty results are not cached.
    #[instrument(skip_all, fields(max_anchors = request.max_anchors, depth = request.policy.max_depth))]
    pub async fn explore(&self, embedding: &[f32], request: &ExploreRequest) -> Result<TraversalResult> {
        self.discovery.check_embedding(embedding)?;
        request.policy.validate()?;

        let key = exploration_key(EXPLORE_NAMESPACE, embedding, &request.params_hash(), self.engine.strategy());
        if let Some(cached) = self.cache.get_json::<TraversalResult>(&key).await {
            debug!(nodes = cached.len(), "Exploration served from cache");
            return Ok(cached);
        }

        let anchors = self
            .best_anchors(embedding, request.per_type_k, request.anchor_min_similarity, request.max_anchors)
            .await?;
        if anchors.is_empty() {
            debug!("No anchors, empty exploration");
            return Ok(TraversalResult::empty());
        }

        let ids: Vec<_> = anchors.into_iter().map(|a| a.id).collect();
        let result = self.engine.traverse(&ids, &request.policy);

        if !result.is_empty() {
            self.cache.set_json(&key, &result, self.ttl).await;
        }
        Ok(result)
    }

    /// Progression tiers from the single best anchor for `embedding`.
    ///
    /// `user_vector` personalizes the ranking and is part of the cache key.
    #[instrument(skip_all, fields(personalized = user_vector.is_some()))]
    pub async fn explore_progression(&self, embedding: &[f32], user_vector: Option<&[f32]>) -> Result<Vec<Tier>> {
        self.discovery.check_embedding(embedding)?;
        if let Some(user) = user_vector {
            self.engine.nodes().check_query(user)?;
        }

        let key = exploration_key(
            PROGRESSION_NAMESPACE,
            embedding,
            &self.progression_params_hash(user_vector),
            self.engine.strategy(),
        );
        if let Some(cached) = self.cache.get_json::<Vec<Tier>>(&key).await {
            debug!(tiers = cached.len(), "Progression served from cache");
            return Ok(cached);
        }

        let defaults = &self.anchor_defaults;
        let seed = match self
            .best_anchors(embedding, defaults.per_type_k, defaults.anchor_min_similarity, 1)
            .await?
            .into_iter()
            .next()
        {
            Some(anchor) => anchor,
            None => return Ok(Vec::new()),
        };

        debug!(seed = %seed.id, score = seed.score, "Progression seed chosen");
        let tiers = self.aggregator.extract_default(&seed.id, user_vector)?;

        if !tiers.is_empty() {
            self.cache.set_json(&key, &tiers, self.ttl).await;
        }
        Ok(tiers)
    }

    async fn best_anchors(
        &self,
        embedding: &[f32],
        per_type_k: usize,
        min_similarity: f32,
        max_anchors: usize,
    ) -> Result<Vec<Anchor>> {
        let mut anchors: Vec<Anchor> = self
            .discovery
            .find_diverse_anchors(embedding, per_type_k, min_similarity)
            .await?
            .into_values()
            .flatten()
            .collect();
        sort_anchors(&mut anchors);
        anchors.dedup_by(|a, b| a.id == b.id);
        anchors.truncate(max_anchors);
        Ok(anchors)
    }

    fn progression_params_hash(&self, user_vector: Option<&[f32]>) -> String {
        let p = self.aggregator.config();
        canonical_hash_hex(&ProgressionParams {
            per_type_k: self.anchor_defaults.per_type_k,
            anchor_min_similarity: quantize_float(self.anchor_defaults.anchor_min_similarity),
            alpha: quantize_float(p.alpha),
            expansion_width: p.expansion_width,
            depth: p.depth,
            max_skills_per_tier: p.max_skills_per_tier,
            min_similarity: quantize_float(p.min_similarity),
            node_cap: self.anchor_defaults.policy.node_cap,
            user: user_vector.map(quantize_vector),
        })
    }
}

impl GraphExplorer<InMemoryGraphStore> {
    /// Wire a loaded graph with the in-memory neighbor index.
    ///
    /// Picks the scoring strategy once, memoizing pair scores when
    /// `similarity_memo_capacity` is non-zero.
    pub fn from_loaded(loaded: &LoadedGraph, config: &KernelConfig, cache: Arc<CacheTier>) -> Self {
        let encoder = loaded.encoder.clone().map(|e| e as Arc<dyn NodeEncoder>);
        let mut scorer = build_scorer(Arc::clone(&loaded.nodes), Arc::clone(&loaded.graph), encoder);
        if config.similarity_memo_capacity > 0 {
            scorer = Arc::new(MemoizedScorer::new(scorer, config.similarity_memo_capacity)) as Arc<dyn SimilarityScorer>;
        }

        let engine = GraphTraversalEngine::new(Arc::clone(&loaded.nodes), Arc::clone(&loaded.graph), scorer);
        let index = InMemoryNeighborIndex::new(Arc::clone(&loaded.nodes));
        let discovery = AnchorDiscovery::new(Arc::new(index), loaded.nodes.dimension());

        info!(
            nodes = loaded.nodes.len(),
            edges = loaded.graph.num_edges(),
            strategy = %engine.strategy(),
            "Graph explorer ready"
        );

        Self::new(
            discovery,
            Arc::new(engine),
            config.progression.clone(),
            cache,
            ExploreRequest::from_config(config),
            Duration::from_secs(config.cache.exploration_ttl_secs),
        )
    }
}
