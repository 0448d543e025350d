//! Tree synthesis orchestration.
//!
//! ## Flow
//!
//! 1. Reject an empty subject
//! 2. Serve from cache when possible
//! 3. Take the per-key gate, so concurrent identical requests generate once,
//!    and re-check the cache
//! 4. Call the backend with bounded retries and linear backoff; backend and
//!    parse failures share the attempt budget
//! 5. Parse, repair, validate; a violation left after repair is terminal
//! 6. Cache the tree

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex as AsyncMutex, Semaphore};
use tracing::{debug, info, instrument, warn};

use crate::cache::{synthesis_key, CacheTier, TREE_NAMESPACE};
use crate::config::SynthesisConfig;
use crate::error::{Backend, KernelError, Result};
use crate::tree::{repair_with_report, validate, SchemaVariant};
use crate::types::{TypedTreeNode, UserProfile};

use super::backend::{GenerationBackend, ResponseFormat};
use super::prompt::build_prompt;

/// One synthesis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    /// Free-text subject.
    pub subject: String,
    /// Learner profile, if known.
    #[serde(default)]
    pub profile: Option<UserProfile>,
    /// Target schema.
    #[serde(default)]
    pub schema: SchemaVariant,
}

impl SynthesisRequest {
    /// Request for `subject` under the default schema.
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            profile: None,
            schema: SchemaVariant::default(),
        }
    }

    /// Attach a profile (builder style).
    pub fn with_profile(mut self, profile: UserProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Pick the schema (builder style).
    pub fn with_schema(mut self, schema: SchemaVariant) -> Self {
        self.schema = schema;
        self
    }

    /// Deterministic cache key. Empty profiles key like no profile.
    pub fn cache_key(&self) -> String {
        let fingerprint = self
            .profile
            .as_ref()
            .filter(|p| !p.is_empty())
            .map(UserProfile::fingerprint);
        synthesis_key(&self.subject, fingerprint.as_deref(), self.schema)
    }
}

/// A validated tree and how it was obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisOutcome {
    /// The tree; always satisfies the request schema.
    pub tree: TypedTreeNode,
    /// Key the tree is cached under.
    pub cache_key: String,
    /// Whether the tree came from cache.
    pub from_cache: bool,
    /// Generation attempts made by this call (0 when cached).
    pub attempts: u32,
    /// When the tree was generated.
    pub generated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct CachedTree {
    tree: TypedTreeNode,
    generated_at: DateTime<Utc>,
}

enum Failure {
    Backend(String),
    Parse(String),
}

type GateMap = Mutex<HashMap<String, Arc<AsyncMutex<()>>>>;

/// Per-key gate membership; the map entry goes away with its last holder.
struct FlightSlot<'a> {
    gates: &'a GateMap,
    key: String,
    gate: Arc<AsyncMutex<()>>,
}

impl<'a> FlightSlot<'a> {
    fn join(gates: &'a GateMap, key: &str) -> Self {
        let gate = Arc::clone(
            gates
                .lock()
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        );
        Self {
            gates,
            key: key.to_string(),
            gate,
        }
    }
}

impl Drop for FlightSlot<'_> {
    fn drop(&mut self) {
        let mut gates = self.gates.lock();
        let last = gates
            .get(&self.key)
            .map_or(false, |g| Arc::ptr_eq(g, &self.gate) && Arc::strong_count(g) <= 2);
        if last {
            gates.remove(&self.key);
        }
    }
}

/// Turns subjects into validated, cached trees.
pub struct TreeSynthesisOrchestrator {
    backend: Arc<dyn GenerationBackend>,
    cache: Arc<CacheTier>,
    config: SynthesisConfig,
    ttl: Duration,
    gates: GateMap,
}

impl TreeSynthesisOrchestrator {
    /// Create an orchestrator; `ttl` applies to cached trees.
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        cache: Arc<CacheTier>,
        config: SynthesisConfig,
        ttl: Duration,
    ) -> Self {
        Self {
            backend,
            cache,
            config,
            ttl,
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Requests currently holding or waiting on a gate.
    pub fn in_flight(&self) -> usize {
        self.gates.lock().len()
    }

    /// Produce a validated tree for `request`.
    #[instrument(skip_all, fields(subject = %request.subject, schema = %request.schema))]
    pub async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesisOutcome> {
        if request.subject.trim().is_empty() {
            return Err(KernelError::InvalidInput("subject must not be empty".into()));
        }

        let key = request.cache_key();
        if let Some(hit) = self.cached(&key, request.schema).await {
            return Ok(hit);
        }

        let slot = FlightSlot::join(&self.gates, &key);
        let _turn = slot.gate.lock().await;

        // A concurrent holder of the gate may have produced the tree meanwhile.
        if let Some(hit) = self.cached(&key, request.schema).await {
            return Ok(hit);
        }

        let (tree, attempts) = self.generate(request).await?;
        let generated_at = Utc::now();
        self.cache
            .set_json(
                &key,
                &CachedTree {
                    tree: tree.clone(),
                    generated_at,
                },
                self.ttl,
            )
            .await;

        info!(attempts, nodes = tree.node_count(), "Tree synthesized");
        Ok(SynthesisOutcome {
            tree,
            cache_key: key,
            from_cache: false,
            attempts,
            generated_at,
        })
    }

    /// Synthesize many requests with bounded concurrency.
    ///
    /// Returns one result per request, in input order; failures are isolated.
    pub async fn synthesize_many(&self, requests: &[SynthesisRequest]) -> Vec<Result<SynthesisOutcome>> {
        let semaphore = Semaphore::new(self.config.max_concurrency.max(1));
        let semaphore = &semaphore;

        let tasks = requests.iter().map(|request| async move {
            let _permit = semaphore.acquire().await.map_err(|e| KernelError::BackendUnavailable {
                backend: Backend::Generation,
                attempts: 0,
                message: e.to_string(),
            })?;
            self.synthesize(request).await
        });

        let results = join_all(tasks).await;
        debug!(
            total = results.len(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "Bulk synthesis finished"
        );
        results
    }

    /// Drop the cached tree for `request`.
    pub async fn invalidate(&self, request: &SynthesisRequest) {
        self.cache.delete(&request.cache_key()).await;
    }

    /// Drop every cached tree.
    pub async fn clear(&self) -> u64 {
        self.cache.clear_namespace(TREE_NAMESPACE).await
    }

    async fn cached(&self, key: &str, schema: SchemaVariant) -> Option<SynthesisOutcome> {
        let entry = self.cache.get_json::<CachedTree>(key).await?;
        if validate(&entry.tree, schema).is_err() {
            warn!(key, "Cached tree no longer valid, regenerating");
            self.cache.delete(key).await;
            return None;
        }
        debug!(key, "Tree served from cache");
        Some(SynthesisOutcome {
            tree: entry.tree,
            cache_key: key.to_string(),
            from_cache: true,
            attempts: 0,
            generated_at: entry.generated_at,
        })
    }

    async fn generate(&self, request: &SynthesisRequest) -> Result<(TypedTreeNode, u32)> {
        let schema = request.schema;
        let prompt = build_prompt(&request.subject, request.profile.as_ref(), schema);
        let format = ResponseFormat::for_schema(schema);
        let max_attempts = self.config.max_attempts.max(1);
        let backoff = Duration::from_millis(self.config.retry_backoff_ms);

        let mut last = Failure::Backend("no attempt made".into());
        for attempt in 1..=max_attempts {
            if attempt > 1 {
                tokio::time::sleep(backoff * (attempt - 1)).await;
            }

            let raw = match self.backend.complete(&prompt, &format).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(attempt, max_attempts, error = %e, "Generation failed");
                    last = Failure::Backend(e.to_string());
                    continue;
                }
            };

            let tree = match parse_tree(&raw) {
                Ok(tree) => tree,
                Err(message) => {
                    warn!(attempt, max_attempts, error = %message, "Generation output unparseable");
                    last = Failure::Parse(message);
                    continue;
                }
            };

            let (tree, report) = repair_with_report(&tree, schema);
            if !report.is_clean() {
                info!(coercions = report.coercions.len(), "Generated tree repaired");
            }
            validate(&tree, schema)?;
            return Ok((tree, attempt));
        }

        Err(match last {
            Failure::Backend(message) => KernelError::BackendUnavailable {
                backend: Backend::Generation,
                attempts: max_attempts,
                message,
            },
            Failure::Parse(message) => KernelError::Parse {
                attempts: max_attempts,
                message,
            },
        })
    }
}

/// Parse backend output into a tree.
///
/// Accepts a bare root node or a `{"tree": …}` wrapper, optionally inside a
/// markdown code fence.
pub fn parse_tree(raw: &str) -> std::result::Result<TypedTreeNode, String> {
    let body = strip_code_fence(raw.trim());
    let value: Value = serde_json::from_str(body).map_err(|e| e.to_string())?;

    let node = match value {
        Value::Object(mut map) if map.get("tree").map_or(false, Value::is_object) => {
            map.remove("tree").unwrap_or(Value::Null)
        }
        Value::Object(map) => Value::Object(map),
        other => return Err(format!("expected a JSON object, got {}", json_kind(&other))),
    };
    serde_json::from_value(node).map_err(|e| e.to_string())
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Skip the info string (`json`, ...) on the opening line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
