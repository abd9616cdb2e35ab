//! Answer engine: the externally meaningful surface of the crate.
//!
//! Orchestrates the lexical and semantic branches over an immutable index
//! snapshot, merges them through the hybrid scorer, and applies the
//! escalation policy. Scoring failures degrade (empty branch, lexical-only
//! fallback); only malformed input is returned as an error.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::encoder::{BertEncoder, QueryVectorCache, TextEncoder};
use crate::errors::{EngineError, Result};
use crate::feedback::{FeedbackEvent, FeedbackLog};
use crate::index::IndexSnapshot;
use crate::policy::AnswerSelector;
use crate::scoring::{HybridScorer, ScoringStrategy};
use crate::store::DocumentStore;
use crate::types::{AnswerDecision, IndexStatus, Query, RebuildReport};

pub struct AnswerEngine {
    store: Arc<dyn DocumentStore>,
    encoder: Option<Arc<dyn TextEncoder>>,
    config: EngineConfig,
    selector: AnswerSelector,
    /// Current snapshot; readers clone the Arc, rebuild swaps it. The lock
    /// is held only for the clone or the pointer assignment.
    snapshot: RwLock<Arc<IndexSnapshot>>,
    query_cache: Arc<Mutex<QueryVectorCache>>,
    rebuild_in_flight: AtomicBool,
    feedback: Option<FeedbackLog>,
}

impl AnswerEngine {
    /// Create an engine over a store and an optional semantic encoder.
    /// Starts with an empty snapshot; call `rebuild_indices(true)` to load.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        encoder: Option<Arc<dyn TextEncoder>>,
        config: EngineConfig,
    ) -> Self {
        if encoder.is_none() && config.strategy != ScoringStrategy::Lexical {
            warn!("semantic encoder unavailable, degrading to lexical-only scoring");
        }
        let selector = AnswerSelector::from_config(&config);
        let query_cache = Arc::new(Mutex::new(QueryVectorCache::new(config.query_cache_size)));
        Self {
            store,
            encoder,
            config,
            selector,
            snapshot: RwLock::new(Arc::new(IndexSnapshot::empty())),
            query_cache,
            rebuild_in_flight: AtomicBool::new(false),
            feedback: None,
        }
    }

    /// Create an engine with the configured BERT encoder, falling back to
    /// lexical-only when the model fails to load. This is the one allowed
    /// graceful degradation: a model failure must never block questions.
    pub fn with_default_encoder(store: Arc<dyn DocumentStore>, config: EngineConfig) -> Self {
        let encoder: Option<Arc<dyn TextEncoder>> = if config.strategy == ScoringStrategy::Lexical
        {
            None
        } else {
            match BertEncoder::new(&config.model_id) {
                Ok(encoder) => Some(Arc::new(encoder)),
                Err(e) => {
                    warn!(model = %config.model_id, "failed to load semantic model: {e:#}");
                    None
                }
            }
        };
        Self::new(store, encoder, config)
    }

    /// Attach an append-only feedback log.
    pub fn with_feedback_log(mut self, log: FeedbackLog) -> Self {
        self.feedback = Some(log);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Effective lexical weight: forced to 1 when no encoder is present.
    fn effective_alpha(&self) -> f32 {
        if self.encoder.is_none() {
            1.0
        } else {
            self.config.effective_alpha()
        }
    }

    /// Answer a free-text legal question.
    ///
    /// Returns `MalformedQuery` for empty or non-text input; every other
    /// failure mode degrades into the decision itself (worst case:
    /// Escalate).
    pub async fn answer_question(
        self: &Arc<Self>,
        text: &str,
        category_filter: Option<String>,
        session_id: Option<String>,
    ) -> Result<AnswerDecision> {
        validate_query_text(text)?;
        let query = Query::new(text, category_filter, session_id);

        let snapshot = self.current_snapshot().await;
        self.maybe_trigger_rebuild(&snapshot).await;

        if snapshot.is_empty() {
            debug!("empty index, escalating");
            return Ok(AnswerDecision::escalate());
        }

        let allowed = snapshot.candidates_for(query.category_filter.as_deref());
        let timeout = Duration::from_millis(self.config.branch_timeout_ms);

        // Both branches are independent; run them concurrently, each under
        // a hard timeout. A timed-out or failed branch scores empty.
        let lexical_task = {
            let snapshot = Arc::clone(&snapshot);
            let text = query.normalized_text.clone();
            let allowed = allowed.clone();
            tokio::task::spawn_blocking(move || {
                snapshot.lexical.query_filtered(&text, allowed.as_ref())
            })
        };

        let semantic_task = {
            let snapshot = Arc::clone(&snapshot);
            let encoder = self.encoder.clone();
            let cache = Arc::clone(&self.query_cache);
            let text = query.normalized_text.clone();
            let allowed = allowed.clone();
            tokio::task::spawn_blocking(move || {
                semantic_branch(snapshot, encoder, cache, &text, allowed.as_ref())
            })
        };

        let (lexical_result, semantic_result) = tokio::join!(
            tokio::time::timeout(timeout, lexical_task),
            tokio::time::timeout(timeout, semantic_task),
        );

        let lexical_scores = match lexical_result {
            Ok(Ok(scores)) => scores,
            Ok(Err(e)) => {
                warn!("lexical branch panicked: {e}");
                HashMap::new()
            }
            Err(_) => {
                warn!("lexical branch timed out after {timeout:?}");
                HashMap::new()
            }
        };
        let semantic_scores = match semantic_result {
            Ok(Ok(scores)) => scores,
            Ok(Err(e)) => {
                warn!("semantic branch panicked: {e}");
                HashMap::new()
            }
            Err(_) => {
                warn!("semantic branch timed out after {timeout:?}");
                HashMap::new()
            }
        };

        let scorer = HybridScorer::new(self.effective_alpha());
        let candidates = scorer.score(&lexical_scores, &semantic_scores, &snapshot);
        let decision = self.selector.decide(candidates, &snapshot);

        debug!(
            session = query.session_id.as_deref().unwrap_or("-"),
            confidence = decision.confidence,
            candidates = decision.candidates.len(),
            escalated = decision.is_escalation(),
            "answered question"
        );
        Ok(decision)
    }

    /// Rebuild the derived indices from a fresh corpus snapshot.
    ///
    /// Idempotent and safe to call concurrently with queries: in-flight
    /// queries keep the snapshot they started with, and concurrent rebuild
    /// calls collapse into one.
    pub async fn rebuild_indices(&self, force: bool) -> Result<RebuildReport> {
        let current = self.current_snapshot().await;
        if !force && !self.is_stale(&current).await {
            return Ok(RebuildReport {
                entries_indexed: current.len(),
                build_duration_ms: 0,
                performed: false,
            });
        }

        if self.rebuild_in_flight.swap(true, Ordering::SeqCst) {
            debug!("rebuild already in flight, skipping");
            return Ok(RebuildReport {
                entries_indexed: current.len(),
                build_duration_ms: 0,
                performed: false,
            });
        }

        let result = self.rebuild_inner().await;
        self.rebuild_in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn rebuild_inner(&self) -> Result<RebuildReport> {
        let started = Instant::now();
        let corpus = self.store.active_entries().await?;
        if corpus.entries.is_empty() {
            // An empty corpus is not fatal here: swap in an empty snapshot so
            // queries escalate instead of serving stale answers forever.
            warn!("corpus has no active entries, indexing nothing");
        }

        let version = corpus.version;
        let encoder = match self.config.strategy {
            ScoringStrategy::Lexical => None,
            _ => self.encoder.clone(),
        };
        let entries = corpus.entries;
        let built = tokio::task::spawn_blocking(move || {
            IndexSnapshot::build(entries, version, encoder.as_deref())
        })
        .await
        .map_err(|e| EngineError::Store(format!("index build task failed: {e}")))?;

        let snapshot = match built {
            Ok(snapshot) => snapshot,
            Err(e) => {
                // Previous snapshot stays live; queries are unaffected.
                error!("index rebuild failed: {e:#}");
                return Err(e.into());
            }
        };

        let entries_indexed = snapshot.len();
        *self.snapshot.write().await = Arc::new(snapshot);

        let build_duration_ms = started.elapsed().as_millis() as u64;
        info!(entries_indexed, build_duration_ms, "index rebuilt");
        Ok(RebuildReport {
            entries_indexed,
            build_duration_ms,
            performed: true,
        })
    }

    /// Observability hook for the monitoring subsystem.
    pub async fn index_status(&self) -> IndexStatus {
        let snapshot = self.current_snapshot().await;
        let staleness_count = self
            .store
            .delta_since(snapshot.corpus_version)
            .await
            .unwrap_or(0);
        IndexStatus {
            entries_indexed: snapshot.len(),
            last_build_time: (snapshot.len() > 0 || snapshot.corpus_version > 0)
                .then_some(snapshot.built_at),
            staleness_count,
            semantic_enabled: snapshot.embedding.is_some(),
        }
    }

    /// Record answer acceptance for offline weight tuning. Failures are
    /// logged, never propagated.
    pub fn record_feedback(&self, session_id: Option<String>, entry_id: u64, accepted: bool) {
        if let Some(log) = &self.feedback {
            let event = FeedbackEvent::new(session_id, entry_id, accepted);
            if let Err(e) = log.record(&event) {
                warn!("failed to record feedback event: {e}");
            }
        }
    }

    async fn current_snapshot(&self) -> Arc<IndexSnapshot> {
        self.snapshot.read().await.clone()
    }

    async fn is_stale(&self, snapshot: &IndexSnapshot) -> bool {
        let delta = match self.store.delta_since(snapshot.corpus_version).await {
            Ok(delta) => delta,
            Err(e) => {
                warn!("store delta check failed: {e}");
                0
            }
        };
        if delta >= self.config.rebuild_delta_threshold && delta > 0 {
            return true;
        }
        let age = Utc::now() - snapshot.built_at;
        age.num_seconds() >= self.config.rebuild_max_age_secs as i64 && delta > 0
    }

    /// Kick off a background rebuild when the snapshot is overdue; the
    /// current query proceeds against the existing snapshot.
    async fn maybe_trigger_rebuild(self: &Arc<Self>, snapshot: &IndexSnapshot) {
        if !self.is_stale(snapshot).await {
            return;
        }
        warn!(
            version = snapshot.corpus_version,
            "index is stale, scheduling background rebuild"
        );
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = engine.rebuild_indices(false).await {
                error!("background rebuild failed: {e}");
            }
        });
    }
}

/// Reject empty or non-text input at the boundary, before any scoring.
fn validate_query_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(EngineError::MalformedQuery {
            reason: "query text is empty".to_string(),
        });
    }
    if !text.chars().any(|c| c.is_alphanumeric()) {
        return Err(EngineError::MalformedQuery {
            reason: "query contains no letters or digits".to_string(),
        });
    }
    Ok(())
}

/// Semantic branch body: cached query encoding plus embedding-index scoring.
fn semantic_branch(
    snapshot: Arc<IndexSnapshot>,
    encoder: Option<Arc<dyn TextEncoder>>,
    cache: Arc<Mutex<QueryVectorCache>>,
    normalized_text: &str,
    allowed: Option<&std::collections::HashSet<u64>>,
) -> HashMap<u64, f32> {
    let (Some(encoder), Some(embedding)) = (encoder, snapshot.embedding.as_ref()) else {
        return HashMap::new();
    };

    let cached = cache
        .lock()
        .ok()
        .and_then(|mut cache| cache.get(normalized_text));

    let query_vec = match cached {
        Some(vec) => vec,
        None => match encoder.encode(normalized_text) {
            Ok(vec) => {
                if let Ok(mut cache) = cache.lock() {
                    cache.put(normalized_text.to_string(), vec.clone());
                }
                vec
            }
            Err(e) => {
                warn!("query encoding failed, skipping semantic branch: {e:#}");
                return HashMap::new();
            }
        },
    };

    embedding.query(&query_vec, allowed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryDocumentStore;
    use crate::types::{Decision, KnowledgeEntry};
    use std::collections::BTreeSet;
    use anyhow::Result as AnyResult;

    /// Deterministic bag-of-characters encoder; close enough to rank
    /// character-overlapping Chinese questions sensibly.
    struct StubEncoder;

    impl TextEncoder for StubEncoder {
        fn encode(&self, text: &str) -> AnyResult<Vec<f32>> {
            let mut v = vec![0.0f32; 64];
            for c in text.chars().filter(|c| c.is_alphanumeric()) {
                v[(c as usize) % 64] += 1.0;
            }
            Ok(v)
        }

        fn encode_batch(&self, texts: &[&str]) -> AnyResult<Vec<Vec<f32>>> {
            texts.iter().map(|t| self.encode(t)).collect()
        }

        fn dimension(&self) -> usize {
            64
        }
    }

    /// Encoder that always fails; exercises the degradation paths.
    struct FailingEncoder;

    impl TextEncoder for FailingEncoder {
        fn encode(&self, _text: &str) -> AnyResult<Vec<f32>> {
            anyhow::bail!("model crashed")
        }

        fn encode_batch(&self, _texts: &[&str]) -> AnyResult<Vec<Vec<f32>>> {
            anyhow::bail!("model crashed")
        }

        fn dimension(&self) -> usize {
            64
        }
    }

    fn entry(id: u64, question: &str, answer: &str, category: &str) -> KnowledgeEntry {
        KnowledgeEntry {
            id,
            question_text: question.to_string(),
            answer_text: answer.to_string(),
            category: category.to_string(),
            tags: BTreeSet::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            active: true,
        }
    }

    async fn legal_store() -> Arc<InMemoryDocumentStore> {
        Arc::new(
            InMemoryDocumentStore::seed(vec![
                entry(
                    1,
                    "劳动合同纠纷如何处理",
                    "合同违约的，先与用人单位协商，协商不成可申请劳动仲裁。",
                    "labor_dispute",
                ),
                entry(
                    2,
                    "合同违约责任",
                    "违约方应当承担继续履行、赔偿损失等责任。",
                    "contract_consultation",
                ),
                entry(
                    3,
                    "离婚财产分割",
                    "夫妻共同财产原则上均等分割。",
                    "marriage_family",
                ),
            ])
            .await,
        )
    }

    async fn hybrid_engine() -> Arc<AnswerEngine> {
        let store = legal_store().await;
        let engine = Arc::new(AnswerEngine::new(
            store,
            Some(Arc::new(StubEncoder)),
            EngineConfig::default(),
        ));
        engine.rebuild_indices(true).await.unwrap();
        engine
    }

    #[tokio::test]
    async fn test_malformed_query_rejected() {
        let engine = hybrid_engine().await;
        assert!(matches!(
            engine.answer_question("", None, None).await,
            Err(EngineError::MalformedQuery { .. })
        ));
        assert!(matches!(
            engine.answer_question("   ", None, None).await,
            Err(EngineError::MalformedQuery { .. })
        ));
        assert!(matches!(
            engine.answer_question("？！。", None, None).await,
            Err(EngineError::MalformedQuery { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_corpus_escalates() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let engine = Arc::new(AnswerEngine::new(
            store,
            Some(Arc::new(StubEncoder)),
            EngineConfig::default(),
        ));
        engine.rebuild_indices(true).await.unwrap();

        let decision = engine
            .answer_question("劳动合同纠纷", None, None)
            .await
            .unwrap();
        assert!(decision.is_escalation());
        assert!(decision.candidates.is_empty());
    }

    #[tokio::test]
    async fn test_labor_question_ranks_labor_entry_first() {
        let engine = hybrid_engine().await;
        let decision = engine
            .answer_question("劳动合同违约怎么办", None, None)
            .await
            .unwrap();

        assert!(!decision.candidates.is_empty());
        assert_eq!(decision.candidates[0].entry_id, 1);
        match &decision.decision {
            Decision::AutoAnswer { entry } => assert_eq!(entry.id, 1),
            Decision::Suggest { entries } => assert_eq!(entries[0].id, 1),
            Decision::Escalate => panic!("should not escalate a close match"),
        }
    }

    #[tokio::test]
    async fn test_stop_word_query_without_encoder_escalates() {
        let store = legal_store().await;
        let engine = Arc::new(AnswerEngine::new(store, None, EngineConfig::default()));
        engine.rebuild_indices(true).await.unwrap();

        let decision = engine.answer_question("的了吗", None, None).await.unwrap();
        assert!(decision.is_escalation());
        assert!(decision
            .candidates
            .iter()
            .all(|c| c.combined_score == 0.0));
    }

    #[tokio::test]
    async fn test_encoder_failure_degrades_not_errors() {
        let store = legal_store().await;
        let engine = Arc::new(AnswerEngine::new(
            store,
            Some(Arc::new(FailingEncoder)),
            EngineConfig::default(),
        ));
        // Embedding build fails; rebuild surfaces the error to the admin
        // caller but the engine keeps serving from its previous snapshot.
        assert!(engine.rebuild_indices(true).await.is_err());

        let decision = engine
            .answer_question("劳动合同纠纷", None, None)
            .await
            .unwrap();
        assert!(decision.is_escalation()); // still the empty snapshot
    }

    #[tokio::test]
    async fn test_lexical_only_engine_answers() {
        let store = legal_store().await;
        let engine = Arc::new(AnswerEngine::new(store, None, EngineConfig::default()));
        engine.rebuild_indices(true).await.unwrap();

        let decision = engine
            .answer_question("劳动合同纠纷如何处理", None, None)
            .await
            .unwrap();
        assert!(!decision.is_escalation());
        assert_eq!(decision.candidates[0].entry_id, 1);
        // Semantic side contributed nothing
        assert!(decision.candidates.iter().all(|c| c.semantic_score == 0.0));
    }

    #[tokio::test]
    async fn test_category_filter_restricts_candidates() {
        let engine = hybrid_engine().await;
        let decision = engine
            .answer_question(
                "合同违约责任",
                Some("contract_consultation".to_string()),
                None,
            )
            .await
            .unwrap();
        assert!(decision.candidates.iter().all(|c| c.entry_id == 2));
    }

    #[tokio::test]
    async fn test_unknown_category_escalates() {
        let engine = hybrid_engine().await;
        let decision = engine
            .answer_question("合同违约", Some("maritime_law".to_string()), None)
            .await
            .unwrap();
        assert!(decision.is_escalation());
    }

    #[tokio::test]
    async fn test_repeated_query_is_idempotent() {
        let engine = hybrid_engine().await;
        let a = engine
            .answer_question("劳动合同违约怎么办", None, None)
            .await
            .unwrap();
        let b = engine
            .answer_question("劳动合同违约怎么办", None, None)
            .await
            .unwrap();
        assert_eq!(a.candidates, b.candidates);
        assert_eq!(a.confidence, b.confidence);
        assert_eq!(
            std::mem::discriminant(&a.decision),
            std::mem::discriminant(&b.decision)
        );
    }

    #[tokio::test]
    async fn test_snapshot_isolation_until_rebuild() {
        let store = legal_store().await;
        let engine = Arc::new(AnswerEngine::new(
            Arc::clone(&store) as Arc<dyn DocumentStore>,
            Some(Arc::new(StubEncoder)),
            EngineConfig::default(),
        ));
        engine.rebuild_indices(true).await.unwrap();

        let before = engine
            .answer_question("劳动合同违约怎么办", None, None)
            .await
            .unwrap();

        // Corpus changes, but below the rebuild delta threshold: queries
        // keep seeing the old snapshot.
        store
            .upsert(entry(
                4,
                "劳动合同违约怎么办",
                "与本问题完全一致的新条目。",
                "labor_dispute",
            ))
            .await;

        let after = engine
            .answer_question("劳动合同违约怎么办", None, None)
            .await
            .unwrap();
        assert_eq!(before.candidates, after.candidates);

        engine.rebuild_indices(true).await.unwrap();
        let rebuilt = engine
            .answer_question("劳动合同违约怎么办", None, None)
            .await
            .unwrap();
        assert_eq!(rebuilt.candidates[0].entry_id, 4);
    }

    #[tokio::test]
    async fn test_rebuild_is_idempotent_when_fresh() {
        let engine = hybrid_engine().await;
        let report = engine.rebuild_indices(false).await.unwrap();
        assert!(!report.performed);
        assert_eq!(report.entries_indexed, 3);

        let forced = engine.rebuild_indices(true).await.unwrap();
        assert!(forced.performed);
        assert_eq!(forced.entries_indexed, 3);
    }

    #[tokio::test]
    async fn test_index_status() {
        let store = legal_store().await;
        let engine = Arc::new(AnswerEngine::new(
            Arc::clone(&store) as Arc<dyn DocumentStore>,
            Some(Arc::new(StubEncoder)),
            EngineConfig::default(),
        ));
        engine.rebuild_indices(true).await.unwrap();

        let status = engine.index_status().await;
        assert_eq!(status.entries_indexed, 3);
        assert_eq!(status.staleness_count, 0);
        assert!(status.semantic_enabled);
        assert!(status.last_build_time.is_some());

        store.deactivate(3).await;
        let status = engine.index_status().await;
        assert_eq!(status.staleness_count, 1);
    }

    #[tokio::test]
    async fn test_confidence_bound_with_multiple_candidates() {
        let engine = hybrid_engine().await;
        let decision = engine
            .answer_question("合同纠纷", None, None)
            .await
            .unwrap();
        if decision.candidates.len() >= 2 {
            assert!(decision.confidence > 0.0);
            assert!(decision.confidence <= 1.0);
        }
    }

    #[tokio::test]
    async fn test_feedback_recording() {
        let dir = tempfile::TempDir::new().unwrap();
        let log_path = dir.path().join("feedback.jsonl");
        let store = legal_store().await;
        let engine = Arc::new(
            AnswerEngine::new(store, None, EngineConfig::default())
                .with_feedback_log(FeedbackLog::new(&log_path)),
        );

        engine.record_feedback(Some("s1".to_string()), 1, true);
        engine.record_feedback(None, 2, false);

        let events = FeedbackLog::new(&log_path).read_all().unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_validate_query_text() {
        assert!(validate_query_text("合同").is_ok());
        assert!(validate_query_text("contract law").is_ok());
        assert!(validate_query_text("").is_err());
        assert!(validate_query_text("！！？？").is_err());
    }
}
