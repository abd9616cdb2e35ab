//! Core data types shared across the retrieval engine.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored question/answer unit in the legal knowledge base.
///
/// Owned by the document store; the engine only reads snapshots and never
/// mutates entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    /// Stable identifier
    pub id: u64,
    /// The question this entry answers
    pub question_text: String,
    /// The canonical answer text
    pub answer_text: String,
    /// Legal category (e.g. "labor_dispute", "contract_consultation")
    pub category: String,
    /// Free-form tags
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Inactive entries are excluded from every index build
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Entries are equal when their stable ids are equal; content revisions do
/// not change identity.
impl PartialEq for KnowledgeEntry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// Ephemeral per-request query value.
#[derive(Debug, Clone)]
pub struct Query {
    /// Raw text as received from the messaging layer
    pub raw_text: String,
    /// Lowercased, whitespace-collapsed text used for caching and tokenizing
    pub normalized_text: String,
    /// Restrict candidates to this category before scoring
    pub category_filter: Option<String>,
    /// Session identifier, carried for logging and feedback only
    pub session_id: Option<String>,
}

impl Query {
    /// Build a query from raw text, normalizing it once up front.
    pub fn new(
        raw_text: impl Into<String>,
        category_filter: Option<String>,
        session_id: Option<String>,
    ) -> Self {
        let raw_text = raw_text.into();
        let normalized_text = crate::text::normalize(&raw_text);
        Self {
            raw_text,
            normalized_text,
            category_filter,
            session_id,
        }
    }
}

/// One ranked candidate produced by the hybrid scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub entry_id: u64,
    /// TF-IDF cosine similarity in [0, 1]
    pub lexical_score: f32,
    /// Embedding cosine similarity rescaled to [0, 1]
    pub semantic_score: f32,
    /// alpha * lexical + (1 - alpha) * semantic
    pub combined_score: f32,
    /// Position in the final ordering, starting at 0
    pub rank: usize,
}

/// Terminal decision for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decision {
    /// Confident single match; answer automatically
    AutoAnswer { entry: KnowledgeEntry },
    /// Plausible matches; present them for the user to pick from
    Suggest { entries: Vec<KnowledgeEntry> },
    /// No confident match; a human agent must respond
    Escalate,
}

/// Decision plus the evidence it was made from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerDecision {
    pub decision: Decision,
    /// Normalized confidence of the top candidate, 0 when no candidates
    pub confidence: f32,
    /// Full scored candidate list, descending by combined score
    pub candidates: Vec<ScoredCandidate>,
}

impl AnswerDecision {
    pub fn escalate() -> Self {
        Self {
            decision: Decision::Escalate,
            confidence: 0.0,
            candidates: Vec::new(),
        }
    }

    pub fn is_escalation(&self) -> bool {
        matches!(self.decision, Decision::Escalate)
    }
}

/// Observability snapshot returned by `AnswerEngine::index_status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStatus {
    pub entries_indexed: usize,
    pub last_build_time: Option<DateTime<Utc>>,
    /// Corpus mutations since the snapshot was built
    pub staleness_count: u64,
    /// Whether the semantic side of the index is present
    pub semantic_enabled: bool,
}

/// Result of an administrative index rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebuildReport {
    pub entries_indexed: usize,
    pub build_duration_ms: u64,
    /// False when another rebuild was already in flight and this call
    /// returned without doing work
    pub performed: bool,
}
