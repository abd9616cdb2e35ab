//! Derived index snapshots.
//!
//! A snapshot bundles everything one query needs: entry metadata, the TF-IDF
//! index, and optionally the embedding index, all built from a single corpus
//! read. Snapshots are immutable and shared as `Arc<IndexSnapshot>`; the
//! engine swaps the Arc on rebuild, so a query in flight keeps the version it
//! started with.

pub mod embedding;
pub mod lexical;

pub use embedding::EmbeddingIndex;
pub use lexical::LexicalIndex;

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::encoder::TextEncoder;
use crate::types::KnowledgeEntry;

#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    entries: HashMap<u64, KnowledgeEntry>,
    pub lexical: LexicalIndex,
    /// Absent when the engine runs lexical-only (encoder unavailable or
    /// disabled by strategy)
    pub embedding: Option<EmbeddingIndex>,
    /// Store version this snapshot was built from
    pub corpus_version: u64,
    pub built_at: DateTime<Utc>,
}

impl IndexSnapshot {
    /// A snapshot over nothing; every query against it escalates.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
            lexical: LexicalIndex::default(),
            embedding: None,
            corpus_version: 0,
            built_at: Utc::now(),
        }
    }

    /// Build both indices from one corpus read. The embedding side is built
    /// only when an encoder is supplied; an encoder failure here aborts the
    /// rebuild (the previous snapshot stays live), it never panics a query.
    pub fn build(
        corpus: Vec<KnowledgeEntry>,
        corpus_version: u64,
        encoder: Option<&dyn TextEncoder>,
    ) -> Result<Self> {
        let lexical = LexicalIndex::build(&corpus);
        let embedding = match encoder {
            Some(encoder) => Some(EmbeddingIndex::build(encoder, &corpus)?),
            None => None,
        };

        let entries = corpus.into_iter().map(|e| (e.id, e)).collect();

        Ok(Self {
            entries,
            lexical,
            embedding,
            corpus_version,
            built_at: Utc::now(),
        })
    }

    pub fn entry(&self, id: u64) -> Option<&KnowledgeEntry> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Candidate ids matching a category filter; `None` means unrestricted.
    /// An unknown category yields an empty set, which escalates downstream.
    pub fn candidates_for(&self, category_filter: Option<&str>) -> Option<HashSet<u64>> {
        category_filter.map(|category| {
            self.entries
                .values()
                .filter(|e| e.category == category)
                .map(|e| e.id)
                .collect()
        })
    }

    /// Tie-break key for equal combined scores: most recently updated first,
    /// then lowest id, for fully deterministic ordering.
    pub fn recency_key(&self, id: u64) -> (i64, u64) {
        let updated = self
            .entries
            .get(&id)
            .map(|e| e.updated_at.timestamp_millis())
            .unwrap_or(0);
        (updated, id)
    }
}
