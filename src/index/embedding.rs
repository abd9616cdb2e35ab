//! Dense embedding index.
//!
//! Maps each entry id to a fixed-dimension vector produced by the semantic
//! encoder. Scores are cosine similarity rescaled from [-1, 1] to [0, 1] so
//! the hybrid scorer can blend them with lexical scores directly.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};

use crate::encoder::{cosine_similarity, TextEncoder};
use crate::types::KnowledgeEntry;

#[derive(Debug, Clone, Default)]
pub struct EmbeddingIndex {
    vectors: HashMap<u64, Vec<f32>>,
    dimension: usize,
}

impl EmbeddingIndex {
    /// Batch-encode the corpus questions. One model invocation per build,
    /// not per entry.
    pub fn build(encoder: &dyn TextEncoder, corpus: &[KnowledgeEntry]) -> Result<Self> {
        let texts: Vec<&str> = corpus.iter().map(|e| e.question_text.as_str()).collect();
        let embeddings = encoder
            .encode_batch(&texts)
            .context("Failed to encode corpus")?;

        let vectors = corpus
            .iter()
            .map(|e| e.id)
            .zip(embeddings.into_iter())
            .collect();

        Ok(Self {
            vectors,
            dimension: encoder.dimension(),
        })
    }

    /// Score all entries (or the allowed subset) against an encoded query.
    pub fn query(&self, query_vec: &[f32], allowed: Option<&HashSet<u64>>) -> HashMap<u64, f32> {
        let mut scores = HashMap::new();
        for (id, vector) in &self.vectors {
            if let Some(allowed) = allowed {
                if !allowed.contains(id) {
                    continue;
                }
            }
            let cosine = cosine_similarity(query_vec, vector);
            scores.insert(*id, (cosine + 1.0) / 2.0);
        }
        scores
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}
