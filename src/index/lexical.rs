//! TF-IDF lexical index.
//!
//! A rebuildable sparse vector space over the active corpus. Build produces
//! per-entry term weights with precomputed norms; query scores candidates by
//! cosine similarity against the same weighting. Zero-norm vectors (empty or
//! all-stop-word text) score 0 instead of erroring.

use std::collections::{HashMap, HashSet};

use crate::text;
use crate::types::KnowledgeEntry;

/// Question terms are counted more heavily than answer terms: the question
/// is the retrieval key, the answer is supporting context.
const QUESTION_TERM_WEIGHT: usize = 3;

#[derive(Debug, Clone)]
struct DocVector {
    weights: HashMap<String, f32>,
    norm: f32,
}

/// Immutable TF-IDF vector space over one corpus snapshot.
#[derive(Debug, Clone, Default)]
pub struct LexicalIndex {
    /// term -> document frequency
    vocabulary: HashMap<String, u32>,
    docs: HashMap<u64, DocVector>,
    doc_count: usize,
}

impl LexicalIndex {
    /// Build the index from active entries. Entries whose text tokenizes to
    /// nothing still get a (zero-norm) vector so they remain known ids.
    pub fn build(corpus: &[KnowledgeEntry]) -> Self {
        let doc_count = corpus.len();

        // Pass 1: term counts per document and document frequencies.
        let mut term_counts: Vec<(u64, HashMap<String, usize>)> = Vec::with_capacity(doc_count);
        let mut vocabulary: HashMap<String, u32> = HashMap::new();

        for entry in corpus {
            let mut counts: HashMap<String, usize> = HashMap::new();
            for term in text::terms(&entry.question_text) {
                *counts.entry(term).or_insert(0) += QUESTION_TERM_WEIGHT;
            }
            for term in text::terms(&entry.answer_text) {
                *counts.entry(term).or_insert(0) += 1;
            }
            for term in counts.keys() {
                *vocabulary.entry(term.clone()).or_insert(0) += 1;
            }
            term_counts.push((entry.id, counts));
        }

        // Pass 2: TF-IDF weights and norms.
        let mut docs = HashMap::with_capacity(doc_count);
        for (id, counts) in term_counts {
            let total: usize = counts.values().sum();
            let mut weights = HashMap::with_capacity(counts.len());
            if total > 0 {
                for (term, count) in counts {
                    let idf = idf(doc_count, vocabulary[&term]);
                    let tf = count as f32 / total as f32;
                    weights.insert(term, tf * idf);
                }
            }
            let norm = norm_of(&weights);
            docs.insert(id, DocVector { weights, norm });
        }

        Self {
            vocabulary,
            docs,
            doc_count,
        }
    }

    /// Score every indexed entry against the query text. Entries with no
    /// overlapping terms are omitted; the scorer treats absence as 0.
    pub fn query(&self, text: &str) -> HashMap<u64, f32> {
        self.query_filtered(text, None)
    }

    /// Same as `query`, restricted to an allowed candidate set when present.
    /// The category filter is applied here, before scoring, not after.
    pub fn query_filtered(
        &self,
        query_text: &str,
        allowed: Option<&HashSet<u64>>,
    ) -> HashMap<u64, f32> {
        let query_vec = self.vectorize_query(query_text);
        let query_norm = norm_of(&query_vec);
        if query_norm == 0.0 {
            return HashMap::new();
        }

        let mut scores = HashMap::new();
        for (id, doc) in &self.docs {
            if let Some(allowed) = allowed {
                if !allowed.contains(id) {
                    continue;
                }
            }
            if doc.norm == 0.0 {
                continue;
            }
            let mut dot = 0.0f32;
            for (term, weight) in &query_vec {
                if let Some(doc_weight) = doc.weights.get(term) {
                    dot += weight * doc_weight;
                }
            }
            if dot > 0.0 {
                scores.insert(*id, dot / (query_norm * doc.norm));
            }
        }
        scores
    }

    /// Represent the query in the index's vector space.
    fn vectorize_query(&self, query_text: &str) -> HashMap<String, f32> {
        let terms = text::terms(query_text);
        if terms.is_empty() {
            return HashMap::new();
        }
        let total = terms.len();
        let mut counts: HashMap<String, usize> = HashMap::new();
        for term in terms {
            *counts.entry(term).or_insert(0) += 1;
        }

        let mut weights = HashMap::with_capacity(counts.len());
        for (term, count) in counts {
            // Terms unseen in the corpus contribute nothing to any dot
            // product, so they are dropped here.
            if let Some(df) = self.vocabulary.get(&term) {
                let tf = count as f32 / total as f32;
                weights.insert(term, tf * idf(self.doc_count, *df));
            }
        }
        weights
    }

    pub fn len(&self) -> usize {
        self.doc_count
    }

    pub fn is_empty(&self) -> bool {
        self.doc_count == 0
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }
}

fn idf(doc_count: usize, df: u32) -> f32 {
    if df == 0 {
        return 0.0;
    }
    (1.0 + doc_count as f32 / df as f32).ln()
}

fn norm_of(weights: &HashMap<String, f32>) -> f32 {
    weights.values().map(|w| w * w).sum::<f32>().sqrt()
}
