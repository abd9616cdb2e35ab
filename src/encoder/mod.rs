//! Semantic encoder boundary.
//!
//! `TextEncoder` is the seam between the engine and whatever embedding model
//! backs it; `BertEncoder` is the production implementation. Tests substitute
//! a deterministic stub. The per-process query-vector cache lives here too:
//! it is a pure optimization and safe to drop at any time.

mod bert;

pub use bert::BertEncoder;

use std::collections::HashMap;
use std::collections::VecDeque;

use anyhow::Result;

/// Text -> fixed-dimension dense vector. Implementations are stateless given
/// the model and must truncate over-long input rather than fail.
pub trait TextEncoder: Send + Sync {
    /// Encode a single text (queries)
    fn encode(&self, text: &str) -> Result<Vec<f32>>;

    /// Encode many texts at once (corpus builds)
    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Output dimensionality, fixed per model
    fn dimension(&self) -> usize;
}

/// Bounded LRU cache of normalized query text -> embedding vector.
///
/// Keeps repeated questions within a session from re-running the model.
/// Local to the process, no cross-process coordination.
pub struct QueryVectorCache {
    capacity: usize,
    vectors: HashMap<String, Vec<f32>>,
    recency: VecDeque<String>,
}

impl QueryVectorCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            vectors: HashMap::new(),
            recency: VecDeque::new(),
        }
    }

    /// Look up a vector, marking the key most recently used on hit.
    pub fn get(&mut self, key: &str) -> Option<Vec<f32>> {
        if !self.vectors.contains_key(key) {
            return None;
        }
        self.touch(key);
        self.vectors.get(key).cloned()
    }

    /// Insert a vector, evicting the least recently used entry when full.
    pub fn put(&mut self, key: String, vector: Vec<f32>) {
        if self.capacity == 0 {
            return;
        }
        if self.vectors.insert(key.clone(), vector).is_some() {
            self.touch(&key);
            return;
        }
        self.recency.push_back(key);
        while self.vectors.len() > self.capacity {
            if let Some(oldest) = self.recency.pop_front() {
                self.vectors.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            self.recency.remove(pos);
            self.recency.push_back(key.to_string());
        }
    }
}

/// Cosine similarity between two equal-length vectors. Zero-norm input
/// yields 0, never NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
