//! Scoring strategies.
//!
//! A small closed set of interchangeable strategies behind one scorer,
//! selected by configuration. There is no runtime type inspection; the
//! strategy only decides the effective blend weight.

pub mod hybrid;

pub use hybrid::HybridScorer;

use serde::{Deserialize, Serialize};

/// Which similarity sides participate in ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScoringStrategy {
    /// TF-IDF only (alpha forced to 1)
    Lexical,
    /// Embeddings only (alpha forced to 0)
    Semantic,
    /// Weighted blend of both
    #[default]
    Hybrid,
}
