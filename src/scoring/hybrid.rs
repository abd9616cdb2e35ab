//! Hybrid score merging.
//!
//! Blends the lexical and semantic score maps into one ranked candidate
//! list. A candidate present on only one side gets 0 for the missing side,
//! never exclusion. Ordering is fully deterministic: combined score
//! descending, then `updated_at` descending, then id ascending.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::index::IndexSnapshot;
use crate::types::ScoredCandidate;

pub struct HybridScorer {
    alpha: f32,
}

impl HybridScorer {
    /// `alpha` is the lexical weight; it is clamped into [0, 1].
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Merge both score maps into a ranked candidate list.
    pub fn score(
        &self,
        lexical: &HashMap<u64, f32>,
        semantic: &HashMap<u64, f32>,
        snapshot: &IndexSnapshot,
    ) -> Vec<ScoredCandidate> {
        let ids: HashSet<u64> = lexical.keys().chain(semantic.keys()).copied().collect();

        let mut candidates: Vec<ScoredCandidate> = ids
            .into_iter()
            .map(|id| {
                let lexical_score = lexical.get(&id).copied().unwrap_or(0.0);
                let semantic_score = semantic.get(&id).copied().unwrap_or(0.0);
                let combined_score =
                    self.alpha * lexical_score + (1.0 - self.alpha) * semantic_score;
                ScoredCandidate {
                    entry_id: id,
                    lexical_score,
                    semantic_score,
                    combined_score,
                    rank: 0,
                }
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.combined_score
                .partial_cmp(&a.combined_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| {
                    let (a_updated, _) = snapshot.recency_key(a.entry_id);
                    let (b_updated, _) = snapshot.recency_key(b.entry_id);
                    b_updated
                        .cmp(&a_updated)
                        .then(a.entry_id.cmp(&b.entry_id))
                })
        });

        for (rank, candidate) in candidates.iter_mut().enumerate() {
            candidate.rank = rank;
        }
        candidates
    }

    /// Normalized confidence for the top candidate.
    ///
    /// `top / (top + second)` when a second candidate exists, else the top
    /// combined score itself. Near-ties are penalized toward 0.5; a clear
    /// winner approaches 1.
    pub fn confidence(candidates: &[ScoredCandidate]) -> f32 {
        match candidates {
            [] => 0.0,
            [only] => only.combined_score.clamp(0.0, 1.0),
            [top, second, ..] => {
                let denominator = top.combined_score + second.combined_score;
                if denominator <= 0.0 {
                    0.0
                } else {
                    top.combined_score / denominator
                }
            }
        }
    }
}
