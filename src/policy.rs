//! Answer selection and escalation policy.
//!
//! Terminal per-request state machine: a scored candidate list becomes
//! exactly one of AutoAnswer, Suggest, or Escalate. All thresholds come from
//! configuration; when nothing clears them the policy fails safe toward
//! human review.

use crate::config::EngineConfig;
use crate::index::IndexSnapshot;
use crate::scoring::HybridScorer;
use crate::types::{AnswerDecision, Decision, ScoredCandidate};

#[derive(Debug, Clone)]
pub struct AnswerSelector {
    auto_threshold: f32,
    suggest_threshold: f32,
    min_absolute_score: f32,
    top_k: usize,
}

impl AnswerSelector {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            auto_threshold: config.auto_threshold,
            suggest_threshold: config.suggest_threshold,
            min_absolute_score: config.min_absolute_score,
            // A Suggest decision always carries at least one entry
            top_k: config.top_k_suggestions.max(1),
        }
    }

    /// Apply the transition rule to a ranked candidate list.
    pub fn decide(
        &self,
        candidates: Vec<ScoredCandidate>,
        snapshot: &IndexSnapshot,
    ) -> AnswerDecision {
        let top = match candidates.first() {
            Some(top) if top.combined_score > 0.0 => top.clone(),
            _ => {
                // No candidates, or nothing scored above zero
                return AnswerDecision {
                    decision: Decision::Escalate,
                    confidence: 0.0,
                    candidates,
                };
            }
        };

        let confidence = HybridScorer::confidence(&candidates);

        if confidence >= self.auto_threshold && top.combined_score >= self.min_absolute_score {
            if let Some(entry) = snapshot.entry(top.entry_id) {
                return AnswerDecision {
                    decision: Decision::AutoAnswer {
                        entry: entry.clone(),
                    },
                    confidence,
                    candidates,
                };
            }
            // Candidate id missing from the snapshot means the score maps
            // and metadata disagree; treat as no confident match.
            return AnswerDecision {
                decision: Decision::Escalate,
                confidence,
                candidates,
            };
        }

        if top.combined_score >= self.suggest_threshold {
            let entries = candidates
                .iter()
                .filter(|c| c.combined_score > 0.0)
                .take(self.top_k)
                .filter_map(|c| snapshot.entry(c.entry_id).cloned())
                .collect::<Vec<_>>();
            if !entries.is_empty() {
                return AnswerDecision {
                    decision: Decision::Suggest { entries },
                    confidence,
                    candidates,
                };
            }
        }

        AnswerDecision {
            decision: Decision::Escalate,
            confidence,
            candidates,
        }
    }
}
