//! LexDesk - Hybrid knowledge retrieval and answer ranking engine
//!
//! Answers customer-service questions for a legal knowledge base by blending
//! TF-IDF lexical retrieval with BERT embedding similarity, then deciding per
//! query whether to answer automatically, suggest candidates, or escalate to
//! a human agent.
//!
//! # Architecture
//!
//! - **Store**: versioned corpus reads behind the `DocumentStore` trait
//! - **Index**: immutable `IndexSnapshot` (TF-IDF + embeddings), swapped
//!   atomically on rebuild
//! - **Scoring**: hybrid blend with deterministic ordering and a confidence
//!   measure
//! - **Policy**: threshold-driven AutoAnswer / Suggest / Escalate selection

pub mod cli;
pub mod config;
pub mod encoder;
pub mod engine;
pub mod errors;
pub mod feedback;
pub mod index;
pub mod policy;
pub mod scoring;
pub mod store;
pub mod text;
pub mod types;

// Re-export the types a typical embedding host needs
pub use config::EngineConfig;
pub use engine::AnswerEngine;
pub use errors::{EngineError, Result};
pub use scoring::ScoringStrategy;
pub use store::{DocumentStore, InMemoryDocumentStore};
pub use types::{AnswerDecision, Decision, KnowledgeEntry, ScoredCandidate};
