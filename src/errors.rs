//! Error types for the lexdesk retrieval engine.
//!
//! Scoring-stage failures are absorbed into degraded behavior (empty score
//! maps, lexical-only fallback) and never reach the caller; only boundary
//! errors such as malformed input are surfaced.

use thiserror::Error;

/// Main error type for the retrieval engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Empty or non-text input rejected at the boundary
    #[error("Malformed query: {reason}")]
    MalformedQuery { reason: String },

    /// Semantic model failed to load or initialize
    #[error("Semantic encoder unavailable: {0}")]
    EncoderUnavailable(String),

    /// Document store boundary errors
    #[error("Document store error: {0}")]
    Store(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Convert anyhow errors from the encoder/model layer
impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        EngineError::EncoderUnavailable(err.to_string())
    }
}
