//! Error types for the Prism service.
//!
//! One unified error enum covers every error category in the workspace.
//! Retrieval- and ranking-layer failures are absorbed into deterministic
//! fallbacks wherever one exists; only contract violations (malformed input)
//! and glue-layer failures propagate to callers.

use thiserror::Error;

/// Unified error type for Prism.
///
/// All fallible functions in the workspace return `Result<T, PrismError>`.
/// We never panic; errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum PrismError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Corpus loading and validation errors
    #[error("Corpus error: {0}")]
    Corpus(String),

    /// A candidate crossed the ranking boundary with an unusable required
    /// field. This is a caller contract violation and fails fast.
    #[error("malformed candidate: invalid field `{field}`")]
    MalformedCandidate {
        /// Name of the offending field
        field: &'static str,
    },

    /// No trained ranking model could be loaded. The ranking layer absorbs
    /// this into deterministic fallback scoring; it surfaces only in logs.
    #[error("ranking model unavailable: {0}")]
    ModelUnavailable(String),

    /// Too few labeled interactions to train the ranking model.
    #[error("insufficient training data: {have} labeled interactions, need at least {need}")]
    TrainingDataInsufficient {
        /// Labeled interactions found
        have: usize,
        /// Configured minimum
        need: usize,
    },

    /// Embedding provider errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// HTTP server errors
    #[error("Server error: {0}")]
    Server(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for PrismError {
    fn from(err: serde_json::Error) -> Self {
        PrismError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for PrismError {
    fn from(err: serde_yaml::Error) -> Self {
        PrismError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with PrismError.
pub type PrismResult<T> = Result<T, PrismError>;
