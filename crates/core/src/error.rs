//! Error types for the Slotwise domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator boundary has its own error enum; almost all of them are
//! logged and degraded inside the engine rather than surfaced to the caller.

use thiserror::Error;

/// The top-level error type for all Slotwise operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Scorer errors ---
    #[error("Scorer error: {0}")]
    Scorer(#[from] ScorerError),

    // --- Retrieval errors ---
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    // --- Generation errors ---
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    // --- Engine errors ---
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ScorerError {
    #[error("Scorer unavailable: {0}")]
    Unavailable(String),

    #[error("Scoring failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("Retriever unavailable: {0}")]
    Unavailable(String),

    #[error("Retrieval query failed: {0}")]
    QueryFailed(String),
}

#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("Generator unavailable: {0}")]
    Unavailable(String),

    #[error("Generation failed: {0}")]
    Failed(String),
}

/// Errors the engine surfaces to its caller.
///
/// Everything else (bad config, unavailable scorer, malformed patterns)
/// degrades to a safe default inside the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Dialog memory snapshot could not be restored: {0}")]
    MalformedSnapshot(String),

    #[error("Turn rejected: utterance is empty")]
    EmptyUtterance,

    #[error("Unknown session: {0}")]
    UnknownSession(String),
}
