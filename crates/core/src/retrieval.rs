//! Retrieval collaborator: supplies reference snippets for a fact summary.

use crate::error::RetrievalError;
use serde::{Deserialize, Serialize};

/// One retrieved reference passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    /// Where the passage came from (statute, case, FAQ entry).
    pub source: String,
    pub score: f32,
    pub text: String,
}

/// Top-K passage lookup.
pub trait Retriever: Send + Sync {
    fn name(&self) -> &str;

    fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Snippet>, RetrievalError>;
}

/// Retriever used when none is configured. Always returns nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetriever;

impl Retriever for NoRetriever {
    fn name(&self) -> &str {
        "none"
    }

    fn retrieve(&self, _query: &str, _top_k: usize) -> Result<Vec<Snippet>, RetrievalError> {
        Ok(Vec::new())
    }
}
