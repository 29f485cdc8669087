//! Responder trait: the answer-generation collaborator.
//!
//! A Responder turns a fact summary into prose. It may be a template, a
//! language-model call or a human in the loop; the engine only logs whatever
//! string comes back.

use async_trait::async_trait;

use crate::directive::FactSummary;
use crate::error::GenerationError;

#[async_trait]
pub trait Responder: Send + Sync {
    /// Responder name for logs.
    fn name(&self) -> &str;

    async fn respond(&self, summary: &FactSummary) -> Result<String, GenerationError>;
}
