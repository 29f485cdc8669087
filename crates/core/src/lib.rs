//! # Slotwise Core
//!
//! Domain types, collaborator traits, and error definitions for the Slotwise
//! dialog-state engine. Nothing in here makes a decision about a turn; it only
//! describes what a turn looks like and what the engine may call out to.
//!
//! ## Design Philosophy
//!
//! Every external capability (similarity scoring, supervised intent models,
//! retrieval, answer generation) is a trait here. Implementations live in
//! their respective crates or in the host application. This enables:
//! - Swapping a lexical scorer for an embedding scorer without touching the engine
//! - Easy testing with scripted scorers and models
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod slot;
pub mod scenario;
pub mod memory;
pub mod directive;
pub mod scorer;
pub mod retrieval;
pub mod responder;

// Re-export key types at crate root for ergonomics
pub use error::{EngineError, Error, GenerationError, Result, RetrievalError, ScorerError};
pub use slot::{KeywordGroup, LegalDomain, SlotDefinition, SlotKey, SlotMatcher};
pub use scenario::{DomainAction, DomainNode, NodeId};
pub use memory::{
    DialogMemory, DialogPhase, DialogState, DialogTurn, EntityKind, EntityMap, Sentiment,
    SentimentReading, SentimentScores,
};
pub use directive::{BypassReason, Conflict, Directive, FactSummary, Tone};
pub use scorer::{IntentModel, IntentPrediction, NullScorer, Scorer, Tokenizer};
pub use retrieval::{NoRetriever, Retriever, Snippet};
pub use responder::Responder;
