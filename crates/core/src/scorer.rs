//! Scoring capabilities used by intent classification.
//!
//! The engine never cares whether similarity comes from TF-IDF, an embedding
//! model or a test script. It only needs "text A vs text B → [0,1]". Calls
//! are synchronous; a backend that does I/O is expected to block or fail.

use crate::error::ScorerError;
use crate::scenario::{DomainNode, NodeId};
use serde::{Deserialize, Serialize};

/// Splits text into scoring tokens.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Pairwise text similarity.
pub trait Scorer: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Similarity of `a` and `b`, in `[0, 1]`.
    fn similarity(&self, a: &str, b: &str) -> Result<f32, ScorerError>;
}

/// Scorer that knows nothing. Every pair scores 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullScorer;

impl Scorer for NullScorer {
    fn name(&self) -> &str {
        "null"
    }

    fn similarity(&self, _a: &str, _b: &str) -> Result<f32, ScorerError> {
        Ok(0.0)
    }
}

/// A supervised model's guess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentPrediction {
    pub node: NodeId,
    pub score: f32,
}

/// A dedicated intent classifier trained on scenario data.
///
/// When it answers with a score at or above the confidence threshold its
/// prediction replaces the similarity search.
pub trait IntentModel: Send + Sync {
    fn name(&self) -> &str;

    fn predict(
        &self,
        text: &str,
        candidates: &[&DomainNode],
    ) -> Result<Option<IntentPrediction>, ScorerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_scorer_scores_zero() {
        let scorer = NullScorer;
        assert_eq!(scorer.similarity("我被辞退了", "我被辞退了").unwrap(), 0.0);
        assert_eq!(scorer.name(), "null");
    }
}
