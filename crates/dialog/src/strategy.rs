//! Questioning policy: when to stop asking, and in what tone to answer.

use slotwise_config::{DialogConfig, Lexicon};
use slotwise_core::{BypassReason, DialogMemory, Sentiment, Tone};
use std::sync::Arc;

/// A decision to skip slot collection this turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bypass {
    pub reason: BypassReason,
    /// The question to answer instead of asking.
    pub query: String,
}

pub struct DialogStrategy {
    lexicon: Arc<Lexicon>,
    max_slot_asks: u32,
    long_conversation_turns: u32,
}

impl DialogStrategy {
    pub fn new(lexicon: Arc<Lexicon>, config: &DialogConfig) -> Self {
        Self {
            lexicon,
            max_slot_asks: config.max_slot_asks,
            long_conversation_turns: config.long_conversation_turns,
        }
    }

    pub fn max_slot_asks(&self) -> u32 {
        self.max_slot_asks
    }

    /// Response framing from the latest sentiment; long conversations
    /// always get summarize-and-solve.
    pub fn tone(&self, memory: &DialogMemory) -> Tone {
        if memory.turn_count > self.long_conversation_turns {
            return Tone::SummarizeAndSolve;
        }
        match memory.sentiment.label {
            Sentiment::Negative => Tone::Empathetic,
            Sentiment::Positive => Tone::FriendlyAdvisory,
            Sentiment::Neutral => Tone::Professional,
        }
    }

    /// Whether to skip asking, checked in priority order: a direct
    /// knowledge query, an explicit skip request, then the ask cap (which
    /// only matters while a slot is pending).
    pub fn bypass(&self, text: &str, memory: &DialogMemory) -> Option<Bypass> {
        if self.lexicon.is_direct_query(text) {
            return Some(Bypass {
                reason: BypassReason::DirectQuery,
                query: text.to_string(),
            });
        }
        if self.lexicon.is_skip_request(text) {
            return Some(Bypass {
                reason: BypassReason::SkipRequested,
                query: self.last_real_question(memory).unwrap_or_else(|| text.to_string()),
            });
        }
        if memory.pending_slot.is_some() && memory.ask_count >= self.max_slot_asks {
            return Some(Bypass {
                reason: BypassReason::AskLimit,
                query: text.to_string(),
            });
        }
        None
    }

    /// The newest recorded utterance that is not itself a skip request and
    /// is long enough to be a question.
    fn last_real_question(&self, memory: &DialogMemory) -> Option<String> {
        memory
            .turn_history
            .iter()
            .rev()
            .map(|t| t.user_input.trim())
            .find(|input| input.chars().count() > 2 && !self.lexicon.is_skip_request(input))
            .map(String::from)
    }
}
