//! Per-session dialog memory.
//!
//! `DialogMemory` is the only mutable thing the engine touches. It is owned by
//! the caller (or the session store) and handed to the engine for exactly one
//! turn at a time. It serializes to a JSON snapshot so hosts can park it
//! between requests.

use crate::directive::Tone;
use crate::error::{EngineError, Result};
use crate::scenario::NodeId;
use crate::slot::{LegalDomain, SlotKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

// ── Entities ────────────────────────────────────────────────────────────────

/// Typed span categories the entity extractor knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Person,
    Organization,
    TimeDuration,
    Location,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Person,
        EntityKind::Organization,
        EntityKind::TimeDuration,
        EntityKind::Location,
    ];
}

/// Extracted entities. A kind with no matches is absent, never empty.
pub type EntityMap = BTreeMap<EntityKind, Vec<String>>;

// ── Sentiment ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

/// Keyword hit counts per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SentimentScores {
    pub positive: u32,
    pub negative: u32,
    pub neutral: u32,
}

/// Dominant sentiment plus the per-category scores it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SentimentReading {
    pub label: Sentiment,
    pub scores: SentimentScores,
}

// ── Turns ───────────────────────────────────────────────────────────────────

/// One recorded turn. Immutable once appended, except for the system
/// response which may be written exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogTurn {
    pub user_input: String,

    /// Intent held at the end of this turn.
    pub intent: Option<NodeId>,

    pub timestamp: DateTime<Utc>,

    pub sentiment: Sentiment,

    #[serde(default)]
    pub entities: EntityMap,

    /// Slot keys filled at the time the turn was recorded.
    #[serde(default)]
    pub filled_slots: Vec<SlotKey>,

    /// The system's reply to this turn, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl DialogTurn {
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            intent: None,
            timestamp: Utc::now(),
            sentiment: Sentiment::Neutral,
            entities: EntityMap::new(),
            filled_slots: Vec::new(),
            response: None,
        }
    }

    /// Input and response joined, as scanned by history-based slot resolution.
    pub fn transcript(&self) -> String {
        match &self.response {
            Some(response) => format!("{} {}", self.user_input, response),
            None => self.user_input.clone(),
        }
    }
}

// ── Derived state ───────────────────────────────────────────────────────────

/// Where the conversation stands with respect to the active intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogPhase {
    #[default]
    NoIntent,
    IntentHypothesis,
    SlotCollecting,
    ReadyToAnswer,
}

impl DialogPhase {
    /// Pure transition function over the tracker's slot accounting.
    pub fn derive(intent_held: bool, required_filled: usize, required_missing: usize) -> Self {
        if !intent_held {
            DialogPhase::NoIntent
        } else if required_missing == 0 {
            DialogPhase::ReadyToAnswer
        } else if required_filled == 0 {
            DialogPhase::IntentHypothesis
        } else {
            DialogPhase::SlotCollecting
        }
    }
}

/// Snapshot produced by the state tracker at the end of every turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogState {
    pub phase: DialogPhase,
    pub intent: Option<NodeId>,
    pub domain: Option<LegalDomain>,
    pub filled_slots: Vec<SlotKey>,
    pub missing_slots: Vec<SlotKey>,
    pub optional_slots: Vec<SlotKey>,
    pub filled_optional_slots: Vec<SlotKey>,
    pub missing_optional_slots: Vec<SlotKey>,
    pub tone: Tone,
    pub turn_count: u32,
    pub updated_at: DateTime<Utc>,
}

impl Default for DialogState {
    fn default() -> Self {
        Self {
            phase: DialogPhase::NoIntent,
            intent: None,
            domain: None,
            filled_slots: Vec::new(),
            missing_slots: Vec::new(),
            optional_slots: Vec::new(),
            filled_optional_slots: Vec::new(),
            missing_optional_slots: Vec::new(),
            tone: Tone::Professional,
            turn_count: 0,
            updated_at: Utc::now(),
        }
    }
}

// ── Memory ──────────────────────────────────────────────────────────────────

/// The per-session mutable record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogMemory {
    pub filled_slots: BTreeMap<SlotKey, String>,
    pub active_intent: Option<NodeId>,
    pub intent_confidence: f32,
    pub sentiment: SentimentReading,
    pub entities: EntityMap,
    pub turn_history: VecDeque<DialogTurn>,
    pub pending_slot: Option<SlotKey>,
    pub ask_count: u32,
    pub dialog_state: DialogState,

    /// Turns processed over the life of the session (not capped).
    pub turn_count: u32,

    pub last_active: DateTime<Utc>,
}

impl Default for DialogMemory {
    fn default() -> Self {
        Self {
            filled_slots: BTreeMap::new(),
            active_intent: None,
            intent_confidence: 0.0,
            sentiment: SentimentReading::default(),
            entities: EntityMap::new(),
            turn_history: VecDeque::new(),
            pending_slot: None,
            ask_count: 0,
            dialog_state: DialogState::default(),
            turn_count: 0,
            last_active: Utc::now(),
        }
    }
}

impl DialogMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore memory from a JSON snapshot.
    ///
    /// This is the one failure surfaced to callers: on error they should
    /// start a fresh memory.
    pub fn from_snapshot(json: &str) -> std::result::Result<Self, EngineError> {
        serde_json::from_str(json).map_err(|e| EngineError::MalformedSnapshot(e.to_string()))
    }

    pub fn to_snapshot(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn slot(&self, key: SlotKey) -> Option<&str> {
        self.filled_slots.get(&key).map(String::as_str)
    }

    pub fn has_slot(&self, key: SlotKey) -> bool {
        self.filled_slots.contains_key(&key)
    }

    /// The domain recorded in the shared domain slot, if it parses.
    pub fn domain_slot(&self) -> Option<LegalDomain> {
        self.slot(SlotKey::LegalDomain).and_then(LegalDomain::parse)
    }

    /// Append a turn, evicting the oldest once `max` is exceeded.
    pub fn push_turn(&mut self, turn: DialogTurn, max: usize) {
        self.turn_history.push_back(turn);
        while self.turn_history.len() > max.max(1) {
            self.turn_history.pop_front();
        }
    }

    /// Write the system response into the latest turn. Returns `false` if it
    /// already has one or there is no turn yet.
    pub fn record_response(&mut self, response: impl Into<String>) -> bool {
        match self.turn_history.back_mut() {
            Some(turn) if turn.response.is_none() => {
                turn.response = Some(response.into());
                true
            }
            _ => false,
        }
    }

    /// The last `n` recorded system responses, oldest first.
    pub fn recent_responses(&self, n: usize) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .turn_history
            .iter()
            .rev()
            .filter_map(|t| t.response.as_deref())
            .take(n)
            .collect();
        out.reverse();
        out
    }

    /// Drop the held intent and anything being asked for it.
    pub fn clear_intent(&mut self) {
        self.active_intent = None;
        self.intent_confidence = 0.0;
        self.pending_slot = None;
    }

    /// Forget everything collected for the current topic.
    pub fn reset_topic(&mut self) {
        self.filled_slots.clear();
        self.clear_intent();
        self.ask_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_follows_slot_accounting() {
        assert_eq!(DialogPhase::derive(false, 3, 0), DialogPhase::NoIntent);
        assert_eq!(DialogPhase::derive(true, 0, 2), DialogPhase::IntentHypothesis);
        assert_eq!(DialogPhase::derive(true, 1, 2), DialogPhase::SlotCollecting);
        assert_eq!(DialogPhase::derive(true, 3, 0), DialogPhase::ReadyToAnswer);
        assert_eq!(DialogPhase::derive(true, 0, 0), DialogPhase::ReadyToAnswer);
    }

    #[test]
    fn history_is_capped_fifo() {
        let mut memory = DialogMemory::new();
        for i in 0..15 {
            memory.push_turn(DialogTurn::new(format!("turn {i}")), 10);
            assert!(memory.turn_history.len() <= 10);
        }
        assert_eq!(memory.turn_history.front().unwrap().user_input, "turn 5");
        assert_eq!(memory.turn_history.back().unwrap().user_input, "turn 14");
    }

    #[test]
    fn response_is_write_once() {
        let mut memory = DialogMemory::new();
        assert!(!memory.record_response("too early"));
        memory.push_turn(DialogTurn::new("我被辞退了"), 10);
        assert!(memory.record_response("请问您的用人单位是？"));
        assert!(!memory.record_response("second write"));
        assert_eq!(memory.recent_responses(3), vec!["请问您的用人单位是？"]);
    }

    #[test]
    fn snapshot_round_trips_typed_slots() {
        let mut memory = DialogMemory::new();
        memory.filled_slots.insert(SlotKey::LegalDomain, "labor".into());
        memory.filled_slots.insert(SlotKey::Employer, "华南公司".into());
        memory.active_intent = Some(NodeId::new("legal_node2"));
        memory.entities.insert(EntityKind::Organization, vec!["华南公司".into()]);

        let json = memory.to_snapshot().unwrap();
        let restored = DialogMemory::from_snapshot(&json).unwrap();
        assert_eq!(restored.slot(SlotKey::Employer), Some("华南公司"));
        assert_eq!(restored.domain_slot(), Some(LegalDomain::Labor));
        assert_eq!(restored.entities, memory.entities);
    }

    #[test]
    fn malformed_snapshot_is_rejected() {
        let err = DialogMemory::from_snapshot("{\"filled_slots\": 7}").unwrap_err();
        assert!(matches!(err, EngineError::MalformedSnapshot(_)));
        assert!(DialogMemory::from_snapshot("not json").is_err());
    }

    #[test]
    fn partial_snapshot_fills_defaults() {
        let memory = DialogMemory::from_snapshot("{\"ask_count\": 1}").unwrap();
        assert_eq!(memory.ask_count, 1);
        assert!(memory.filled_slots.is_empty());
    }

    #[test]
    fn reset_topic_clears_counters() {
        let mut memory = DialogMemory::new();
        memory.filled_slots.insert(SlotKey::MarriageIssue, "divorce".into());
        memory.active_intent = Some(NodeId::new("legal_node3"));
        memory.pending_slot = Some(SlotKey::MarriageDuration);
        memory.ask_count = 2;
        memory.reset_topic();
        assert!(memory.filled_slots.is_empty());
        assert!(memory.active_intent.is_none());
        assert!(memory.pending_slot.is_none());
        assert_eq!(memory.ask_count, 0);
    }
}
