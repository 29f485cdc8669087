//! What the engine tells its caller to do after a turn.

use crate::retrieval::Snippet;
use crate::scenario::NodeId;
use crate::slot::{LegalDomain, SlotKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Response framing forwarded to the generation collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tone {
    #[default]
    #[serde(rename = "professional")]
    Professional,
    #[serde(rename = "empathy")]
    Empathetic,
    #[serde(rename = "friendly_advisory")]
    FriendlyAdvisory,
    #[serde(rename = "summarize_solution")]
    SummarizeAndSolve,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Empathetic => "empathy",
            Tone::FriendlyAdvisory => "friendly_advisory",
            Tone::SummarizeAndSolve => "summarize_solution",
        }
    }
}

/// Why slot collection was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BypassReason {
    /// The utterance asks for a statute, article or definition.
    DirectQuery,
    /// The user asked to stop being questioned.
    SkipRequested,
    /// The ask-count cap for the current intent was reached.
    AskLimit,
}

/// Structured payload handed to answer generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactSummary {
    pub domain: Option<LegalDomain>,
    pub intent: Option<NodeId>,
    pub slots: BTreeMap<SlotKey, String>,

    /// The raw utterance of this turn.
    pub utterance: String,

    /// The question to answer. Differs from `utterance` when the user asked
    /// to skip questions and an earlier utterance carries the real question.
    pub query: String,

    pub tone: Tone,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bypass: Option<BypassReason>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub snippets: Vec<Snippet>,
}

impl FactSummary {
    /// Render the labelled facts and the question as a prompt body.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        if let Some(domain) = self.domain {
            let _ = writeln!(out, "法律领域：{}", domain.label());
        }
        for (key, value) in &self.slots {
            if *key == SlotKey::LegalDomain {
                continue;
            }
            let _ = writeln!(out, "{}：{}", key.label(), value);
        }
        if !self.snippets.is_empty() {
            out.push_str("参考资料：\n");
            for (i, snippet) in self.snippets.iter().enumerate() {
                let _ = writeln!(out, "{}. [{}] {}", i + 1, snippet.source, snippet.text);
            }
        }
        let _ = write!(out, "用户问题：{}", self.query);
        out
    }
}

/// The outcome of a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Directive {
    /// Ask the user for one slot.
    Ask { slot: SlotKey, prompt: String },
    /// Hand off to answer generation.
    Proceed { summary: FactSummary },
    /// Greeting short-circuit; no intent held.
    Greet,
    /// The utterance is outside every supported domain.
    Decline,
}

impl Directive {
    pub fn is_ask(&self) -> bool {
        matches!(self, Directive::Ask { .. })
    }

    pub fn is_proceed(&self) -> bool {
        matches!(self, Directive::Proceed { .. })
    }
}

/// A problem detected by the state tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Conflict {
    /// A filled slot belonged to another domain and was purged.
    SlotContamination {
        slot: SlotKey,
        value: String,
        owner: LegalDomain,
        active: LegalDomain,
    },
    /// Two consecutive recorded responses were identical.
    RepeatedResponse { response: String },
}
