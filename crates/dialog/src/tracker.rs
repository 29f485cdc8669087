//! Dialog state tracking.
//!
//! Runs once per turn after slot filling: purges slots that belong to a
//! domain the conversation is no longer in, flags repeated system responses,
//! records the turn, and derives the next slot to ask for.

use chrono::Utc;
use slotwise_config::{DialogConfig, OptionalSlotPolicy, SlotDependencyGraph};
use slotwise_core::{
    Conflict, DialogMemory, DialogPhase, DialogState, DialogTurn, DomainNode, EntityMap,
    LegalDomain, Sentiment, SlotKey, Tone,
};

/// One turn's input to the tracker.
pub struct TrackRequest<'a> {
    pub text: &'a str,
    pub node: Option<&'a DomainNode>,
    pub sentiment: Sentiment,
    pub entities: &'a EntityMap,
    pub tone: Tone,
}

pub struct DialogStateTracker {
    dependencies: SlotDependencyGraph,
    config: DialogConfig,
}

impl DialogStateTracker {
    pub fn new(dependencies: SlotDependencyGraph, config: DialogConfig) -> Self {
        Self {
            dependencies,
            config,
        }
    }

    pub fn dependencies(&self) -> &SlotDependencyGraph {
        &self.dependencies
    }

    /// Slots that must be filled before answering. With a known domain these
    /// are the domain's slots the node lists, in priority order; a node
    /// without a domain requires its own list.
    pub fn required_slots(node: &DomainNode, domain: Option<LegalDomain>) -> Vec<SlotKey> {
        match domain {
            Some(domain) => domain
                .slots()
                .iter()
                .copied()
                .filter(|k| node.has_slot(*k))
                .collect(),
            None => node.slots.clone(),
        }
    }

    /// Record the turn and recompute `pending_slot` and `dialog_state`.
    /// Returns the conflicts found before the turn was committed.
    pub fn track(&self, memory: &mut DialogMemory, request: TrackRequest<'_>) -> Vec<Conflict> {
        let domain = request
            .node
            .and_then(|n| n.domain())
            .or_else(|| memory.domain_slot());

        let mut conflicts = Vec::new();
        if let Some(active) = domain {
            conflicts.extend(purge_contamination(memory, active));
        }
        if let Some(conflict) = repeated_response(memory) {
            tracing::warn!("Repeated system response detected");
            conflicts.push(conflict);
        }

        let mut turn = DialogTurn::new(request.text);
        turn.intent = request.node.map(|n| n.id.clone());
        turn.sentiment = request.sentiment;
        turn.entities = request.entities.clone();
        turn.filled_slots = memory.filled_slots.keys().copied().collect();
        memory.push_turn(turn, self.config.max_history);

        let state = self.derive_state(memory, request.node, domain, request.tone);
        memory.pending_slot = state.pending;
        memory.dialog_state = state.snapshot;
        conflicts
    }

    fn derive_state(
        &self,
        memory: &DialogMemory,
        node: Option<&DomainNode>,
        domain: Option<LegalDomain>,
        tone: Tone,
    ) -> Derived {
        let is_filled = |k: SlotKey| memory.has_slot(k);

        let required = node
            .map(|n| Self::required_slots(n, domain))
            .unwrap_or_default();
        let (filled, missing): (Vec<SlotKey>, Vec<SlotKey>) =
            required.iter().copied().partition(|k| is_filled(*k));

        let optional: Vec<SlotKey> = match (node, domain) {
            (Some(_), Some(d)) => d
                .slots()
                .iter()
                .copied()
                .filter(|k| *k != SlotKey::LegalDomain && !required.contains(k))
                .collect(),
            _ => Vec::new(),
        };
        let (filled_optional, missing_optional): (Vec<SlotKey>, Vec<SlotKey>) =
            optional.iter().copied().partition(|k| is_filled(*k));

        let mut pending = missing
            .iter()
            .copied()
            .find(|k| self.dependencies.satisfied(*k, is_filled));

        if missing.is_empty() {
            if let Some(d) = domain {
                let askable = |k: &SlotKey| self.dependencies.satisfied(*k, is_filled);
                pending = match self.config.optional_policy(d) {
                    OptionalSlotPolicy::AskAll => missing_optional.iter().copied().find(askable),
                    OptionalSlotPolicy::KeyOnly => missing_optional
                        .iter()
                        .copied()
                        .filter(|k| *k == d.subtype_slot())
                        .find(askable),
                };
            }
        }

        let still_missing = missing.len() + usize::from(missing.is_empty() && pending.is_some());
        let phase = DialogPhase::derive(node.is_some(), filled.len(), still_missing);
        tracing::debug!("Phase {phase:?}, pending {pending:?}, missing {missing:?}");

        Derived {
            pending,
            snapshot: DialogState {
                phase,
                intent: node.map(|n| n.id.clone()),
                domain,
                filled_slots: filled,
                missing_slots: missing,
                optional_slots: optional,
                filled_optional_slots: filled_optional,
                missing_optional_slots: missing_optional,
                tone,
                turn_count: memory.turn_count,
                updated_at: Utc::now(),
            },
        }
    }
}

struct Derived {
    pending: Option<SlotKey>,
    snapshot: DialogState,
}

/// Remove every filled slot owned by a domain other than `active`.
fn purge_contamination(memory: &mut DialogMemory, active: LegalDomain) -> Vec<Conflict> {
    let foreign: Vec<(SlotKey, LegalDomain)> = memory
        .filled_slots
        .keys()
        .filter_map(|k| k.owner().filter(|o| *o != active).map(|o| (*k, o)))
        .collect();

    foreign
        .into_iter()
        .filter_map(|(slot, owner)| {
            let value = memory.filled_slots.remove(&slot)?;
            tracing::warn!("Purged {slot}={value}: belongs to {owner}, active domain is {active}");
            Some(Conflict::SlotContamination {
                slot,
                value,
                owner,
                active,
            })
        })
        .collect()
}

/// Two identical consecutive responses among the last three.
fn repeated_response(memory: &DialogMemory) -> Option<Conflict> {
    let recent = memory.recent_responses(3);
    recent
        .windows(2)
        .find(|pair| pair[0] == pair[1])
        .map(|pair| Conflict::RepeatedResponse {
            response: pair[1].to_string(),
        })
}
