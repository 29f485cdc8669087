//! Slot value resolvers.
//!
//! Each resolver is one way of finding a slot's value. The filler tries them
//! in order and keeps the first answer. Resolvers that read the current turn
//! may also correct an already-filled slot; fallback resolvers only fill
//! empty ones.

use slotwise_core::{DialogMemory, EntityKind, EntityMap, LegalDomain, SlotDefinition, SlotKey};

/// Which slots a resolver may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverScope {
    /// Reads only this turn's utterance; may overwrite a filled slot.
    CurrentTurn,
    /// Reads history or defaults; fills empty slots only.
    Fallback,
}

/// What a resolver may look at.
pub struct ResolveContext<'a> {
    pub text: &'a str,
    pub entities: &'a EntityMap,
    pub memory: &'a DialogMemory,
    pub domain: Option<LegalDomain>,
    /// The user asked to stop being questioned this turn.
    pub skip_request: bool,
}

pub trait SlotResolver: Send + Sync {
    fn name(&self) -> &'static str;

    fn scope(&self) -> ResolverScope;

    fn attempt(&self, def: &SlotDefinition, ctx: &ResolveContext<'_>) -> Option<String>;
}

/// The slot's regex or value set against the utterance.
pub struct PatternResolver;

impl SlotResolver for PatternResolver {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn scope(&self) -> ResolverScope {
        ResolverScope::CurrentTurn
    }

    fn attempt(&self, def: &SlotDefinition, ctx: &ResolveContext<'_>) -> Option<String> {
        def.match_pattern(ctx.text)
    }
}

/// Trigger words mapped to canonical values.
pub struct KeywordResolver;

impl SlotResolver for KeywordResolver {
    fn name(&self) -> &'static str {
        "keyword"
    }

    fn scope(&self) -> ResolverScope {
        ResolverScope::CurrentTurn
    }

    fn attempt(&self, def: &SlotDefinition, ctx: &ResolveContext<'_>) -> Option<String> {
        def.match_keywords(ctx.text)
    }
}

/// Extracted entities routed to the slot that holds their kind. Entities
/// are loose matches, so they only fill empty slots.
pub struct EntityResolver;

impl EntityResolver {
    fn kind_for(key: SlotKey, domain: Option<LegalDomain>) -> Option<EntityKind> {
        match key {
            SlotKey::Employer => Some(EntityKind::Organization),
            SlotKey::PropertyLocation => Some(EntityKind::Location),
            _ if domain.and_then(|d| d.duration_slot()) == Some(key) => {
                Some(EntityKind::TimeDuration)
            }
            _ => None,
        }
    }
}

impl SlotResolver for EntityResolver {
    fn name(&self) -> &'static str {
        "entity"
    }

    fn scope(&self) -> ResolverScope {
        ResolverScope::Fallback
    }

    fn attempt(&self, def: &SlotDefinition, ctx: &ResolveContext<'_>) -> Option<String> {
        let kind = Self::kind_for(def.key, ctx.domain)?;
        ctx.entities.get(&kind)?.first().cloned()
    }
}

/// The whole utterance as the answer to the slot being asked for.
pub struct PendingAnswerResolver {
    pub enabled: bool,
}

impl SlotResolver for PendingAnswerResolver {
    fn name(&self) -> &'static str {
        "pending_answer"
    }

    fn scope(&self) -> ResolverScope {
        ResolverScope::CurrentTurn
    }

    fn attempt(&self, def: &SlotDefinition, ctx: &ResolveContext<'_>) -> Option<String> {
        if !self.enabled || ctx.skip_request || ctx.memory.pending_slot != Some(def.key) {
            return None;
        }
        let answer = ctx.text.trim();
        (!answer.is_empty()).then(|| answer.to_string())
    }
}

/// Earlier turns, newest first, input and response together.
pub struct HistoryResolver;

impl SlotResolver for HistoryResolver {
    fn name(&self) -> &'static str {
        "history"
    }

    fn scope(&self) -> ResolverScope {
        ResolverScope::Fallback
    }

    fn attempt(&self, def: &SlotDefinition, ctx: &ResolveContext<'_>) -> Option<String> {
        ctx.memory.turn_history.iter().rev().find_map(|turn| {
            let transcript = turn.transcript();
            def.match_pattern(&transcript)
                .or_else(|| def.match_keywords(&transcript))
        })
    }
}

/// A generic value for issue-type slots.
pub struct DefaultResolver;

impl SlotResolver for DefaultResolver {
    fn name(&self) -> &'static str {
        "default"
    }

    fn scope(&self) -> ResolverScope {
        ResolverScope::Fallback
    }

    fn attempt(&self, def: &SlotDefinition, _ctx: &ResolveContext<'_>) -> Option<String> {
        def.key.generic_default().map(String::from)
    }
}

/// The standard chain, in resolution order.
pub fn default_chain(capture_pending_answers: bool) -> Vec<Box<dyn SlotResolver>> {
    vec![
        Box::new(PatternResolver),
        Box::new(KeywordResolver),
        Box::new(EntityResolver),
        Box::new(PendingAnswerResolver {
            enabled: capture_pending_answers,
        }),
        Box::new(HistoryResolver),
        Box::new(DefaultResolver),
    ]
}
