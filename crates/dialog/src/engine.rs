//! The dialog engine: one call per user turn.
//!
//! Per turn the engine extracts entities and sentiment, checks for greetings,
//! small talk and domain switches, classifies the intent (falling back to
//! domain keywords), fills slots, tracks state, and finally lets the strategy
//! choose between asking for the pending slot and proceeding to generation.

use crate::filler::{FillRequest, SlotFiller};
use crate::strategy::DialogStrategy;
use crate::tracker::{DialogStateTracker, TrackRequest};
use chrono::Utc;
use serde::Serialize;
use slotwise_config::{
    DomainSwitchPolicy, EngineConfig, Lexicon, ScenarioGraph, SlotDependencyGraph, SlotTable,
};
use slotwise_core::{
    BypassReason, Conflict, DialogMemory, DialogState, Directive, DomainNode, EngineError,
    EntityMap, FactSummary, IntentModel, LegalDomain, NoRetriever, Retriever, Scorer, SlotKey,
    Snippet, Tone,
};
use slotwise_nlu::{DomainDetector, DomainHits, EntityExtractor, IntentClassifier, SentimentAnalyzer};
use std::sync::Arc;

/// Everything a caller needs after a turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub directive: Directive,
    /// Problems the tracker found (and, for contamination, repaired).
    pub conflicts: Vec<Conflict>,
    pub state: DialogState,
}

pub struct DialogEngine {
    config: EngineConfig,
    graph: Arc<ScenarioGraph>,
    table: Arc<SlotTable>,
    lexicon: Arc<Lexicon>,
    detector: DomainDetector,
    extractor: EntityExtractor,
    sentiment: SentimentAnalyzer,
    classifier: IntentClassifier,
    filler: SlotFiller,
    tracker: DialogStateTracker,
    strategy: DialogStrategy,
    retriever: Arc<dyn Retriever>,
}

impl DialogEngine {
    /// Build an engine over already-loaded tables. The scorer defaults to
    /// [`NullScorer`](slotwise_core::NullScorer); intents then come from
    /// domain keywords alone until a real scorer is supplied.
    pub fn new(config: EngineConfig, graph: ScenarioGraph, table: SlotTable) -> Self {
        let dependencies = SlotDependencyGraph::from_table(&table).unwrap_or_else(|e| {
            tracing::warn!("{e}; using built-in slot dependencies");
            SlotDependencyGraph::builtin()
        });
        let table = Arc::new(table);
        let lexicon = Arc::new(Lexicon::with_config(&config.lexicon));

        Self {
            detector: DomainDetector::new(lexicon.domains().clone()),
            extractor: EntityExtractor::builtin(),
            sentiment: SentimentAnalyzer::builtin(),
            classifier: IntentClassifier::new(config.intent.clone()),
            filler: SlotFiller::new(table.clone(), config.dialog.capture_pending_answers),
            tracker: DialogStateTracker::new(dependencies, config.dialog.clone()),
            strategy: DialogStrategy::new(lexicon.clone(), &config.dialog),
            retriever: Arc::new(NoRetriever),
            graph: Arc::new(graph),
            table,
            lexicon,
            config,
        }
    }

    /// Load the tables named by `config`, falling back to the built-ins.
    pub fn from_config(config: EngineConfig) -> Self {
        let graph = ScenarioGraph::load_or_builtin(config.paths.scenario.as_deref());
        let table = SlotTable::load_or_builtin(config.paths.slot_table.as_deref());
        Self::new(config, graph, table)
    }

    /// Default configuration over the built-in tables.
    pub fn builtin() -> Self {
        Self::new(
            EngineConfig::default(),
            ScenarioGraph::builtin(),
            SlotTable::builtin(),
        )
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn Scorer>) -> Self {
        tracing::debug!("Intent scorer: {}", scorer.name());
        self.classifier = self.classifier.with_scorer(scorer);
        self
    }

    pub fn with_intent_model(mut self, model: Arc<dyn IntentModel>) -> Self {
        tracing::debug!("Intent model: {}", model.name());
        self.classifier = self.classifier.with_model(model);
        self
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        tracing::debug!("Retriever: {}", retriever.name());
        self.retriever = retriever;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn graph(&self) -> &ScenarioGraph {
        &self.graph
    }

    pub fn slot_table(&self) -> &SlotTable {
        &self.table
    }

    /// Run one turn. A missing memory starts a fresh session.
    pub fn process(
        &self,
        utterance: &str,
        memory: Option<DialogMemory>,
    ) -> Result<(Directive, DialogMemory), EngineError> {
        let mut memory = memory.unwrap_or_default();
        let outcome = self.process_turn(utterance, &mut memory)?;
        Ok((outcome.directive, memory))
    }

    /// Run one turn against `memory` in place.
    ///
    /// The only error is an empty utterance, in which case `memory` is untouched.
    pub fn process_turn(
        &self,
        utterance: &str,
        memory: &mut DialogMemory,
    ) -> Result<TurnOutcome, EngineError> {
        let text = utterance.trim();
        if text.is_empty() {
            return Err(EngineError::EmptyUtterance);
        }

        memory.turn_count += 1;
        memory.last_active = Utc::now();

        let entities = self.extractor.extract(text);
        memory.sentiment = self.sentiment.analyze(text);
        memory.entities = entities.clone();

        let hits = self.detector.detect(text);

        // ── Short-circuits ──────────────────────────────────────────────
        if hits.is_empty() && self.lexicon.is_greeting(text) {
            if memory.active_intent.is_some() {
                memory.reset_topic();
            }
            tracing::debug!("Greeting");
            return Ok(self.finish_without_intent(memory, text, &entities, Directive::Greet));
        }
        if hits.is_empty() && memory.pending_slot.is_none() && self.lexicon.is_small_talk(text) {
            memory.reset_topic();
            tracing::debug!("Small talk, declining");
            return Ok(self.finish_without_intent(memory, text, &entities, Directive::Decline));
        }

        // ── Domain switch ───────────────────────────────────────────────
        let current_domain = memory
            .active_intent
            .as_ref()
            .and_then(|id| self.graph.node(id))
            .and_then(DomainNode::domain)
            .or_else(|| memory.domain_slot());
        if self.should_switch(text, &hits, current_domain) {
            tracing::info!(
                "Domain switch: {} -> {}",
                current_domain.map_or("none", |d| d.as_str()),
                hits.primary.map_or("none", |d| d.as_str())
            );
            memory.reset_topic();
        }

        // ── Intent ──────────────────────────────────────────────────────
        let Some((node, score)) = self.resolve_intent(text, &hits, memory) else {
            // Out of domain: nothing collected for the old topic survives.
            memory.reset_topic();
            tracing::debug!("No intent, declining");
            return Ok(self.finish_without_intent(memory, text, &entities, Directive::Decline));
        };

        if memory.active_intent.as_ref() != Some(&node.id) {
            tracing::debug!("Intent {} ({score:.3})", node.id);
            memory.ask_count = 0;
        }
        memory.active_intent = Some(node.id.clone());
        memory.intent_confidence = score;
        if let Some(domain) = node.domain() {
            memory
                .filled_slots
                .insert(SlotKey::LegalDomain, domain.as_str().to_string());
        }

        // ── Slots and state ─────────────────────────────────────────────
        let skip_request = self.lexicon.is_skip_request(text);
        self.filler.fill(
            &FillRequest {
                text,
                node,
                domain: node.domain().or_else(|| memory.domain_slot()),
                entities: &entities,
                skip_request,
            },
            memory,
        );

        let tone = self.strategy.tone(memory);
        let sentiment = memory.sentiment.label;
        let conflicts = self.tracker.track(
            memory,
            TrackRequest {
                text,
                node: Some(node),
                sentiment,
                entities: &entities,
                tone,
            },
        );

        // ── Strategy ────────────────────────────────────────────────────
        let directive = if let Some(bypass) = self.strategy.bypass(text, memory) {
            tracing::debug!("Bypassing slot collection: {:?}", bypass.reason);
            memory.pending_slot = None;
            Directive::Proceed {
                summary: self.summarize(memory, node, text, bypass.query, tone, Some(bypass.reason)),
            }
        } else if let Some(slot) = memory.pending_slot {
            memory.ask_count += 1;
            let prompt = self.table.prompt(slot);
            memory.record_response(prompt.clone());
            tracing::debug!("Asking for {slot} (ask {})", memory.ask_count);
            Directive::Ask { slot, prompt }
        } else {
            Directive::Proceed {
                summary: self.summarize(memory, node, text, text.to_string(), tone, None),
            }
        };

        Ok(TurnOutcome {
            directive,
            conflicts,
            state: memory.dialog_state.clone(),
        })
    }

    /// Log the generated answer into the latest turn. Returns `false` when
    /// that turn already carries a response.
    pub fn record_response(&self, memory: &mut DialogMemory, response: &str) -> bool {
        let recorded = memory.record_response(response);
        if !recorded {
            tracing::debug!("Response not recorded: latest turn already answered");
        }
        recorded
    }

    fn should_switch(&self, text: &str, hits: &DomainHits, current: Option<LegalDomain>) -> bool {
        if self.lexicon.is_switch_request(text) {
            return true;
        }
        if self.config.dialog.domain_switch != DomainSwitchPolicy::Eager {
            return false;
        }
        match (hits.primary, current) {
            (Some(new), Some(current)) if new != current => {
                hits.explicit || !hits.contains(current)
            }
            _ => false,
        }
    }

    /// Classifier result, else the detected domain's node; domain-less nodes
    /// are narrowed to the child for the detected or recorded domain.
    fn resolve_intent(
        &self,
        text: &str,
        hits: &DomainHits,
        memory: &DialogMemory,
    ) -> Option<(&DomainNode, f32)> {
        let outcome = self.classifier.classify(
            text,
            &self.graph,
            memory.active_intent.as_ref(),
            memory.intent_confidence,
        );

        let mut chosen = outcome
            .intent
            .as_ref()
            .and_then(|id| self.graph.node(id))
            .map(|n| (n, outcome.score));

        if chosen.is_none() {
            if let Some(domain) = hits.primary {
                tracing::debug!("Intent from domain keyword: {domain}");
                chosen = self
                    .graph
                    .node_for_domain(domain)
                    .map(|n| (n, self.config.intent.keyword_fallback_score));
            }
        }

        let (node, score) = chosen?;
        if node.domain().is_none() {
            if let Some(domain) = hits.primary.or_else(|| memory.domain_slot()) {
                if let Some(refined) = self.graph.refine(&node.id, domain) {
                    return Some((refined, score));
                }
            }
        }
        Some((node, score))
    }

    fn finish_without_intent(
        &self,
        memory: &mut DialogMemory,
        text: &str,
        entities: &EntityMap,
        directive: Directive,
    ) -> TurnOutcome {
        let tone = self.strategy.tone(memory);
        let sentiment = memory.sentiment.label;
        let conflicts = self.tracker.track(
            memory,
            TrackRequest {
                text,
                node: None,
                sentiment,
                entities,
                tone,
            },
        );
        TurnOutcome {
            directive,
            conflicts,
            state: memory.dialog_state.clone(),
        }
    }

    fn summarize(
        &self,
        memory: &DialogMemory,
        node: &DomainNode,
        utterance: &str,
        query: String,
        tone: Tone,
        bypass: Option<BypassReason>,
    ) -> FactSummary {
        let domain = node.domain().or_else(|| memory.domain_slot());
        FactSummary {
            domain,
            intent: Some(node.id.clone()),
            slots: memory.filled_slots.clone(),
            utterance: utterance.to_string(),
            snippets: self.retrieve(domain, &query),
            query,
            tone,
            bypass,
        }
    }

    fn retrieve(&self, domain: Option<LegalDomain>, query: &str) -> Vec<Snippet> {
        let q = match domain {
            Some(d) => format!("{} {}", d.label(), query),
            None => query.to_string(),
        };
        match self.retriever.retrieve(&q, self.config.retrieval.top_k) {
            Ok(snippets) => snippets,
            Err(e) => {
                tracing::warn!("Retriever '{}' failed: {e}", self.retriever.name());
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotwise_core::{DialogPhase, ScorerError};
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn empty_utterance_is_rejected_without_touching_memory() {
        let engine = DialogEngine::builtin();
        let mut memory = DialogMemory::new();
        let err = engine.process_turn("   ", &mut memory).unwrap_err();
        assert!(matches!(err, EngineError::EmptyUtterance));
        assert_eq!(memory.turn_count, 0);
        assert!(memory.turn_history.is_empty());
    }

    #[test]
    fn greeting_short_circuits() {
        let engine = DialogEngine::builtin();
        let (directive, memory) = engine.process("你好", None).unwrap();
        assert_eq!(directive, Directive::Greet);
        assert_eq!(memory.active_intent, None);
        assert_eq!(memory.ask_count, 0);
        assert_eq!(memory.dialog_state.phase, DialogPhase::NoIntent);
    }

    #[test]
    fn small_talk_declines() {
        let engine = DialogEngine::builtin();
        let (directive, _) = engine.process("好的，知道了", None).unwrap();
        assert_eq!(directive, Directive::Decline);
    }

    #[test]
    fn unrelated_text_declines() {
        let engine = DialogEngine::builtin();
        let (directive, memory) = engine.process("今天天气怎么样", None).unwrap();
        assert_eq!(directive, Directive::Decline);
        assert_eq!(memory.turn_history.len(), 1);
    }

    struct SwitchableScorer {
        down: AtomicBool,
    }

    impl Scorer for SwitchableScorer {
        fn name(&self) -> &str {
            "switchable"
        }

        fn similarity(&self, a: &str, b: &str) -> Result<f32, ScorerError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(ScorerError::Unavailable("connection refused".into()));
            }
            Ok(if a.contains("辞退") && b.contains("辞退") { 0.9 } else { 0.0 })
        }
    }

    #[test]
    fn scorer_outage_leaves_no_stale_slots() {
        let scorer = Arc::new(SwitchableScorer {
            down: AtomicBool::new(false),
        });
        let engine = DialogEngine::builtin().with_scorer(scorer.clone());
        let mut memory = DialogMemory::new();

        engine.process_turn("我被辞退了", &mut memory).unwrap();
        assert!(memory.active_intent.is_some());
        assert_eq!(memory.slot(SlotKey::LaborIssue), Some("termination"));
        assert_eq!(memory.ask_count, 1);

        scorer.down.store(true, Ordering::SeqCst);
        let outcome = engine.process_turn("华南公司", &mut memory).unwrap();
        assert_eq!(outcome.directive, Directive::Decline);
        assert_eq!(outcome.state.phase, DialogPhase::NoIntent);
        assert_eq!(memory.active_intent, None);
        assert!(memory.filled_slots.is_empty(), "{:?}", memory.filled_slots);
        assert_eq!(memory.ask_count, 0);
        assert_eq!(memory.pending_slot, None);
    }

    #[test]
    fn small_talk_drops_a_finished_topic() {
        let engine = DialogEngine::builtin();
        let mut memory = DialogMemory::new();
        for turn in ["我被辞退了", "华南公司", "三年"] {
            engine.process_turn(turn, &mut memory).unwrap();
        }
        assert_eq!(memory.pending_slot, None);

        let outcome = engine.process_turn("好的，知道了", &mut memory).unwrap();
        assert_eq!(outcome.directive, Directive::Decline);
        assert!(memory.filled_slots.is_empty());
        assert_eq!(memory.ask_count, 0);
    }

    #[test]
    fn keyword_fallback_resolves_intent() {
        let engine = DialogEngine::builtin();
        let (directive, memory) = engine.process("我被辞退了", None).unwrap();
        assert!(directive.is_ask());
        assert_eq!(memory.intent_confidence, 0.5);
        assert_eq!(memory.domain_slot(), Some(LegalDomain::Labor));
    }

    #[test]
    fn outcome_serializes_with_tagged_directive() {
        let engine = DialogEngine::builtin();
        let mut memory = DialogMemory::new();
        let outcome = engine.process_turn("我被辞退了", &mut memory).unwrap();
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["directive"]["kind"], "ask");
        assert_eq!(json["directive"]["slot"], "employer");
        assert_eq!(json["state"]["missing_slots"][0], "employer");
        assert!(json["conflicts"].as_array().unwrap().is_empty());
    }

    #[test]
    fn recorded_response_is_write_once() {
        let engine = DialogEngine::builtin();
        let mut memory = DialogMemory::new();
        engine.process_turn("劳动法第四十七条是什么", &mut memory).unwrap();
        assert!(engine.record_response(&mut memory, "第四十七条规定了经济补偿。"));
        assert!(!engine.record_response(&mut memory, "again"));
    }
}
