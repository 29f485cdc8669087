//! Intent classification over the scenario graph.
//!
//! A node's score is its best similarity against any of its example
//! phrases. The search is either flat (load order) or hierarchical (one
//! depth level at a time, the held intent's level and shallower first), and
//! in both cases a later candidate only replaces the best on a strictly
//! greater score. A dedicated [`IntentModel`] that answers confidently
//! supersedes the search. Hysteresis against the held intent then applies,
//! followed by the confidence gate.

use serde::Serialize;
use slotwise_config::{IntentConfig, ScenarioGraph};
use slotwise_core::{DomainNode, IntentModel, NodeId, NullScorer, Scorer, ScorerError};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Where the chosen intent came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentSource {
    /// The dedicated model's prediction.
    Model,
    /// The similarity search.
    Similarity,
    /// The previously held intent survived hysteresis.
    Held,
    /// Nothing cleared the confidence gate.
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentOutcome {
    pub intent: Option<NodeId>,
    pub score: f32,
    /// No confident guess, or the catch-all node won.
    pub out_of_domain: bool,
    pub source: IntentSource,
}

impl IntentOutcome {
    fn none() -> Self {
        Self {
            intent: None,
            score: 0.0,
            out_of_domain: true,
            source: IntentSource::None,
        }
    }
}

pub struct IntentClassifier {
    scorer: Arc<dyn Scorer>,
    model: Option<Arc<dyn IntentModel>>,
    config: IntentConfig,
}

impl IntentClassifier {
    pub fn new(config: IntentConfig) -> Self {
        Self {
            scorer: Arc::new(NullScorer),
            model: None,
            config,
        }
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn Scorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_model(mut self, model: Arc<dyn IntentModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn config(&self) -> &IntentConfig {
        &self.config
    }

    /// Classify `text` against the reachable nodes of `graph`, given the
    /// intent currently held and its score. Never fails: scorer errors and an
    /// empty graph both yield no intent with score 0.
    pub fn classify(
        &self,
        text: &str,
        graph: &ScenarioGraph,
        held: Option<&NodeId>,
        held_score: f32,
    ) -> IntentOutcome {
        let candidates = graph.reachable();
        if candidates.is_empty() {
            tracing::warn!("Intent classification skipped: scenario has no reachable nodes");
            return IntentOutcome::none();
        }

        let searched = if self.config.hierarchical {
            self.search_levels(text, graph, &candidates, held)
        } else {
            self.search_flat(text, &candidates)
        };
        let (mut best, mut score, mut source) = match searched {
            Ok(Some((id, score))) => (Some(id), score, IntentSource::Similarity),
            Ok(None) => (None, 0.0, IntentSource::None),
            Err(e) => {
                tracing::warn!("Scorer '{}' failed, no intent this turn: {e}", self.scorer.name());
                return IntentOutcome::none();
            }
        };

        if let Some((id, predicted)) = self.model_prediction(text, graph, &candidates) {
            best = Some(id);
            score = predicted;
            source = IntentSource::Model;
        }

        // Hysteresis against the held intent.
        if let (Some(held), Some(candidate)) = (held, best.as_ref()) {
            if candidate == held {
                score = score.max(held_score);
            } else if score - held_score < self.config.switch_threshold {
                tracing::debug!(
                    "Keeping intent {held} ({held_score:.3}); {candidate} ({score:.3}) below switch margin"
                );
                best = Some(held.clone());
                score = held_score;
                source = IntentSource::Held;
            }
        }

        let Some(intent) = best else {
            return IntentOutcome::none();
        };
        if score < self.config.confidence_threshold {
            tracing::debug!("Best intent {intent} scored {score:.3}, below confidence gate");
            return IntentOutcome::none();
        }
        if graph.node(&intent).is_some_and(|n| n.action.is_out_of_domain()) {
            tracing::debug!("Intent {intent} is the out-of-domain catch-all");
            return IntentOutcome {
                intent: None,
                score,
                out_of_domain: true,
                source,
            };
        }

        IntentOutcome {
            intent: Some(intent),
            score,
            out_of_domain: false,
            source,
        }
    }

    fn node_score(&self, text: &str, node: &DomainNode) -> Result<f32, ScorerError> {
        let mut best = 0.0f32;
        for phrase in &node.intents {
            best = best.max(self.scorer.similarity(text, phrase)?);
        }
        Ok(best)
    }

    fn search_flat(
        &self,
        text: &str,
        candidates: &[&DomainNode],
    ) -> Result<Option<(NodeId, f32)>, ScorerError> {
        let mut best: Option<(NodeId, f32)> = None;
        for node in candidates {
            let score = self.node_score(text, node)?;
            if best.as_ref().is_none_or(|(_, b)| score > *b) {
                best = Some((node.id.clone(), score));
            }
        }
        Ok(best)
    }

    fn search_levels(
        &self,
        text: &str,
        graph: &ScenarioGraph,
        candidates: &[&DomainNode],
        held: Option<&NodeId>,
    ) -> Result<Option<(NodeId, f32)>, ScorerError> {
        let mut levels: BTreeMap<usize, Vec<&DomainNode>> = BTreeMap::new();
        for node in candidates {
            let depth = graph.depth(&node.id).unwrap_or(0);
            levels.entry(depth).or_default().push(node);
        }

        let held_level = held.and_then(|id| graph.depth(id));
        let order: Vec<usize> = match held_level {
            Some(level) => levels
                .keys()
                .copied()
                .filter(|l| *l <= level)
                .chain(levels.keys().copied().filter(|l| *l > level))
                .collect(),
            None => levels.keys().copied().collect(),
        };

        let mut best: Option<(NodeId, f32)> = None;
        for level in order {
            let Some(level_best) = self.search_flat(text, &levels[&level])? else {
                continue;
            };
            if best.as_ref().is_none_or(|(_, b)| level_best.1 > *b) {
                best = Some(level_best);
            }
        }
        Ok(best)
    }

    /// The model's prediction, if one is configured, confident, and names a known node.
    fn model_prediction(
        &self,
        text: &str,
        graph: &ScenarioGraph,
        candidates: &[&DomainNode],
    ) -> Option<(NodeId, f32)> {
        let model = self.model.as_ref()?;
        match model.predict(text, candidates) {
            Ok(Some(prediction))
                if prediction.score >= self.config.confidence_threshold
                    && graph.node(&prediction.node).is_some() =>
            {
                tracing::debug!(
                    "Model '{}' predicted {} ({:.3})",
                    model.name(),
                    prediction.node,
                    prediction.score
                );
                Some((prediction.node, prediction.score))
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Intent model '{}' failed, using similarity: {e}", model.name());
                None
            }
        }
    }
}
