//! Slot filling.

use crate::resolver::{ResolveContext, ResolverScope, SlotResolver, default_chain};
use slotwise_config::SlotTable;
use slotwise_core::{DialogMemory, DomainNode, EntityMap, LegalDomain, SlotDefinition, SlotKey};
use std::sync::Arc;

/// Fills the active node's slots from the utterance, entities and history.
pub struct SlotFiller {
    table: Arc<SlotTable>,
    resolvers: Vec<Box<dyn SlotResolver>>,
}

/// One turn's input to the filler.
pub struct FillRequest<'a> {
    pub text: &'a str,
    pub node: &'a DomainNode,
    pub domain: Option<LegalDomain>,
    pub entities: &'a EntityMap,
    pub skip_request: bool,
}

impl SlotFiller {
    pub fn new(table: Arc<SlotTable>, capture_pending_answers: bool) -> Self {
        Self {
            table,
            resolvers: default_chain(capture_pending_answers),
        }
    }

    /// Replace the resolver chain.
    pub fn with_resolvers(mut self, resolvers: Vec<Box<dyn SlotResolver>>) -> Self {
        self.resolvers = resolvers;
        self
    }

    /// Slots this node may fill: the domain's full list when known,
    /// otherwise the node's own list.
    pub fn targets(node: &DomainNode, domain: Option<LegalDomain>) -> Vec<SlotKey> {
        match domain {
            Some(domain) => domain.slots().to_vec(),
            None => node.slots.clone(),
        }
    }

    /// Fill what can be filled this turn. Returns the keys written.
    pub fn fill(&self, request: &FillRequest<'_>, memory: &mut DialogMemory) -> Vec<SlotKey> {
        let mut written = Vec::new();

        for key in Self::targets(request.node, request.domain) {
            let filled = memory.has_slot(key);
            if key == SlotKey::LegalDomain && filled {
                continue;
            }
            let Some(def) = self.table.get(key) else {
                continue;
            };

            let ctx = ResolveContext {
                text: request.text,
                entities: request.entities,
                memory,
                domain: request.domain,
                skip_request: request.skip_request,
            };
            let Some((value, resolver)) = self.resolve(def, &ctx, filled) else {
                continue;
            };

            if memory.slot(key) != Some(value.as_str()) {
                tracing::debug!("Slot {key} = {value} (via {resolver})");
                memory.filled_slots.insert(key, value);
                written.push(key);
            }

            if key.is_subtype() && !memory.has_slot(SlotKey::LegalDomain) {
                if let Some(owner) = key.owner() {
                    tracing::debug!("Slot {key} implies domain {owner}");
                    memory
                        .filled_slots
                        .insert(SlotKey::LegalDomain, owner.as_str().to_string());
                    written.push(SlotKey::LegalDomain);
                }
            }
        }
        written
    }

    fn resolve(
        &self,
        def: &SlotDefinition,
        ctx: &ResolveContext<'_>,
        filled: bool,
    ) -> Option<(String, &'static str)> {
        self.resolvers
            .iter()
            .filter(|r| !filled || r.scope() == ResolverScope::CurrentTurn)
            .find_map(|r| {
                let raw = r.attempt(def, ctx)?;
                self.normalize(def, &raw).map(|v| (v, r.name()))
            })
    }

    /// Canonical form of a raw value. Domain values must name a known domain.
    fn normalize(&self, def: &SlotDefinition, raw: &str) -> Option<String> {
        if def.key != SlotKey::LegalDomain {
            return Some(def.canonicalize(raw));
        }
        LegalDomain::parse(raw)
            .or_else(|| LegalDomain::parse(&def.canonicalize(raw)))
            .map(|d| d.as_str().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotwise_config::ScenarioGraph;
    use slotwise_core::{DialogTurn, DomainAction, EntityKind, NodeId};

    fn filler() -> SlotFiller {
        SlotFiller::new(Arc::new(SlotTable::builtin()), false)
    }

    fn labor_node() -> DomainNode {
        ScenarioGraph::builtin()
            .node_for_domain(LegalDomain::Labor)
            .cloned()
            .unwrap()
    }

    fn request<'a>(text: &'a str, node: &'a DomainNode, entities: &'a EntityMap) -> FillRequest<'a> {
        FillRequest {
            text,
            node,
            domain: node.domain(),
            entities,
            skip_request: false,
        }
    }

    #[test]
    fn subtype_is_canonicalized() {
        let node = labor_node();
        let entities = EntityMap::new();
        let mut memory = DialogMemory::new();
        filler().fill(&request("我被辞退了", &node, &entities), &mut memory);
        assert_eq!(memory.slot(SlotKey::LaborIssue), Some("termination"));
        assert_eq!(memory.slot(SlotKey::LegalDomain), Some("labor"));
        assert!(!memory.has_slot(SlotKey::Employer));
    }

    #[test]
    fn entities_fill_employer_and_duration() {
        let node = labor_node();
        let mut entities = EntityMap::new();
        entities.insert(EntityKind::Organization, vec!["Acme Ltd.".into()]);
        entities.insert(EntityKind::TimeDuration, vec!["2019年".into()]);
        let mut memory = DialogMemory::new();
        filler().fill(&request("就这样", &node, &entities), &mut memory);
        assert_eq!(memory.slot(SlotKey::Employer), Some("Acme Ltd."));
        assert_eq!(memory.slot(SlotKey::WorkDuration), Some("2019年"));
    }

    #[test]
    fn history_fills_empty_slots_only() {
        let node = labor_node();
        let entities = EntityMap::new();
        let mut memory = DialogMemory::new();
        memory.push_turn(DialogTurn::new("东方公司"), 10);
        filler().fill(&request("嗯", &node, &entities), &mut memory);
        assert_eq!(memory.slot(SlotKey::Employer), Some("东方公司"));

        memory.filled_slots.insert(SlotKey::Employer, "南方公司".into());
        filler().fill(&request("嗯", &node, &entities), &mut memory);
        assert_eq!(memory.slot(SlotKey::Employer), Some("南方公司"));
    }

    #[test]
    fn current_turn_overwrites_filled_slot() {
        let node = labor_node();
        let entities = EntityMap::new();
        let mut memory = DialogMemory::new();
        memory.filled_slots.insert(SlotKey::Employer, "南方公司".into());
        filler().fill(&request("北方公司", &node, &entities), &mut memory);
        assert_eq!(memory.slot(SlotKey::Employer), Some("北方公司"));
    }

    #[test]
    fn entities_do_not_overwrite_filled_slots() {
        let node = labor_node();
        let mut entities = EntityMap::new();
        entities.insert(EntityKind::TimeDuration, vec!["3月15日".into()]);
        entities.insert(EntityKind::Organization, vec!["人事部".into()]);
        let mut memory = DialogMemory::new();
        memory.filled_slots.insert(SlotKey::Employer, "华南公司".into());
        memory.filled_slots.insert(SlotKey::WorkDuration, "三年".into());

        let written = filler().fill(&request("我是3月15日被通知的", &node, &entities), &mut memory);
        assert_eq!(memory.slot(SlotKey::WorkDuration), Some("三年"));
        assert_eq!(memory.slot(SlotKey::Employer), Some("华南公司"));
        assert!(!written.contains(&SlotKey::WorkDuration));
    }

    #[test]
    fn domain_slot_is_never_overwritten() {
        let node = labor_node();
        let entities = EntityMap::new();
        let mut memory = DialogMemory::new();
        memory
            .filled_slots
            .insert(SlotKey::LegalDomain, "labor".into());
        filler().fill(&request("婚姻", &node, &entities), &mut memory);
        assert_eq!(memory.slot(SlotKey::LegalDomain), Some("labor"));
    }

    #[test]
    fn issue_slots_fall_back_to_generic_default() {
        let node = labor_node();
        let entities = EntityMap::new();
        let mut memory = DialogMemory::new();
        filler().fill(&request("华南公司", &node, &entities), &mut memory);
        assert_eq!(memory.slot(SlotKey::LaborIssue), Some("相关争议"));
    }

    #[test]
    fn subtype_implies_domain() {
        // A generic node carrying a subtype slot directly.
        let node = DomainNode {
            id: NodeId::new("custom_entry"),
            intents: vec![],
            slots: vec![SlotKey::LegalDomain, SlotKey::LaborIssue],
            children: vec![],
            action: DomainAction::LegalConsultation,
        };
        let entities = EntityMap::new();
        let mut memory = DialogMemory::new();
        let written = filler().fill(&request("试用期被延长了", &node, &entities), &mut memory);
        assert_eq!(memory.slot(SlotKey::LaborIssue), Some("contract"));
        assert_eq!(memory.slot(SlotKey::LegalDomain), Some("labor"));
        assert!(written.contains(&SlotKey::LegalDomain));
    }

    #[test]
    fn unknown_domain_value_is_rejected() {
        let node = DomainNode {
            id: NodeId::new("custom_entry"),
            intents: vec![],
            slots: vec![SlotKey::LegalDomain],
            children: vec![],
            action: DomainAction::LegalConsultation,
        };
        let entities = EntityMap::new();
        let mut memory = DialogMemory::new();
        filler().fill(&request("我有个拆迁的事", &node, &entities), &mut memory);
        assert_eq!(memory.slot(SlotKey::LegalDomain), Some("real_estate"));

        let mut memory = DialogMemory::new();
        filler().fill(&request("随便聊聊", &node, &entities), &mut memory);
        assert!(!memory.has_slot(SlotKey::LegalDomain));
    }
}
