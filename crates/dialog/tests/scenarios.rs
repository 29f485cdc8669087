//! Multi-turn conversations through the full engine.

use slotwise_config::{
    DomainSwitchPolicy, EngineConfig, ScenarioGraph, SlotDependencyGraph, SlotTable,
};
use slotwise_core::{
    BypassReason, Conflict, DialogMemory, Directive, EngineError, LegalDomain, Scorer,
    ScorerError, SlotKey, Tone,
};
use slotwise_dialog::DialogEngine;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Scores a phrase of a given domain's node whenever the text contains a trigger.
struct ScriptedScorer {
    rules: Vec<(&'static str, Vec<String>, f32)>,
}

impl ScriptedScorer {
    fn new(rules: &[(&'static str, LegalDomain, f32)]) -> Self {
        let graph = ScenarioGraph::builtin();
        let rules = rules
            .iter()
            .map(|(trigger, domain, score)| {
                let phrases = graph.node_for_domain(*domain).unwrap().intents.clone();
                (*trigger, phrases, *score)
            })
            .collect();
        Self { rules }
    }
}

impl Scorer for ScriptedScorer {
    fn name(&self) -> &str {
        "scripted"
    }

    fn similarity(&self, a: &str, b: &str) -> Result<f32, ScorerError> {
        Ok(self
            .rules
            .iter()
            .filter(|(trigger, phrases, _)| a.contains(trigger) && phrases.iter().any(|p| p == b))
            .map(|(_, _, score)| *score)
            .fold(0.0, f32::max))
    }
}

fn run(engine: &DialogEngine, turns: &[&str]) -> (Vec<Directive>, DialogMemory) {
    let mut memory = DialogMemory::new();
    let directives = turns
        .iter()
        .map(|t| engine.process_turn(t, &mut memory).unwrap().directive)
        .collect();
    (directives, memory)
}

fn asked(directive: &Directive) -> Option<SlotKey> {
    match directive {
        Directive::Ask { slot, .. } => Some(*slot),
        _ => None,
    }
}

#[test]
fn labor_termination_collects_then_proceeds() {
    let engine = DialogEngine::builtin();
    let mut memory = DialogMemory::new();

    let first = engine.process_turn("我被辞退了", &mut memory).unwrap();
    assert_eq!(asked(&first.directive), Some(SlotKey::Employer));
    assert_eq!(memory.ask_count, 1);
    assert_eq!(memory.slot(SlotKey::LaborIssue), Some("termination"));
    assert_eq!(memory.slot(SlotKey::LegalDomain), Some("labor"));

    let second = engine.process_turn("华南公司", &mut memory).unwrap();
    assert_eq!(asked(&second.directive), Some(SlotKey::WorkDuration));
    assert_eq!(memory.ask_count, 2);

    let third = engine.process_turn("三年", &mut memory).unwrap();
    let Directive::Proceed { summary } = third.directive else {
        panic!("expected proceed, got {:?}", third.directive);
    };
    assert_eq!(summary.bypass, None);
    assert_eq!(summary.domain, Some(LegalDomain::Labor));
    let expected: BTreeMap<SlotKey, String> = [
        (SlotKey::LegalDomain, "labor"),
        (SlotKey::LaborIssue, "termination"),
        (SlotKey::Employer, "华南公司"),
        (SlotKey::WorkDuration, "三年"),
    ]
    .into_iter()
    .map(|(k, v)| (k, v.to_string()))
    .collect();
    assert_eq!(summary.slots, expected);
    assert!(third.state.missing_slots.is_empty());
}

#[test]
fn later_date_mention_keeps_the_collected_duration() {
    let engine = DialogEngine::builtin();
    let (_, mut memory) = run(&engine, &["我被辞退了", "华南公司", "三年"]);
    assert_eq!(memory.slot(SlotKey::WorkDuration), Some("三年"));

    let outcome = engine.process_turn("我是3月15日被通知的", &mut memory).unwrap();
    assert_eq!(memory.slot(SlotKey::WorkDuration), Some("三年"));
    let Directive::Proceed { summary } = outcome.directive else {
        panic!("expected proceed, got {:?}", outcome.directive);
    };
    assert_eq!(
        summary.slots.get(&SlotKey::WorkDuration).map(String::as_str),
        Some("三年")
    );
    assert_eq!(
        summary.slots.get(&SlotKey::Employer).map(String::as_str),
        Some("华南公司")
    );
}

#[test]
fn greeting_holds_no_intent() {
    let engine = DialogEngine::builtin();
    let (directives, memory) = run(&engine, &["你好"]);
    assert_eq!(directives, vec![Directive::Greet]);
    assert_eq!(memory.active_intent, None);
    assert_eq!(memory.ask_count, 0);
}

#[test]
fn greeting_mid_conversation_resets_topic() {
    let engine = DialogEngine::builtin();
    let (directives, memory) = run(&engine, &["我被辞退了", "您好"]);
    assert_eq!(directives[1], Directive::Greet);
    assert!(memory.filled_slots.is_empty());
    assert_eq!(memory.pending_slot, None);
}

#[test]
fn marriage_gives_up_after_the_ask_limit() {
    let engine = DialogEngine::builtin();
    let mut memory = DialogMemory::new();

    let first = engine.process_turn("我想离婚", &mut memory).unwrap();
    assert_eq!(asked(&first.directive), Some(SlotKey::MarriageDuration));
    assert_eq!(memory.slot(SlotKey::MarriageIssue), Some("divorce"));

    let second = engine.process_turn("我也不清楚", &mut memory).unwrap();
    assert_eq!(asked(&second.directive), Some(SlotKey::MarriageDuration));
    assert_eq!(memory.ask_count, 2);

    let third = engine.process_turn("不太记得了", &mut memory).unwrap();
    let Directive::Proceed { summary } = third.directive else {
        panic!("expected proceed, got {:?}", third.directive);
    };
    assert_eq!(summary.bypass, Some(BypassReason::AskLimit));
    assert_eq!(summary.tone, Tone::Empathetic);
    assert!(
        third
            .conflicts
            .iter()
            .any(|c| matches!(c, Conflict::RepeatedResponse { .. }))
    );
    assert_eq!(memory.pending_slot, None);
}

#[test]
fn new_domain_keyword_switches_eagerly() {
    let engine = DialogEngine::builtin();
    let mut memory = DialogMemory::new();
    engine.process_turn("我被辞退了", &mut memory).unwrap();

    let outcome = engine.process_turn("我出车祸了", &mut memory).unwrap();
    assert_eq!(asked(&outcome.directive), Some(SlotKey::LiableParty));
    assert_eq!(memory.domain_slot(), Some(LegalDomain::Traffic));
    assert_eq!(memory.slot(SlotKey::AccidentType), Some("车祸"));
    assert!(!memory.has_slot(SlotKey::LaborIssue));
    assert_eq!(memory.ask_count, 1);
    let traffic = engine.graph().node_for_domain(LegalDomain::Traffic).unwrap();
    assert_eq!(memory.active_intent.as_ref(), Some(&traffic.id));
}

#[test]
fn explicit_policy_purges_slots_of_the_old_domain() {
    let mut config = EngineConfig::default();
    config.dialog.domain_switch = DomainSwitchPolicy::Explicit;
    let scorer = ScriptedScorer::new(&[
        ("辞退", LegalDomain::Labor, 0.6),
        ("车祸", LegalDomain::Traffic, 0.95),
    ]);
    let engine = DialogEngine::new(config, ScenarioGraph::builtin(), SlotTable::builtin())
        .with_scorer(Arc::new(scorer));
    let mut memory = DialogMemory::new();

    engine.process_turn("我被辞退了", &mut memory).unwrap();
    assert_eq!(memory.intent_confidence, 0.6);

    let outcome = engine.process_turn("后来又出了车祸", &mut memory).unwrap();
    assert_eq!(memory.domain_slot(), Some(LegalDomain::Traffic));
    assert!(outcome.conflicts.iter().any(|c| matches!(
        c,
        Conflict::SlotContamination {
            slot: SlotKey::LaborIssue,
            owner: LegalDomain::Labor,
            active: LegalDomain::Traffic,
            ..
        }
    )));
    assert!(!memory.has_slot(SlotKey::LaborIssue));
    assert_eq!(asked(&outcome.directive), Some(SlotKey::LiableParty));
}

#[test]
fn small_margin_keeps_the_held_intent() {
    let scorer = ScriptedScorer::new(&[
        ("辞退", LegalDomain::Labor, 0.6),
        ("处理", LegalDomain::Traffic, 0.7),
    ]);
    let engine = DialogEngine::builtin().with_scorer(Arc::new(scorer));
    let (directives, memory) = run(&engine, &["我被辞退了", "这个要怎么处理"]);

    let labor = engine.graph().node_for_domain(LegalDomain::Labor).unwrap();
    assert_eq!(memory.active_intent.as_ref(), Some(&labor.id));
    assert_eq!(memory.intent_confidence, 0.6);
    assert_eq!(asked(&directives[1]), Some(SlotKey::Employer));
}

#[test]
fn history_is_capped() {
    let mut config = EngineConfig::default();
    config.dialog.max_history = 3;
    let engine = DialogEngine::new(config, ScenarioGraph::builtin(), SlotTable::builtin());
    let (_, memory) = run(&engine, &["你好", "我被辞退了", "华南公司", "三年", "谢谢"]);
    assert_eq!(memory.turn_history.len(), 3);
    assert_eq!(memory.turn_count, 5);
    assert_eq!(memory.turn_history.front().unwrap().user_input, "华南公司");
}

#[test]
fn asked_slots_always_have_their_prerequisites() {
    let engine = DialogEngine::builtin();
    let dependencies = SlotDependencyGraph::builtin();
    let conversations: &[&[&str]] = &[
        &["我被辞退了", "华南公司", "三年"],
        &["我想离婚", "五年"],
        &["我出车祸了", "对方", "追尾"],
        &["我想咨询法律问题", "房产纠纷", "北京"],
        &["合同违约了", "房屋"],
    ];

    for turns in conversations {
        let mut memory = DialogMemory::new();
        for turn in *turns {
            let outcome = engine.process_turn(turn, &mut memory).unwrap();
            if let Some(slot) = asked(&outcome.directive) {
                assert!(
                    dependencies.requires(slot).iter().all(|d| memory.has_slot(*d)),
                    "asked {slot} before its prerequisites in {turns:?}"
                );
                assert!(memory.ask_count <= engine.config().dialog.max_slot_asks);
            }
        }
    }
}

#[test]
fn direct_query_proceeds_immediately() {
    let engine = DialogEngine::builtin();
    let (directives, _) = run(&engine, &["劳动法第四十七条是什么"]);
    let Directive::Proceed { summary } = &directives[0] else {
        panic!("expected proceed, got {:?}", directives[0]);
    };
    assert_eq!(summary.bypass, Some(BypassReason::DirectQuery));
    assert_eq!(summary.domain, Some(LegalDomain::Labor));
}

#[test]
fn empty_utterance_is_an_error() {
    let engine = DialogEngine::builtin();
    let err = engine.process("", None).unwrap_err();
    assert!(matches!(err, EngineError::EmptyUtterance));
}

#[test]
fn snapshot_resumes_the_conversation() {
    let engine = DialogEngine::builtin();
    let (_, memory) = engine.process("我被辞退了", None).unwrap();
    let json = memory.to_snapshot().unwrap();

    let restored = DialogMemory::from_snapshot(&json).unwrap();
    let (directive, memory) = engine.process("华南公司", Some(restored)).unwrap();
    assert_eq!(asked(&directive), Some(SlotKey::WorkDuration));
    assert_eq!(memory.slot(SlotKey::Employer), Some("华南公司"));

    assert!(matches!(
        DialogMemory::from_snapshot("{\"filled_slots\": 3"),
        Err(EngineError::MalformedSnapshot(_))
    ));
}
