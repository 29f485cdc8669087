//! Scenario graph node types.
//!
//! A scenario is a directed graph of topics. Each node carries example
//! phrases for intent scoring, the slots relevant to it, and an action tag
//! naming the topic. Nodes are immutable once the graph is loaded.

use crate::slot::{LegalDomain, SlotKey};
use serde::{Deserialize, Serialize};

/// Namespaced node identifier (`scenarioName_id`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build the namespaced id for `id` inside scenario `scenario`.
    pub fn namespaced(scenario: &str, id: &str) -> Self {
        Self(format!("{scenario}_{id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Topic tag attached to a scenario node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainAction {
    /// Generic entry point with no specific domain.
    #[default]
    LegalConsultation,
    LaborConsultation,
    FamilyConsultation,
    TrafficConsultation,
    RealEstateConsultation,
    IpConsultation,
    CriminalConsultation,
    AdministrativeConsultation,
    ContractConsultation,
    /// Legal, but outside every supported domain. Treated as out-of-domain.
    OtherLegalConsultation,
}

impl DomainAction {
    /// Human-readable topic label.
    pub fn label(&self) -> &'static str {
        match self {
            DomainAction::LegalConsultation => "法律咨询",
            DomainAction::LaborConsultation => "劳动纠纷",
            DomainAction::FamilyConsultation => "婚姻家庭",
            DomainAction::TrafficConsultation => "交通事故",
            DomainAction::RealEstateConsultation => "房产纠纷",
            DomainAction::IpConsultation => "知识产权",
            DomainAction::CriminalConsultation => "刑事案件",
            DomainAction::AdministrativeConsultation => "行政诉讼",
            DomainAction::ContractConsultation => "合同纠纷",
            DomainAction::OtherLegalConsultation => "其他法律问题",
        }
    }

    /// The legal domain this action names, if it names one.
    pub fn domain(&self) -> Option<LegalDomain> {
        match self {
            DomainAction::LaborConsultation => Some(LegalDomain::Labor),
            DomainAction::FamilyConsultation => Some(LegalDomain::Marriage),
            DomainAction::TrafficConsultation => Some(LegalDomain::Traffic),
            DomainAction::RealEstateConsultation => Some(LegalDomain::RealEstate),
            DomainAction::IpConsultation => Some(LegalDomain::IntellectualProperty),
            DomainAction::CriminalConsultation => Some(LegalDomain::Criminal),
            DomainAction::AdministrativeConsultation => Some(LegalDomain::Administrative),
            DomainAction::ContractConsultation => Some(LegalDomain::Contract),
            DomainAction::LegalConsultation | DomainAction::OtherLegalConsultation => None,
        }
    }

    /// The action tag for a domain's dedicated node.
    pub fn for_domain(domain: LegalDomain) -> Self {
        match domain {
            LegalDomain::Labor => DomainAction::LaborConsultation,
            LegalDomain::Marriage => DomainAction::FamilyConsultation,
            LegalDomain::Traffic => DomainAction::TrafficConsultation,
            LegalDomain::RealEstate => DomainAction::RealEstateConsultation,
            LegalDomain::IntellectualProperty => DomainAction::IpConsultation,
            LegalDomain::Criminal => DomainAction::CriminalConsultation,
            LegalDomain::Administrative => DomainAction::AdministrativeConsultation,
            LegalDomain::Contract => DomainAction::ContractConsultation,
        }
    }

    pub fn is_out_of_domain(&self) -> bool {
        matches!(self, DomainAction::OtherLegalConsultation)
    }

    /// The tag as written in scenario files.
    pub fn as_tag(&self) -> &'static str {
        match self {
            DomainAction::LegalConsultation => "LEGAL_CONSULTATION",
            DomainAction::LaborConsultation => "LABOR_CONSULTATION",
            DomainAction::FamilyConsultation => "FAMILY_CONSULTATION",
            DomainAction::TrafficConsultation => "TRAFFIC_CONSULTATION",
            DomainAction::RealEstateConsultation => "REAL_ESTATE_CONSULTATION",
            DomainAction::IpConsultation => "IP_CONSULTATION",
            DomainAction::CriminalConsultation => "CRIMINAL_CONSULTATION",
            DomainAction::AdministrativeConsultation => "ADMINISTRATIVE_CONSULTATION",
            DomainAction::ContractConsultation => "CONTRACT_CONSULTATION",
            DomainAction::OtherLegalConsultation => "OTHER_LEGAL_CONSULTATION",
        }
    }

    const ALL: [DomainAction; 10] = [
        DomainAction::LegalConsultation,
        DomainAction::LaborConsultation,
        DomainAction::FamilyConsultation,
        DomainAction::TrafficConsultation,
        DomainAction::RealEstateConsultation,
        DomainAction::IpConsultation,
        DomainAction::CriminalConsultation,
        DomainAction::AdministrativeConsultation,
        DomainAction::ContractConsultation,
        DomainAction::OtherLegalConsultation,
    ];
}

impl std::str::FromStr for DomainAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|a| a.as_tag().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown action tag: {s}"))
    }
}

/// One topic in the scenario graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainNode {
    pub id: NodeId,

    /// Example phrases scored against the utterance.
    pub intents: Vec<String>,

    /// Slots relevant to this node.
    pub slots: Vec<SlotKey>,

    pub children: Vec<NodeId>,

    pub action: DomainAction,
}

impl DomainNode {
    pub fn domain(&self) -> Option<LegalDomain> {
        self.action.domain()
    }

    pub fn has_slot(&self, key: SlotKey) -> bool {
        self.slots.contains(&key)
    }
}
