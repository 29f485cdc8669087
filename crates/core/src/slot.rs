//! Slot vocabulary: the closed set of facts the engine can collect.
//!
//! Slot keys are an enum rather than free-form strings: configuration tables
//! refer to them by their `#marker#` spelling and are validated against this
//! enum at load time, so a typo in a table can never create an orphan slot.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A legal domain a conversation can be about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegalDomain {
    Labor,
    Marriage,
    Traffic,
    RealEstate,
    IntellectualProperty,
    Criminal,
    Administrative,
    Contract,
}

impl LegalDomain {
    /// All domains, in the order keyword tables are consulted.
    pub const ALL: [LegalDomain; 8] = [
        LegalDomain::Labor,
        LegalDomain::Marriage,
        LegalDomain::Traffic,
        LegalDomain::RealEstate,
        LegalDomain::IntellectualProperty,
        LegalDomain::Criminal,
        LegalDomain::Administrative,
        LegalDomain::Contract,
    ];

    /// Stable machine tag, also the canonical value of the domain slot.
    pub fn as_str(&self) -> &'static str {
        match self {
            LegalDomain::Labor => "labor",
            LegalDomain::Marriage => "marriage",
            LegalDomain::Traffic => "traffic",
            LegalDomain::RealEstate => "real_estate",
            LegalDomain::IntellectualProperty => "intellectual_property",
            LegalDomain::Criminal => "criminal",
            LegalDomain::Administrative => "administrative",
            LegalDomain::Contract => "contract",
        }
    }

    /// Human-readable label used in prompts and retrieval queries.
    pub fn label(&self) -> &'static str {
        match self {
            LegalDomain::Labor => "劳动",
            LegalDomain::Marriage => "婚姻",
            LegalDomain::Traffic => "交通",
            LegalDomain::RealEstate => "房产",
            LegalDomain::IntellectualProperty => "知识产权",
            LegalDomain::Criminal => "刑事",
            LegalDomain::Administrative => "行政",
            LegalDomain::Contract => "合同",
        }
    }

    /// Parse either the machine tag (`labor`) or the label (`劳动`).
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s || d.label() == s)
    }

    /// The domain's slots in asking priority order. The shared domain slot
    /// always comes first.
    pub fn slots(&self) -> &'static [SlotKey] {
        use SlotKey::*;
        match self {
            Self::Labor => &[LegalDomain, LaborIssue, Employer, WorkDuration],
            Self::Marriage => &[LegalDomain, MarriageIssue, MarriageDuration],
            Self::Traffic => &[LegalDomain, AccidentType, LiableParty],
            Self::RealEstate => &[LegalDomain, PropertyIssue, PropertyLocation],
            Self::IntellectualProperty => &[LegalDomain, IpType],
            Self::Criminal => &[LegalDomain, CriminalCharge],
            Self::Administrative => &[LegalDomain, AdministrativeCase],
            Self::Contract => &[LegalDomain, ContractType, ContractSubject],
        }
    }

    /// The most diagnostic "type" slot of this domain.
    pub fn subtype_slot(&self) -> SlotKey {
        match self {
            LegalDomain::Labor => SlotKey::LaborIssue,
            LegalDomain::Marriage => SlotKey::MarriageIssue,
            LegalDomain::Traffic => SlotKey::AccidentType,
            LegalDomain::RealEstate => SlotKey::PropertyIssue,
            LegalDomain::IntellectualProperty => SlotKey::IpType,
            LegalDomain::Criminal => SlotKey::CriminalCharge,
            LegalDomain::Administrative => SlotKey::AdministrativeCase,
            LegalDomain::Contract => SlotKey::ContractType,
        }
    }

    /// Slot that receives extracted time-duration entities, if any.
    pub fn duration_slot(&self) -> Option<SlotKey> {
        match self {
            LegalDomain::Labor => Some(SlotKey::WorkDuration),
            LegalDomain::Marriage => Some(SlotKey::MarriageDuration),
            _ => None,
        }
    }
}

impl fmt::Display for LegalDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LegalDomain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown legal domain: {s}"))
    }
}

/// Closed set of slot keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKey {
    /// Which legal domain the user is asking about. Shared by every domain.
    LegalDomain,
    LaborIssue,
    Employer,
    WorkDuration,
    MarriageIssue,
    MarriageDuration,
    AccidentType,
    LiableParty,
    PropertyIssue,
    PropertyLocation,
    IpType,
    CriminalCharge,
    AdministrativeCase,
    ContractType,
    ContractSubject,
}

impl SlotKey {
    pub const ALL: [SlotKey; 15] = [
        SlotKey::LegalDomain,
        SlotKey::LaborIssue,
        SlotKey::Employer,
        SlotKey::WorkDuration,
        SlotKey::MarriageIssue,
        SlotKey::MarriageDuration,
        SlotKey::AccidentType,
        SlotKey::LiableParty,
        SlotKey::PropertyIssue,
        SlotKey::PropertyLocation,
        SlotKey::IpType,
        SlotKey::CriminalCharge,
        SlotKey::AdministrativeCase,
        SlotKey::ContractType,
        SlotKey::ContractSubject,
    ];

    /// The delimiter-wrapped spelling used by slot tables and scenario files.
    pub fn marker(&self) -> &'static str {
        match self {
            SlotKey::LegalDomain => "#法律类型#",
            SlotKey::LaborIssue => "#劳动问题类型#",
            SlotKey::Employer => "#用人单位#",
            SlotKey::WorkDuration => "#工作时长#",
            SlotKey::MarriageIssue => "#婚姻问题类型#",
            SlotKey::MarriageDuration => "#婚姻时长#",
            SlotKey::AccidentType => "#事故类型#",
            SlotKey::LiableParty => "#责任方#",
            SlotKey::PropertyIssue => "#房产问题类型#",
            SlotKey::PropertyLocation => "#房屋位置#",
            SlotKey::IpType => "#知识产权类型#",
            SlotKey::CriminalCharge => "#刑事罪名#",
            SlotKey::AdministrativeCase => "#行政案件类型#",
            SlotKey::ContractType => "#合同类型#",
            SlotKey::ContractSubject => "#合同标的#",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SlotKey::LegalDomain => "legal_domain",
            SlotKey::LaborIssue => "labor_issue",
            SlotKey::Employer => "employer",
            SlotKey::WorkDuration => "work_duration",
            SlotKey::MarriageIssue => "marriage_issue",
            SlotKey::MarriageDuration => "marriage_duration",
            SlotKey::AccidentType => "accident_type",
            SlotKey::LiableParty => "liable_party",
            SlotKey::PropertyIssue => "property_issue",
            SlotKey::PropertyLocation => "property_location",
            SlotKey::IpType => "ip_type",
            SlotKey::CriminalCharge => "criminal_charge",
            SlotKey::AdministrativeCase => "administrative_case",
            SlotKey::ContractType => "contract_type",
            SlotKey::ContractSubject => "contract_subject",
        }
    }

    /// Accepts `#用人单位#`, `用人单位` or `employer`.
    pub fn from_marker(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let bare = raw.trim_matches('#');
        Self::ALL.into_iter().find(|k| {
            k.marker() == raw || k.marker().trim_matches('#') == bare || k.as_str() == bare
        })
    }

    /// The domain that owns this slot. `None` means shared by all domains.
    pub fn owner(&self) -> Option<LegalDomain> {
        match self {
            SlotKey::LegalDomain => None,
            SlotKey::LaborIssue | SlotKey::Employer | SlotKey::WorkDuration => {
                Some(LegalDomain::Labor)
            }
            SlotKey::MarriageIssue | SlotKey::MarriageDuration => Some(LegalDomain::Marriage),
            SlotKey::AccidentType | SlotKey::LiableParty => Some(LegalDomain::Traffic),
            SlotKey::PropertyIssue | SlotKey::PropertyLocation => Some(LegalDomain::RealEstate),
            SlotKey::IpType => Some(LegalDomain::IntellectualProperty),
            SlotKey::CriminalCharge => Some(LegalDomain::Criminal),
            SlotKey::AdministrativeCase => Some(LegalDomain::Administrative),
            SlotKey::ContractType | SlotKey::ContractSubject => Some(LegalDomain::Contract),
        }
    }

    /// True for a domain's diagnostic "type" slot.
    pub fn is_subtype(&self) -> bool {
        self.owner().is_some_and(|d| d.subtype_slot() == *self)
    }

    /// Fallback value when nothing in the conversation names the issue type.
    pub fn generic_default(&self) -> Option<&'static str> {
        match self {
            SlotKey::LaborIssue | SlotKey::MarriageIssue | SlotKey::PropertyIssue => {
                Some("相关争议")
            }
            _ => None,
        }
    }

    /// Short label used when rendering a fact summary.
    pub fn label(&self) -> &'static str {
        match self {
            SlotKey::LegalDomain => "法律类型",
            SlotKey::LaborIssue
            | SlotKey::MarriageIssue
            | SlotKey::PropertyIssue
            | SlotKey::IpType
            | SlotKey::AdministrativeCase => "问题",
            SlotKey::Employer => "单位",
            SlotKey::WorkDuration => "工作年限",
            SlotKey::MarriageDuration => "结婚年限",
            SlotKey::AccidentType => "事故类型",
            SlotKey::LiableParty => "责任方",
            SlotKey::PropertyLocation => "位置",
            SlotKey::CriminalCharge => "罪名",
            SlotKey::ContractType => "合同类型",
            SlotKey::ContractSubject => "标的",
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a slot value is located in free text.
#[derive(Debug, Clone)]
pub enum SlotMatcher {
    /// A regular expression; the whole match is the value.
    Pattern(Regex),
    /// An enumerated value set; the leftmost (then longest) occurring value wins.
    Values(Vec<String>),
}

impl SlotMatcher {
    /// Parse a slot-table `values` cell.
    ///
    /// Cells containing regex metacharacters are compiled as patterns,
    /// anything else is split on `|` into a literal value set.
    pub fn parse(raw: &str) -> Result<Self, regex_lite::Error> {
        let raw = raw.trim();
        const META: &[char] = &['[', ']', '(', ')', '\\', '*', '+', '?', '{', '}', '^', '$', '.'];
        if raw.contains(META) {
            Regex::new(raw).map(SlotMatcher::Pattern)
        } else {
            Ok(SlotMatcher::Values(
                raw.split('|')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(String::from)
                    .collect(),
            ))
        }
    }

    /// Find this matcher's value in `text`.
    pub fn find(&self, text: &str) -> Option<String> {
        match self {
            SlotMatcher::Pattern(re) => re
                .find(text)
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty()),
            SlotMatcher::Values(values) => values
                .iter()
                .filter_map(|v| text.find(v.as_str()).map(|pos| (pos, v)))
                .min_by(|a, b| a.0.cmp(&b.0).then(b.1.len().cmp(&a.1.len())))
                .map(|(_, v)| v.clone()),
        }
    }
}

/// A canonical value and the surface keywords that trigger it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordGroup {
    pub canonical: String,
    pub triggers: Vec<String>,
}

impl KeywordGroup {
    pub fn new(canonical: &str, triggers: &[&str]) -> Self {
        Self {
            canonical: canonical.to_string(),
            triggers: triggers.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.triggers.iter().any(|t| text.contains(t.as_str()))
    }
}

/// One row of the slot table.
#[derive(Debug, Clone)]
pub struct SlotDefinition {
    pub key: SlotKey,

    /// Question text shown when this slot is requested.
    pub prompt: String,

    /// `None` when the configured pattern failed to compile.
    pub matcher: Option<SlotMatcher>,

    /// Canonical values and their trigger keywords, tried in order.
    pub keywords: Vec<KeywordGroup>,
}

impl SlotDefinition {
    pub fn new(key: SlotKey, prompt: impl Into<String>, matcher: Option<SlotMatcher>) -> Self {
        Self {
            key,
            prompt: prompt.into(),
            matcher,
            keywords: Vec::new(),
        }
    }

    pub fn with_keywords(mut self, keywords: Vec<KeywordGroup>) -> Self {
        self.keywords = keywords;
        self
    }

    /// Apply the matcher to `text`.
    pub fn match_pattern(&self, text: &str) -> Option<String> {
        self.matcher.as_ref().and_then(|m| m.find(text))
    }

    /// Look `text` up in the keyword table, returning the canonical value.
    pub fn match_keywords(&self, text: &str) -> Option<String> {
        self.keywords
            .iter()
            .find(|g| g.matches(text))
            .map(|g| g.canonical.clone())
    }

    /// Map a surface value onto its canonical form when the keyword table knows it.
    pub fn canonicalize(&self, value: &str) -> String {
        self.keywords
            .iter()
            .find(|g| g.canonical == value || g.triggers.iter().any(|t| t == value))
            .map(|g| g.canonical.clone())
            .unwrap_or_else(|| value.to_string())
    }
}
