//! Pattern-driven entity extraction.

use regex_lite::Regex;
use slotwise_core::{EntityKind, EntityMap};

const PERSON: &[&str] = &[
    r"[张王李赵刘陈杨黄周吴徐孙胡朱高林何郭马罗]+[一-龥]{1,2}",
    r"[A-Za-z]+(?:\s[A-Za-z]+)",
];

const ORGANIZATION: &[&str] = &[
    r"[一-龥]+(?:股份有限公司|有限公司|公司|企业|集团|工作室|研究所)",
    r"[A-Za-z]+(?:\s[A-Za-z]+)*\s?(?:Inc\.|Ltd\.|Company|Corporation|Group)",
];

const TIME_DURATION: &[&str] = &[
    r"[12][0-9]{3}年(?:[01]?[0-9]月(?:[0123]?[0-9]日)?)?",
    r"[01]?[0-9]月(?:[0123]?[0-9]日)?",
    r"[0123]?[0-9]日",
    r"[1-9][0-9]*年(?:[1-9]个月)?",
    r"[1-9]个月",
    r"[一二三四五六七八九十百千]+年",
    r"几个月|几年|一年多|两年多|不到一年",
];

const LOCATION: &[&str] = &[
    r"[一-龥]+(?:省|市|县|区|乡|镇|村|街道)",
    r"北京|上海|广州|深圳|杭州|成都|重庆|武汉|西安|苏州|天津|南京|长沙|郑州|东莞|青岛|沈阳|宁波|昆明",
];

/// Extracts typed spans from raw text.
#[derive(Debug, Clone)]
pub struct EntityExtractor {
    patterns: Vec<(EntityKind, Vec<Regex>)>,
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::builtin()
    }
}

impl EntityExtractor {
    pub fn builtin() -> Self {
        Self::with_patterns(&[
            (EntityKind::Person, PERSON),
            (EntityKind::Organization, ORGANIZATION),
            (EntityKind::TimeDuration, TIME_DURATION),
            (EntityKind::Location, LOCATION),
        ])
    }

    /// Build from raw pattern lists. Malformed patterns are skipped with a warning.
    pub fn with_patterns(table: &[(EntityKind, &[&str])]) -> Self {
        let patterns = table
            .iter()
            .map(|(kind, raw)| {
                let compiled = raw
                    .iter()
                    .filter_map(|p| match Regex::new(p) {
                        Ok(re) => Some(re),
                        Err(e) => {
                            tracing::warn!("Skipping malformed {kind:?} pattern {p:?}: {e}");
                            None
                        }
                    })
                    .collect();
                (*kind, compiled)
            })
            .collect();
        Self { patterns }
    }

    /// All matches per kind, de-duplicated in order of first appearance.
    /// Kinds without a match are absent from the map.
    pub fn extract(&self, text: &str) -> EntityMap {
        let mut entities = EntityMap::new();
        for (kind, patterns) in &self.patterns {
            let mut found: Vec<String> = Vec::new();
            for re in patterns {
                for m in re.find_iter(text) {
                    let value = m.as_str().trim();
                    if !value.is_empty() && !found.iter().any(|f| f == value) {
                        found.push(value.to_string());
                    }
                }
            }
            if !found.is_empty() {
                entities.entry(*kind).or_default().extend(found);
            }
        }
        entities
    }
}
