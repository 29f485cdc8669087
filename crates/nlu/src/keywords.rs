//! Domain keyword detection.

use regex_lite::Regex;
use slotwise_config::DomainKeywords;
use slotwise_core::LegalDomain;

/// Stems that identify a domain inside an explicit "…法" mention.
const LAW_STEMS: &[(&str, LegalDomain)] = &[
    ("劳动", LegalDomain::Labor),
    ("婚姻", LegalDomain::Marriage),
    ("合同", LegalDomain::Contract),
    ("商标", LegalDomain::IntellectualProperty),
    ("专利", LegalDomain::IntellectualProperty),
    ("著作权", LegalDomain::IntellectualProperty),
    ("行政", LegalDomain::Administrative),
    ("刑", LegalDomain::Criminal),
    ("交通", LegalDomain::Traffic),
    ("房产", LegalDomain::RealEstate),
];

/// Domains mentioned by a single utterance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainHits {
    /// The domain the utterance is most clearly about.
    pub primary: Option<LegalDomain>,
    /// Every domain with a keyword hit, in table order.
    pub all: Vec<LegalDomain>,
    /// `primary` came from an explicit law name ("劳动法") rather than a keyword.
    pub explicit: bool,
}

impl DomainHits {
    pub fn contains(&self, domain: LegalDomain) -> bool {
        self.all.contains(&domain)
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct DomainDetector {
    keywords: DomainKeywords,
    law_mention: Option<Regex>,
}

impl DomainDetector {
    pub fn new(keywords: DomainKeywords) -> Self {
        let law_mention = match Regex::new(r"([一-龥]+)法") {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!("Law-name pattern unavailable: {e}");
                None
            }
        };
        Self {
            keywords,
            law_mention,
        }
    }

    /// Primary domain: an explicit law name if present, otherwise the domain
    /// whose matched keyword is longest (earlier table entries win ties).
    pub fn detect(&self, text: &str) -> DomainHits {
        let hits = self.keywords.hits(text);
        let mut all: Vec<LegalDomain> = hits.iter().map(|(d, _)| *d).collect();

        if let Some(domain) = self.explicit_mention(text) {
            if !all.contains(&domain) {
                all.push(domain);
            }
            return DomainHits {
                primary: Some(domain),
                all,
                explicit: true,
            };
        }

        let mut primary: Option<(LegalDomain, usize)> = None;
        for (domain, len) in hits {
            if primary.is_none_or(|(_, best)| len > best) {
                primary = Some((domain, len));
            }
        }
        DomainHits {
            primary: primary.map(|(d, _)| d),
            all,
            explicit: false,
        }
    }

    fn explicit_mention(&self, text: &str) -> Option<LegalDomain> {
        let re = self.law_mention.as_ref()?;
        re.captures_iter(text).find_map(|caps| {
            let stem = caps.get(1)?.as_str();
            LAW_STEMS
                .iter()
                .find(|(s, _)| stem.contains(s))
                .map(|(_, d)| *d)
        })
    }
}

impl Default for DomainDetector {
    fn default() -> Self {
        Self::new(DomainKeywords::builtin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_keyword_wins() {
        let detector = DomainDetector::default();
        let hits = detector.detect("我的知识产权被侵犯了");
        assert_eq!(hits.primary, Some(LegalDomain::IntellectualProperty));
        assert!(hits.contains(LegalDomain::RealEstate));
        assert!(!hits.explicit);
    }

    #[test]
    fn table_order_breaks_ties() {
        let detector = DomainDetector::default();
        // "合同" is a labor and a contract keyword.
        let hits = detector.detect("合同到期了");
        assert_eq!(hits.primary, Some(LegalDomain::Labor));
        assert_eq!(hits.all, vec![LegalDomain::Labor, LegalDomain::Contract]);
    }

    #[test]
    fn explicit_law_name_overrides() {
        let detector = DomainDetector::default();
        let hits = detector.detect("合同法第五十二条怎么规定");
        assert_eq!(hits.primary, Some(LegalDomain::Contract));
        assert!(hits.explicit);

        let hits = detector.detect("刑法规定了什么");
        assert_eq!(hits.primary, Some(LegalDomain::Criminal));
    }

    #[test]
    fn unrelated_law_word_is_not_explicit() {
        let detector = DomainDetector::default();
        let hits = detector.detect("有什么办法");
        assert!(hits.is_empty());
        assert!(!hits.explicit);
    }

    #[test]
    fn nothing_detected() {
        assert!(DomainDetector::default().detect("华南公司").is_empty());
    }
}
