//! Phrase tables that steer a turn before any scoring happens.
//!
//! Greeting, small-talk, switch and skip phrases, direct-knowledge-query
//! shapes, and the per-domain keyword table. All matching is substring based
//! except short ASCII entries, which must match a whole word so "hi" does not
//! fire inside "this".

use crate::LexiconConfig;
use regex_lite::Regex;
use slotwise_core::LegalDomain;

const GREETINGS: &[&str] = &["你好", "您好", "hi", "hello", "嗨", "早安", "午安", "晚安"];

const SMALL_TALK: &[&str] = &[
    "我不好", "我很好", "谢谢", "不客气", "好的", "知道了", "再见", "拜拜", "nice", "good", "ok",
    "yes", "no", "什么意思", "我不想问你", "弄不好", "不想", "不要",
];

const SWITCH_PHRASES: &[&str] = &[
    "另一个", "换个", "其他", "别的", "新的", "不同的", "其他问题", "换个话题", "换个问题",
];

const SKIP_PHRASES: &[&str] = &[
    "先回答", "直接回答", "先告诉我", "先说", "别问了", "不想回答", "不要问了", "跳过", "不重要",
    "你先说", "回答我的问题", "先回复", "你倒是说啊", "快回答", "不用问", "不需要", "直接说",
];

/// Characters that, on their own, signal impatience.
const IMPATIENT_MARKS: &[char] = &['?', '？', '!', '！', '.', '。', '…'];

const KNOWLEDGE_INDICATORS: &[&str] = &[
    "规定了什么", "怎么规定", "如何规定", "法律规定", "法律依据", "法条", "司法解释", "最高法",
    "诉讼时效", "构成要件", "法律责任", "处罚标准",
];

const KNOWLEDGE_PATTERNS: &[&str] = &[
    // statute and article lookups
    r".{1,10}法.{0,5}第.{1,10}[条章节]",
    r".{1,10}法.{0,5}第?[0-9]+条",
    r"第.{1,10}[条章节].{0,5}(规定|内容|说)",
    r".{1,10}(条例|规定|办法|细则)",
    // definitions and concepts
    r"什么是.+",
    r".+是什么",
    r".+的(定义|含义|意思|概念|区别|区分)",
    r"(解释|说明|介绍).+",
    r".+(怎么理解|如何理解)",
    r"(哪些|有什么).+(情形|条件|要求|类型)",
];

/// Greeting/small-talk/skip/switch phrase sets plus direct-query shapes.
#[derive(Debug, Clone)]
pub struct Lexicon {
    greetings: Vec<String>,
    small_talk: Vec<String>,
    switch_phrases: Vec<String>,
    skip_phrases: Vec<String>,
    knowledge_indicators: Vec<String>,
    knowledge_patterns: Vec<Regex>,
    domains: DomainKeywords,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Lexicon {
    pub fn builtin() -> Self {
        Self {
            greetings: owned(GREETINGS),
            small_talk: owned(SMALL_TALK),
            switch_phrases: owned(SWITCH_PHRASES),
            skip_phrases: owned(SKIP_PHRASES),
            knowledge_indicators: owned(KNOWLEDGE_INDICATORS),
            knowledge_patterns: compile_patterns(KNOWLEDGE_PATTERNS),
            domains: DomainKeywords::builtin(),
        }
    }

    /// Built-in tables extended with user-supplied phrases.
    pub fn with_config(config: &LexiconConfig) -> Self {
        let mut lexicon = Self::builtin();
        lexicon.greetings.extend(config.greetings.iter().cloned());
        lexicon.skip_phrases.extend(config.skip_phrases.iter().cloned());
        lexicon.switch_phrases.extend(config.switch_phrases.iter().cloned());
        lexicon
    }

    pub fn domains(&self) -> &DomainKeywords {
        &self.domains
    }

    pub fn is_greeting(&self, text: &str) -> bool {
        contains_any(text, &self.greetings)
    }

    pub fn is_small_talk(&self, text: &str) -> bool {
        contains_any(text, &self.small_talk)
    }

    /// Explicit request to change topic.
    pub fn is_switch_request(&self, text: &str) -> bool {
        contains_any(text, &self.switch_phrases)
    }

    /// "Stop asking me" phrasing, or an utterance of bare punctuation.
    pub fn is_skip_request(&self, text: &str) -> bool {
        let trimmed = text.trim();
        if !trimmed.is_empty() && trimmed.chars().all(|c| IMPATIENT_MARKS.contains(&c)) {
            return true;
        }
        contains_any(trimmed, &self.skip_phrases)
    }

    /// Statute/article lookups, definitions, or "what does the law say".
    pub fn is_direct_query(&self, text: &str) -> bool {
        self.knowledge_patterns.iter().any(|re| re.is_match(text))
            || self
                .knowledge_indicators
                .iter()
                .any(|i| text.contains(i.as_str()))
    }
}

/// Per-domain keyword table.
#[derive(Debug, Clone)]
pub struct DomainKeywords {
    entries: Vec<(LegalDomain, Vec<String>)>,
}

impl DomainKeywords {
    pub fn builtin() -> Self {
        let table: [(LegalDomain, &[&str]); 8] = [
            (
                LegalDomain::Labor,
                &["劳动", "辞退", "解雇", "开除", "工资", "加班", "合同", "离职", "社保", "工伤"],
            ),
            (
                LegalDomain::Marriage,
                &["婚姻", "离婚", "结婚", "子女", "继承", "家暴", "想离婚"],
            ),
            (
                LegalDomain::Traffic,
                &["交通", "车祸", "事故", "碰撞", "追尾", "肇事"],
            ),
            (
                LegalDomain::RealEstate,
                &["房产", "买房", "卖房", "租房", "产权", "拆迁", "装修"],
            ),
            (
                LegalDomain::IntellectualProperty,
                &["知识产权", "专利", "商标", "著作权", "版权"],
            ),
            (
                LegalDomain::Criminal,
                &[
                    "刑事", "犯罪", "罪名", "盗窃", "偷", "被偷", "偷盗", "失窃", "抢劫", "被抢", "抢夺",
                    "故意伤害", "被打", "打人", "打架", "伤害",
                ],
            ),
            (LegalDomain::Administrative, &["行政", "诉讼", "复议", "处罚"]),
            (LegalDomain::Contract, &["合同", "违约", "买卖", "租赁", "借款"]),
        ];
        Self {
            entries: table
                .into_iter()
                .map(|(d, words)| (d, owned(words)))
                .collect(),
        }
    }

    /// Keywords for one domain.
    pub fn keywords(&self, domain: LegalDomain) -> &[String] {
        self.entries
            .iter()
            .find(|(d, _)| *d == domain)
            .map(|(_, words)| words.as_slice())
            .unwrap_or(&[])
    }

    /// Every domain with at least one keyword in `text`, each paired with the
    /// length in chars of its longest hit. Table order is preserved.
    pub fn hits(&self, text: &str) -> Vec<(LegalDomain, usize)> {
        self.entries
            .iter()
            .filter_map(|(domain, words)| {
                words
                    .iter()
                    .filter(|w| text.contains(w.as_str()))
                    .map(|w| w.chars().count())
                    .max()
                    .map(|len| (*domain, len))
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LegalDomain, &[String])> {
        self.entries.iter().map(|(d, w)| (*d, w.as_slice()))
    }
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

fn compile_patterns(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!("Skipping malformed pattern {p:?}: {e}");
                None
            }
        })
        .collect()
}

fn contains_any(text: &str, phrases: &[String]) -> bool {
    let lower = text.to_lowercase();
    phrases.iter().any(|p| {
        if p.is_ascii() {
            lower
                .split(|c: char| !c.is_ascii_alphanumeric())
                .any(|word| word == p.as_str())
        } else {
            text.contains(p.as_str())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_knowledge_patterns_compile() {
        assert_eq!(
            compile_patterns(KNOWLEDGE_PATTERNS).len(),
            KNOWLEDGE_PATTERNS.len()
        );
    }

    #[test]
    fn ascii_greetings_match_whole_words() {
        let lexicon = Lexicon::builtin();
        assert!(lexicon.is_greeting("你好"));
        assert!(lexicon.is_greeting("Hi there"));
        assert!(!lexicon.is_greeting("this is about my contract"));
    }

    #[test]
    fn small_talk_detection() {
        let lexicon = Lexicon::builtin();
        assert!(lexicon.is_small_talk("好的，谢谢"));
        assert!(lexicon.is_small_talk("OK"));
        assert!(!lexicon.is_small_talk("我被辞退了"));
    }

    #[test]
    fn skip_requests_include_bare_punctuation() {
        let lexicon = Lexicon::builtin();
        assert!(lexicon.is_skip_request("别问了，直接说吧"));
        assert!(lexicon.is_skip_request("？？"));
        assert!(lexicon.is_skip_request("..."));
        assert!(!lexicon.is_skip_request("华南公司"));
    }

    #[test]
    fn direct_query_shapes() {
        let lexicon = Lexicon::builtin();
        assert!(lexicon.is_direct_query("劳动法第二十条"));
        assert!(lexicon.is_direct_query("民法典第1087条怎么说"));
        assert!(lexicon.is_direct_query("什么是经济补偿金"));
        assert!(lexicon.is_direct_query("诉讼时效是多久"));
        assert!(!lexicon.is_direct_query("我被辞退了"));
        assert!(!lexicon.is_direct_query("华南公司"));
    }

    #[test]
    fn domain_hits_report_longest_keyword() {
        let keywords = DomainKeywords::builtin();
        let hits = keywords.hits("我的知识产权被侵犯了");
        assert!(hits.contains(&(LegalDomain::RealEstate, 2)));
        assert!(hits.contains(&(LegalDomain::IntellectualProperty, 4)));
        assert!(keywords.hits("华南公司").is_empty());
    }

    #[test]
    fn config_extends_builtin_phrases() {
        let config = LexiconConfig {
            greetings: vec!["在吗".into()],
            skip_phrases: vec![],
            switch_phrases: vec!["聊点别的事".into()],
        };
        let lexicon = Lexicon::with_config(&config);
        assert!(lexicon.is_greeting("在吗"));
        assert!(lexicon.is_switch_request("聊点别的事"));
    }
}
