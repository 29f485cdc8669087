//! TF-IDF lexical similarity.
//!
//! The corpus is every example phrase in the scenario graph. IDF is
//! `1 + sqrt(N / (df + 1))`; tokens the corpus never saw carry no weight.

use slotwise_config::ScenarioGraph;
use slotwise_core::{Scorer, ScorerError, Tokenizer};
use std::collections::{HashMap, HashSet};

const STOPWORDS: &[&str] = &[
    "的", "了", "和", "是", "就", "都", "而", "及", "与", "有", "在", "对", "以", "于", "为", "一个",
    "我", "你", "他", "她", "它", "我们", "你们", "他们", "她们", "它们", "这", "那", "这些", "那些",
    "这里", "那里", "自己", "这个", "那个", "之一", "首先", "其次", "最后", "然后", "但是", "然而",
    "所以", "因此", "因为", "由于", "如果", "要是", "比如", "例如", "或者", "还是", "并且", "而且",
    "虽然", "尽管", "不过", "只是", "只有", "只要", "除非", "否则", "于是", "从而", "同时", "另外",
    "还有", "以及", "像",
];

fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// Splits CJK runs into single characters plus adjacent bigrams, and other
/// alphanumeric runs into lowercase words. Everything else is a separator.
#[derive(Debug, Clone)]
pub struct CharTokenizer {
    stopwords: HashSet<String>,
}

impl Default for CharTokenizer {
    fn default() -> Self {
        Self {
            stopwords: STOPWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl CharTokenizer {
    fn flush_cjk(&self, run: &mut Vec<char>, out: &mut Vec<String>) {
        for (i, c) in run.iter().enumerate() {
            out.push(c.to_string());
            if let Some(next) = run.get(i + 1) {
                out.push(format!("{c}{next}"));
            }
        }
        run.clear();
    }
}

impl Tokenizer for CharTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut cjk: Vec<char> = Vec::new();
        let mut word = String::new();

        for c in text.chars() {
            if is_cjk(c) {
                if !word.is_empty() {
                    tokens.push(std::mem::take(&mut word));
                }
                cjk.push(c);
            } else if c.is_alphanumeric() {
                self.flush_cjk(&mut cjk, &mut tokens);
                word.extend(c.to_lowercase());
            } else {
                self.flush_cjk(&mut cjk, &mut tokens);
                if !word.is_empty() {
                    tokens.push(std::mem::take(&mut word));
                }
            }
        }
        self.flush_cjk(&mut cjk, &mut tokens);
        if !word.is_empty() {
            tokens.push(word);
        }

        tokens.retain(|t| !self.stopwords.contains(t));
        tokens
    }
}

/// Lexical scorer over a fixed corpus.
pub struct TfIdfScorer {
    tokenizer: Box<dyn Tokenizer>,
    idf: HashMap<String, f64>,
}

impl TfIdfScorer {
    /// Build from every example phrase in `graph`.
    pub fn from_graph(graph: &ScenarioGraph) -> Self {
        Self::from_documents(graph.intent_phrases(), Box::new(CharTokenizer::default()))
    }

    pub fn from_documents<'a>(
        documents: impl IntoIterator<Item = &'a str>,
        tokenizer: Box<dyn Tokenizer>,
    ) -> Self {
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut doc_count = 0usize;
        for doc in documents {
            doc_count += 1;
            let unique: HashSet<String> = tokenizer.tokenize(doc).into_iter().collect();
            for token in unique {
                *doc_freq.entry(token).or_default() += 1;
            }
        }

        let n = doc_count as f64;
        let idf = doc_freq
            .into_iter()
            .map(|(token, df)| (token, 1.0 + (n / (df as f64 + 1.0)).sqrt()))
            .collect();

        tracing::debug!("TF-IDF corpus built from {doc_count} phrases");
        Self { tokenizer, idf }
    }

    pub fn vocabulary_len(&self) -> usize {
        self.idf.len()
    }

    fn vector(&self, text: &str) -> HashMap<String, f64> {
        let tokens = self.tokenizer.tokenize(text);
        if tokens.is_empty() {
            return HashMap::new();
        }
        let step = 1.0 / tokens.len() as f64;
        let mut tf: HashMap<String, f64> = HashMap::new();
        for token in tokens {
            *tf.entry(token).or_default() += step;
        }
        tf.into_iter()
            .filter_map(|(token, tf)| self.idf.get(&token).map(|idf| (token, tf * idf)))
            .collect()
    }
}

/// Cosine over sparse vectors. Zero when either side has no weight.
fn cosine(a: &HashMap<String, f64>, b: &HashMap<String, f64>) -> f32 {
    let dot: f64 = a
        .iter()
        .filter_map(|(token, x)| b.get(token).map(|y| x * y))
        .sum();
    let norm_a = a.values().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.values().map(|y| y * y).sum::<f64>().sqrt();

    let denom = norm_a * norm_b;
    if denom < 1e-10 {
        return 0.0;
    }
    (dot / denom).clamp(0.0, 1.0) as f32
}

impl Scorer for TfIdfScorer {
    fn name(&self) -> &str {
        "tfidf"
    }

    fn similarity(&self, a: &str, b: &str) -> Result<f32, ScorerError> {
        if self.idf.is_empty() {
            return Err(ScorerError::Unavailable("TF-IDF corpus is empty".into()));
        }
        Ok(cosine(&self.vector(a), &self.vector(b)))
    }
}
