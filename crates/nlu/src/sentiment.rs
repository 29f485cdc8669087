//! Lexicon sentiment.
//!
//! Each polarity scores the number of distinct lexicon words found in the
//! text. The highest score wins; ties resolve positive, then negative, then
//! neutral, and a text with no hits at all is neutral.

use slotwise_core::{Sentiment, SentimentReading, SentimentScores};

const POSITIVE: &[&str] = &["谢谢", "感谢", "好的", "满意", "不错", "很好", "太棒了", "感谢您"];

const NEGATIVE: &[&str] = &[
    "不", "不是", "不行", "不好", "不满意", "糟糕", "差", "坏", "讨厌", "生气", "难过", "痛苦",
    "悲伤", "愤怒", "失望", "委屈", "不公平", "投诉", "抗议",
];

const NEUTRAL: &[&str] = &["请问", "咨询", "了解", "需要", "想", "知道", "如何", "怎样", "什么", "哪里"];

#[derive(Debug, Clone)]
pub struct SentimentAnalyzer {
    positive: Vec<String>,
    negative: Vec<String>,
    neutral: Vec<String>,
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SentimentAnalyzer {
    pub fn builtin() -> Self {
        let owned = |words: &[&str]| {
            let mut out: Vec<String> = Vec::new();
            for w in words {
                if !out.iter().any(|o| o == w) {
                    out.push(w.to_string());
                }
            }
            out
        };
        Self {
            positive: owned(POSITIVE),
            negative: owned(NEGATIVE),
            neutral: owned(NEUTRAL),
        }
    }

    pub fn analyze(&self, text: &str) -> SentimentReading {
        let count = |words: &[String]| words.iter().filter(|w| text.contains(w.as_str())).count() as u32;
        let scores = SentimentScores {
            positive: count(&self.positive),
            negative: count(&self.negative),
            neutral: count(&self.neutral),
        };

        let label = if scores.positive == 0 && scores.negative == 0 && scores.neutral == 0 {
            Sentiment::Neutral
        } else if scores.positive >= scores.negative && scores.positive >= scores.neutral {
            Sentiment::Positive
        } else if scores.negative >= scores.neutral {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        };

        SentimentReading { label, scores }
    }
}
