//! Language understanding for Slotwise.
//!
//! Everything here is a pure function of the utterance plus immutable tables:
//! - [`EntityExtractor`] pulls typed spans (people, organizations, durations, places)
//! - [`SentimentAnalyzer`] counts lexicon hits per polarity
//! - [`TfIdfScorer`] is the default lexical [`Scorer`](slotwise_core::Scorer)
//! - [`IntentClassifier`] picks a scenario node with hysteresis against the held intent
//! - [`DomainDetector`] spots domain keywords and explicit "xx法" mentions

pub mod entity;
pub mod intent;
pub mod keywords;
pub mod sentiment;
pub mod tfidf;

pub use entity::EntityExtractor;
pub use intent::{IntentClassifier, IntentOutcome, IntentSource};
pub use keywords::{DomainDetector, DomainHits};
pub use sentiment::SentimentAnalyzer;
pub use tfidf::{CharTokenizer, TfIdfScorer};
