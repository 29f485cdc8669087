//! Configuration loading, validation, and management for Slotwise.
//!
//! Loads engine settings from `~/.slotwise/config.toml` with environment
//! variable overrides, plus the two external tables the engine runs on:
//! the scenario graph (JSON) and the slot table (TOML). Either table falls
//! back to a built-in default when absent or unreadable.

pub mod dependencies;
pub mod lexicon;
pub mod scenario;
pub mod slots;

pub use dependencies::SlotDependencyGraph;
pub use lexicon::{DomainKeywords, Lexicon};
pub use scenario::ScenarioGraph;
pub use slots::SlotTable;

use serde::{Deserialize, Serialize};
use slotwise_core::LegalDomain;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.slotwise/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Intent classification settings
    #[serde(default)]
    pub intent: IntentConfig,

    /// Slot collection and questioning policy
    #[serde(default)]
    pub dialog: DialogConfig,

    /// Retrieval settings for fact summaries
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Session store settings
    #[serde(default)]
    pub session: SessionConfig,

    /// External table locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Extra phrases appended to the built-in lexicon
    #[serde(default)]
    pub lexicon: LexiconConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentConfig {
    /// Minimum score margin before a held intent is replaced
    #[serde(default = "default_switch_threshold")]
    pub switch_threshold: f32,

    /// Below this score the turn is out-of-domain
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// Search shallower graph levels first
    #[serde(default = "default_true")]
    pub hierarchical: bool,

    /// Score given to an intent resolved from a domain keyword
    #[serde(default = "default_keyword_fallback_score")]
    pub keyword_fallback_score: f32,
}

fn default_switch_threshold() -> f32 {
    0.2
}
fn default_confidence_threshold() -> f32 {
    0.2
}
fn default_keyword_fallback_score() -> f32 {
    0.5
}
fn default_true() -> bool {
    true
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            switch_threshold: default_switch_threshold(),
            confidence_threshold: default_confidence_threshold(),
            hierarchical: true,
            keyword_fallback_score: default_keyword_fallback_score(),
        }
    }
}

/// When a domain keyword for another domain resets collected slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainSwitchPolicy {
    /// Any keyword of a different domain switches immediately.
    #[default]
    Eager,
    /// Only explicit switch phrases ("换个话题") reset the conversation.
    Explicit,
}

/// What to ask once every required slot is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionalSlotPolicy {
    /// Ask each optional slot in turn.
    AskAll,
    /// Ask only the domain's diagnostic type slot.
    KeyOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogConfig {
    /// Turns kept in history
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Follow-up questions allowed per intent
    #[serde(default = "default_max_slot_asks")]
    pub max_slot_asks: u32,

    /// Past this many turns the tone switches to summarize-and-solve
    #[serde(default = "default_long_conversation_turns")]
    pub long_conversation_turns: u32,

    #[serde(default)]
    pub domain_switch: DomainSwitchPolicy,

    /// Let the raw utterance fill the pending slot when nothing else matched
    #[serde(default)]
    pub capture_pending_answers: bool,

    /// Per-domain optional slot policy, keyed by domain tag
    #[serde(default = "default_optional_slot_policy")]
    pub optional_slot_policy: BTreeMap<String, OptionalSlotPolicy>,
}

fn default_max_history() -> usize {
    10
}
fn default_max_slot_asks() -> u32 {
    2
}
fn default_long_conversation_turns() -> u32 {
    5
}
fn default_optional_slot_policy() -> BTreeMap<String, OptionalSlotPolicy> {
    LegalDomain::ALL
        .into_iter()
        .map(|d| {
            let policy = match d {
                LegalDomain::Labor
                | LegalDomain::Traffic
                | LegalDomain::RealEstate
                | LegalDomain::Contract => OptionalSlotPolicy::AskAll,
                _ => OptionalSlotPolicy::KeyOnly,
            };
            (d.as_str().to_string(), policy)
        })
        .collect()
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            max_slot_asks: default_max_slot_asks(),
            long_conversation_turns: default_long_conversation_turns(),
            domain_switch: DomainSwitchPolicy::Eager,
            capture_pending_answers: false,
            optional_slot_policy: default_optional_slot_policy(),
        }
    }
}

impl DialogConfig {
    /// The optional slot policy for `domain`. Unlisted domains ask key slots only.
    pub fn optional_policy(&self, domain: LegalDomain) -> OptionalSlotPolicy {
        self.optional_slot_policy
            .get(domain.as_str())
            .copied()
            .unwrap_or(OptionalSlotPolicy::KeyOnly)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Snippets requested per fact summary
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    5
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle seconds before a session is evicted (0 = never)
    #[serde(default = "default_max_idle_secs")]
    pub max_idle_secs: u64,
}

fn default_max_idle_secs() -> u64 {
    1800
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_idle_secs: default_max_idle_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Scenario graph JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<PathBuf>,

    /// Slot table TOML
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_table: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LexiconConfig {
    #[serde(default)]
    pub greetings: Vec<String>,

    #[serde(default)]
    pub skip_phrases: Vec<String>,

    #[serde(default)]
    pub switch_phrases: Vec<String>,
}

impl EngineConfig {
    /// Load configuration from the default path (~/.slotwise/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `SLOTWISE_SCENARIO`
    /// - `SLOTWISE_SLOT_TABLE`
    /// - `SLOTWISE_MAX_SLOT_ASKS`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(path) = std::env::var("SLOTWISE_SCENARIO") {
            self.paths.scenario = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("SLOTWISE_SLOT_TABLE") {
            self.paths.slot_table = Some(PathBuf::from(path));
        }
        if let Ok(raw) = std::env::var("SLOTWISE_MAX_SLOT_ASKS") {
            match raw.parse() {
                Ok(n) => self.dialog.max_slot_asks = n,
                Err(_) => tracing::warn!("Ignoring SLOTWISE_MAX_SLOT_ASKS={raw}: not a number"),
            }
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".slotwise")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.intent.switch_threshold) {
            return Err(ConfigError::ValidationError(
                "intent.switch_threshold must be between 0.0 and 1.0".into(),
            ));
        }
        if !unit.contains(&self.intent.confidence_threshold) {
            return Err(ConfigError::ValidationError(
                "intent.confidence_threshold must be between 0.0 and 1.0".into(),
            ));
        }
        if !unit.contains(&self.intent.keyword_fallback_score) {
            return Err(ConfigError::ValidationError(
                "intent.keyword_fallback_score must be between 0.0 and 1.0".into(),
            ));
        }
        if self.dialog.max_history == 0 {
            return Err(ConfigError::ValidationError(
                "dialog.max_history must be > 0".into(),
            ));
        }
        for key in self.dialog.optional_slot_policy.keys() {
            if LegalDomain::parse(key).is_none() {
                return Err(ConfigError::ValidationError(format!(
                    "dialog.optional_slot_policy: unknown domain '{key}'"
                )));
            }
        }
        Ok(())
    }

    /// Generate a default config TOML string (for the `config` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Invalid {table}: {reason}")]
    InvalidTable { table: String, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for slotwise_core::Error {
    fn from(err: ConfigError) -> Self {
        slotwise_core::Error::Config {
            message: err.to_string(),
        }
    }
}
