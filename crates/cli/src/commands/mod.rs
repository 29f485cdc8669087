pub mod chat;
pub mod config_cmd;
pub mod doctor;
pub mod turn;

use slotwise_config::{ConfigError, EngineConfig};
use slotwise_dialog::DialogEngine;
use slotwise_nlu::TfIdfScorer;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// `--config` if given, otherwise `~/.slotwise/config.toml` with env overrides.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, ConfigError> {
    match path {
        Some(path) => EngineConfig::load_from(path),
        None => EngineConfig::load(),
    }
}

pub fn config_file(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(|| EngineConfig::config_dir().join("config.toml"))
}

/// Engine over the configured tables, scored by TF-IDF over the scenario's
/// intent phrases.
pub fn build_engine(config: EngineConfig) -> DialogEngine {
    let engine = DialogEngine::from_config(config);
    let scorer = TfIdfScorer::from_graph(engine.graph());
    tracing::debug!("TF-IDF vocabulary: {} terms", scorer.vocabulary_len());
    engine.with_scorer(Arc::new(scorer))
}
