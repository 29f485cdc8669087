//! `slotwise turn`: One utterance in, one JSON outcome out.
//!
//! With `--memory`, the dialog memory is read from that file before the turn
//! and written back after it, so a conversation can be driven one process
//! call at a time.

use crate::commands::{build_engine, load_config};
use crate::responder::{TemplateResponder, reply};
use serde::Serialize;
use slotwise_core::DialogMemory;
use slotwise_dialog::TurnOutcome;
use std::path::Path;

#[derive(Serialize)]
struct TurnReport {
    #[serde(flatten)]
    outcome: TurnOutcome,
    reply: String,
}

pub async fn run(
    config_path: Option<&Path>,
    message: &str,
    memory_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let engine = build_engine(config);

    let mut memory = match memory_path {
        Some(path) if path.exists() => read_memory(path)?,
        _ => DialogMemory::new(),
    };

    let outcome = engine.process_turn(message, &mut memory)?;
    let text = reply(&TemplateResponder, &outcome.directive).await?;
    engine.record_response(&mut memory, &text);

    if let Some(path) = memory_path {
        std::fs::write(path, memory.to_snapshot()?)?;
        tracing::debug!("Dialog memory saved to {}", path.display());
    }

    let report = TurnReport {
        outcome,
        reply: text,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// A snapshot that fails to parse starts a fresh conversation.
fn read_memory(path: &Path) -> Result<DialogMemory, std::io::Error> {
    let json = std::fs::read_to_string(path)?;
    Ok(DialogMemory::from_snapshot(&json).unwrap_or_else(|e| {
        tracing::warn!("{e}; starting a fresh conversation");
        DialogMemory::new()
    }))
}
