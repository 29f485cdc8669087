//! `slotwise chat`: Interactive consultation session.

use crate::commands::{build_engine, load_config};
use crate::responder::{TemplateResponder, reply};
use slotwise_dialog::SessionStore;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, BufReader};

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let engine = build_engine(config);
    let scenario = engine.graph().name().to_string();
    let nodes = engine.graph().len();
    let slots = engine.slot_table().len();

    let store = SessionStore::new(Arc::new(engine));
    let mut session = uuid::Uuid::new_v4().to_string();
    let responder = TemplateResponder;

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║       Slotwise — Legal Consultation Chat     ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Scenario:  {scenario} ({nodes} nodes)");
    println!("  Slots:     {slots}");
    println!();
    println!("  Describe your legal problem and press Enter.");
    println!("  Type '/reset' to start over, 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(io::stdin()).lines();
    prompt()?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => {
                prompt()?;
                continue;
            }
            "exit" | "quit" => break,
            "/reset" => {
                store.reset(&session).await;
                session = uuid::Uuid::new_v4().to_string();
                println!("  [Session reset]");
                println!();
                prompt()?;
                continue;
            }
            _ => {}
        }

        match store.process(&session, line).await {
            Ok(outcome) => {
                for conflict in &outcome.conflicts {
                    tracing::debug!("Conflict: {conflict:?}");
                }
                match reply(&responder, &outcome.directive).await {
                    Ok(text) => {
                        store.record_response(&session, &text).await?;
                        println!();
                        for l in text.lines() {
                            println!("  Assistant > {l}");
                        }
                        println!();
                    }
                    Err(e) => eprintln!("  [Error] {e}"),
                }
            }
            Err(e) => eprintln!("  [Error] {e}"),
        }
        prompt()?;
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}
