//! `slotwise config`: Configuration management commands.

use crate::commands::{config_file, load_config};
use slotwise_config::EngineConfig;
use std::path::Path;

pub async fn validate(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match load_config(config_path) {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let mut warnings = Vec::new();
            for (name, path) in [
                ("Scenario", &config.paths.scenario),
                ("Slot table", &config.paths.slot_table),
            ] {
                if let Some(path) = path {
                    if !path.exists() {
                        warnings.push(format!(
                            "{name} file {} does not exist; the built-in table will be used",
                            path.display()
                        ));
                    }
                }
            }
            if config.dialog.max_slot_asks == 0 {
                warnings.push("dialog.max_slot_asks = 0: no follow-up questions will be asked".into());
            }
            if config.session.max_idle_secs == 0 {
                warnings.push("session.max_idle_secs = 0: idle sessions are never evicted".into());
            }

            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Switch margin:   {}", config.intent.switch_threshold);
            println!("   Confidence gate: {}", config.intent.confidence_threshold);
            println!("   Max slot asks:   {}", config.dialog.max_slot_asks);
            println!("   Domain switch:   {:?}", config.dialog.domain_switch);
            println!("   History:         {} turns", config.dialog.max_history);
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn default() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", EngineConfig::default_toml());
    Ok(())
}

pub async fn path(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", config_file(config_path).display());
    Ok(())
}
