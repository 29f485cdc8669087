//! `slotwise doctor`: Check the configuration and the tables it points to.

use crate::commands::{config_file, load_config};
use slotwise_config::{ScenarioGraph, SlotDependencyGraph, SlotTable};
use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Slotwise Doctor — Table Diagnostics");
    println!("=====================================\n");

    let mut issues = 0;

    let file = config_file(config_path);
    let config = match load_config(config_path) {
        Ok(config) => {
            if file.exists() {
                println!("  ✅ Config file valid");
            } else {
                println!("  ✅ No config file, using defaults");
            }
            config
        }
        Err(e) => {
            println!("  ❌ Config file invalid: {e}");
            return Ok(());
        }
    };

    // Scenario graph
    let graph = match &config.paths.scenario {
        Some(path) => match ScenarioGraph::load(path) {
            Ok(graph) => {
                println!("  ✅ Scenario {} loaded ({} nodes)", graph.name(), graph.len());
                graph
            }
            Err(e) => {
                println!("  ❌ {e}");
                issues += 1;
                ScenarioGraph::builtin()
            }
        },
        None => {
            println!("  ✅ Built-in scenario ({} nodes)", ScenarioGraph::builtin().len());
            ScenarioGraph::builtin()
        }
    };
    let unreachable = graph.len() - graph.reachable().len();
    if unreachable > 0 {
        println!("  ⚠️  {unreachable} node(s) unreachable from any root");
        issues += 1;
    }
    let domain_nodes = graph.nodes().iter().filter(|n| n.domain().is_some()).count();
    if domain_nodes == 0 {
        println!("  ⚠️  No node carries a legal domain; every turn will be declined");
        issues += 1;
    }

    // Slot table
    let table = match &config.paths.slot_table {
        Some(path) => match SlotTable::load(path) {
            Ok(table) => {
                println!("  ✅ Slot table loaded ({} slots)", table.len());
                table
            }
            Err(e) => {
                println!("  ❌ {e}");
                issues += 1;
                SlotTable::builtin()
            }
        },
        None => {
            println!("  ✅ Built-in slot table");
            SlotTable::builtin()
        }
    };
    for key in table.unmatched() {
        println!("  ⚠️  Slot {key} has no usable pattern");
        issues += 1;
    }

    match SlotDependencyGraph::from_table(&table) {
        Ok(_) => println!("  ✅ Slot dependencies acyclic"),
        Err(e) => {
            println!("  ❌ {e}");
            issues += 1;
        }
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
