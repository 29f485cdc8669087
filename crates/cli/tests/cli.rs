//! Drives the `slotwise` binary end to end.

use serde_json::Value;
use std::path::Path;
use std::process::{Command, Output};

fn slotwise(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_slotwise"))
        .arg("--config")
        .arg(dir.join("config.toml"))
        .args(args)
        .env("HOME", dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run slotwise")
}

fn turn(dir: &Path, message: &str, memory: Option<&Path>) -> Value {
    let memory_arg = memory.map(|p| p.to_string_lossy().into_owned());
    let mut args = vec!["turn", "-m", message];
    if let Some(path) = memory_arg.as_deref() {
        args.extend(["--memory", path]);
    }
    let output = slotwise(dir, &args);
    assert!(
        output.status.success(),
        "turn failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("turn prints JSON")
}

#[test]
fn turn_asks_for_the_first_missing_slot() {
    let dir = tempfile::tempdir().unwrap();
    let report = turn(dir.path(), "我被辞退了", None);
    assert_eq!(report["directive"]["kind"], "ask");
    assert_eq!(report["directive"]["slot"], "employer");
    assert_eq!(report["reply"], report["directive"]["prompt"]);
    assert_eq!(report["state"]["domain"], "labor");
}

#[test]
fn direct_query_proceeds_with_a_generated_reply() {
    let dir = tempfile::tempdir().unwrap();
    let report = turn(dir.path(), "劳动法第四十七条是什么", None);
    assert_eq!(report["directive"]["kind"], "proceed");
    assert_eq!(report["directive"]["summary"]["bypass"], "direct_query");
    let reply = report["reply"].as_str().unwrap();
    assert!(reply.ends_with("用户问题：劳动法第四十七条是什么"));
}

#[test]
fn memory_file_carries_the_conversation() {
    let dir = tempfile::tempdir().unwrap();
    let memory = dir.path().join("memory.json");

    turn(dir.path(), "我被辞退了", Some(&memory));
    assert!(memory.exists());

    let report = turn(dir.path(), "你好", Some(&memory));
    assert_eq!(report["directive"]["kind"], "greet");
    assert_eq!(report["state"]["turn_count"], 2);
}

#[test]
fn corrupt_memory_file_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let memory = dir.path().join("memory.json");
    std::fs::write(&memory, "{ definitely not json").unwrap();

    let report = turn(dir.path(), "你好", Some(&memory));
    assert_eq!(report["state"]["turn_count"], 1);
}

#[test]
fn empty_utterance_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = slotwise(dir.path(), &["turn", "-m", "   "]);
    assert!(!output.status.success());
}

#[test]
fn default_config_is_printed() {
    let dir = tempfile::tempdir().unwrap();
    let output = slotwise(dir.path(), &["config", "default"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("max_slot_asks = 2"));
    assert!(stdout.contains("[intent]"));
}

#[test]
fn doctor_checks_external_tables() {
    let dir = tempfile::tempdir().unwrap();
    let data = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data");
    let config = format!(
        "[paths]\nscenario = {:?}\nslot_table = {:?}\n",
        data.join("legal.json").display().to_string(),
        data.join("slots.toml").display().to_string(),
    );
    std::fs::write(dir.path().join("config.toml"), config).unwrap();

    let output = slotwise(dir.path(), &["doctor"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Scenario legal loaded (5 nodes)"), "{stdout}");
    assert!(stdout.contains("All checks passed"), "{stdout}");
}

#[test]
fn doctor_passes_on_builtin_tables() {
    let dir = tempfile::tempdir().unwrap();
    let output = slotwise(dir.path(), &["doctor"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("All checks passed"));
}
