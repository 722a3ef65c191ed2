//! End-to-end runs of the `sitewright` binary.

use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

use crate::common::conversation;

/// Run the binary with a config path that does not exist, so a developer's
/// own `~/.sitewright/config.toml` never leaks into assertions.
fn run(dir: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sitewright"))
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("SITEWRIGHT_CONFIG")
        .output()
        .expect("spawn sitewright")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "sitewright failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).expect("utf-8 stdout")
}

fn write_conversation(path: &Path, turns: usize) {
    let json = serde_json::to_string(&conversation(turns)).unwrap();
    std::fs::write(path, json).unwrap();
}

#[test]
fn stats_reports_role_counts() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("chat.json");
    write_conversation(&file, 4);

    let out = run(&dir, &["stats", file.to_str().unwrap()]);
    let stats: Value = serde_json::from_str(&stdout(&out)).unwrap();

    assert_eq!(stats["total_messages"], 5);
    assert_eq!(stats["system_messages"], 1);
    assert_eq!(stats["user_messages"], 2);
    assert_eq!(stats["assistant_messages"], 2);
}

#[test]
fn stats_accepts_iso_timestamps() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("chat.json");
    std::fs::write(
        &file,
        r#"[
            {"role":"user","content":"Add a contact form","timestamp":"2024-05-01T10:00:00.000Z"},
            {"role":"assistant","content":"Added.","timestamp":"2024-05-01T10:00:05.250Z",
             "metadata":{"model":"gpt-4o","temperature":1}}
        ]"#,
    )
    .unwrap();

    let out = run(&dir, &["stats", file.to_str().unwrap()]);
    let stats: Value = serde_json::from_str(&stdout(&out)).unwrap();

    assert_eq!(stats["total_messages"], 2);
    assert_eq!(stats["oldest_message"], "2024-05-01T10:00:00.000000000Z");
    assert_eq!(stats["newest_message"], "2024-05-01T10:00:05.250000000Z");
}

#[test]
fn prune_honours_flag_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("chat.json");
    let output = dir.path().join("pruned.json");
    write_conversation(&file, 20);

    let out = run(
        &dir,
        &[
            "prune",
            file.to_str().unwrap(),
            "--max-messages",
            "10",
            "--preserve-recent",
            "5",
            "--summary",
            "earlier: chose a theme",
            "-o",
            output.to_str().unwrap(),
        ],
    );
    assert!(out.status.success());

    let result: Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(result["messages"].as_array().unwrap().len(), 6);
    assert_eq!(result["pruned_count"], 15);
    assert_eq!(result["summary"], "earlier: chose a theme");
    assert_eq!(result["messages"][0]["role"], "system");
}

#[test]
fn unreadable_messages_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("chat.json");
    std::fs::write(&file, "{\"not\": \"an array\"}").unwrap();

    let out = run(&dir, &["stats", file.to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("not a JSON array of messages"));
}

#[test]
fn session_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("sessions.db");
    let store = store.to_str().unwrap();

    for (role, content) in [
        ("system", "You build sites."),
        ("user", "Make the header green"),
        ("assistant", "Done."),
    ] {
        let out = run(
            &dir,
            &[
                "session", "--store", store, "append", "demo", "--role", role, "--content",
                content,
            ],
        );
        stdout(&out);
    }

    let listed = stdout(&run(&dir, &["session", "--store", store, "list"]));
    assert_eq!(listed.trim(), "demo");

    let record: Value =
        serde_json::from_str(&stdout(&run(&dir, &["session", "--store", store, "show", "demo"])))
            .unwrap();
    assert_eq!(record["messages"].as_array().unwrap().len(), 3);
    assert_eq!(record["messages"][1]["content"], "Make the header green");

    let stats: Value =
        serde_json::from_str(&stdout(&run(&dir, &["session", "--store", store, "stats", "demo"])))
            .unwrap();
    assert_eq!(stats["system_messages"], 1);

    let cleared = stdout(&run(&dir, &["session", "--store", store, "clear", "demo"]));
    assert_eq!(cleared.trim(), "cleared demo");

    let missing = run(&dir, &["session", "--store", store, "show", "demo"]);
    assert!(!missing.status.success());
}

#[test]
fn config_file_sets_policy() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[context]\nmax_messages = 4\npreserve_recent_count = 2\n").unwrap();
    let file = dir.path().join("chat.json");
    write_conversation(&file, 10);

    let out = Command::new(env!("CARGO_BIN_EXE_sitewright"))
        .env("SITEWRIGHT_CONFIG", &config)
        .env_remove("RUST_LOG")
        .args(["prune", file.to_str().unwrap()])
        .output()
        .expect("spawn sitewright");
    let result: Value = serde_json::from_str(&stdout(&out)).unwrap();

    // system prompt plus the last two turns
    assert_eq!(result["messages"].as_array().unwrap().len(), 3);
    assert_eq!(result["pruned_count"], 8);
}
