//! CLI integration tests.
//!
//! These tests exercise the CLI commands end-to-end.

use histree_test_utils::fixtures::{BuiltTestProject, TestProject};
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn histree(root: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_histree"));
    command
        .arg("--root")
        .arg(root)
        .env_remove("RUST_LOG")
        .env_remove("HISTREE_DEBOUNCE_SECS")
        .env_remove("HISTREE_KEEP_COUNT")
        .env_remove("HISTREE_MAX_FILE_SIZE")
        .env_remove("HISTREE_AUTO_CLEANUP");
    command
}

fn run(root: &Path, args: &[&str], project: &BuiltTestProject) -> Output {
    histree(root)
        .args(args)
        .arg(project.path())
        .output()
        .expect("Failed to execute command")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn list_json(root: &Path, project: &BuiltTestProject) -> Vec<serde_json::Value> {
    let output = run(root, &["list", "--json"], project);
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).expect("list --json prints a JSON array")
}

fn project() -> BuiltTestProject {
    TestProject::new()
        .with_file("a.txt", "A")
        .with_file("src/lib.rs", "pub fn f() {}")
        .with_file(".git/HEAD", "ref: refs/heads/main")
        .build()
}

#[test]
fn test_help_command() {
    let output = Command::new(env!("CARGO_BIN_EXE_histree"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Snapshot and restore project directories"));
    for command in ["snapshot", "list", "show", "restore", "delete", "cleanup", "stats"] {
        assert!(text.contains(command), "help is missing {command}");
    }
}

#[test]
fn test_snapshot_and_list() {
    let root = TempDir::new().unwrap();
    let project = project();

    let output = run(root.path(), &["snapshot", "--label", "first"], &project);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Created snapshot"));
    assert!(stdout(&output).contains("2 files"));

    let snapshots = list_json(root.path(), &project);
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0]["label"], "first");
    assert_eq!(snapshots[0]["stats"]["totalFiles"], 2);
}

#[test]
fn test_snapshot_is_debounced_without_force() {
    let root = TempDir::new().unwrap();
    let project = project();

    assert!(run(root.path(), &["snapshot"], &project).status.success());

    let output = run(root.path(), &["snapshot"], &project);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Skipped"));
    assert_eq!(list_json(root.path(), &project).len(), 1);

    let output = run(root.path(), &["snapshot", "--force"], &project);
    assert!(output.status.success());
    assert_eq!(list_json(root.path(), &project).len(), 2);
}

#[test]
fn test_restore_command() {
    let root = TempDir::new().unwrap();
    let project = project();

    assert!(run(root.path(), &["snapshot"], &project).status.success());
    let id = list_json(root.path(), &project)[0]["id"]
        .as_str()
        .unwrap()
        .to_string();

    project.write_file("a.txt", "edited");
    project.write_file("notes.md", "new file");

    let output = run(root.path(), &["restore", &id], &project);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("Previous state saved as snapshot"));

    assert_eq!(project.read_file("a.txt"), "A");
    assert!(!project.file_exists("notes.md"));
    assert!(project.file_exists(".git/HEAD"));
    // The restore left a checkpoint behind.
    assert_eq!(list_json(root.path(), &project).len(), 2);
}

#[test]
fn test_show_command() {
    let root = TempDir::new().unwrap();
    let project = project();

    assert!(run(root.path(), &["snapshot", "--source", "test"], &project)
        .status
        .success());
    let id = list_json(root.path(), &project)[0]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let output = run(root.path(), &["show", &id], &project);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Source: test"));
    assert!(text.contains("src/lib.rs"));

    let output = run(root.path(), &["show", &id, "--json"], &project);
    let manifest: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(manifest["files"].as_array().unwrap().len(), 2);
    assert_eq!(manifest["files"][0]["stored"], true);
}

#[test]
fn test_show_unknown_snapshot_fails() {
    let root = TempDir::new().unwrap();
    let project = project();

    let output = run(root.path(), &["show", "1700000000000"], &project);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Snapshot not found"));
}

#[test]
fn test_delete_rejects_invalid_id() {
    let root = TempDir::new().unwrap();
    let project = project();

    let output = run(root.path(), &["delete", "../../etc"], &project);
    assert!(!output.status.success());
}

#[test]
fn test_delete_and_cleanup_commands() {
    let root = TempDir::new().unwrap();
    let project = project();

    for _ in 0..3 {
        assert!(run(root.path(), &["snapshot", "--force"], &project)
            .status
            .success());
    }
    let ids: Vec<String> = list_json(root.path(), &project)
        .iter()
        .map(|s| s["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids.len(), 3);

    let output = run(root.path(), &["delete", &ids[2]], &project);
    assert!(output.status.success());
    assert_eq!(list_json(root.path(), &project).len(), 2);

    let output = run(root.path(), &["cleanup", "--keep", "1"], &project);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Removed 1 snapshot(s)"));

    let remaining = list_json(root.path(), &project);
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["id"], ids[0].as_str());
}

#[test]
fn test_stats_command() {
    let root = TempDir::new().unwrap();
    let project = project();

    assert!(run(root.path(), &["snapshot"], &project).status.success());
    let output = run(root.path(), &["stats"], &project);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Snapshots: 1"));
    assert!(text.contains("Objects:"));
}

#[test]
fn test_log_file_receives_events() {
    let root = TempDir::new().unwrap();
    let logs = TempDir::new().unwrap();
    let log_path = logs.path().join("nested/histree.log");
    let project = project();

    let output = histree(root.path())
        .arg(format!("--log-file={}", log_path.display()))
        .args(["snapshot", "--label", "logged"])
        .arg(project.path())
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());

    let log = std::fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("Created snapshot"));
    assert!(output.stderr.is_empty());
}

#[test]
fn test_config_file_is_honored() {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("config.json"), r#"{"enabled": false}"#).unwrap();
    let project = project();

    let output = run(root.path(), &["snapshot"], &project);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("disabled"));
}
