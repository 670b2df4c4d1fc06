//! Unit tests for the command-line entry points.
//!
//! Each test runs a built binary against a temp workspace. An agent CLI
//! that does not exist keeps the orchestrator from reaching anything real.

use std::path::Path;
use std::process::{Command, Output};

use serial_test::serial;

const ORCHESTRATOR: &str = env!("CARGO_BIN_EXE_taskvault");
const WATCHER: &str = env!("CARGO_BIN_EXE_taskvault-watch");

fn run(bin: &str, args: &[&str], cwd: &Path) -> Output {
    Command::new(bin)
        .args(args)
        .current_dir(cwd)
        .env("RUST_LOG", "info")
        .output()
        .expect("binary runs")
}

fn write_config(workspace: &Path, cli: &str) {
    std::fs::write(
        workspace.join("taskvault.toml"),
        format!("[agent]\ncli = '{cli}'\n"),
    )
    .expect("write config");
}

#[test]
#[serial]
fn missing_workspace_prints_usage_and_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = run(ORCHESTRATOR, &["does-not-exist"], dir.path());

    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Usage"), "stderr: {stderr}");
}

#[test]
#[serial]
fn omitted_workspace_without_default_folder_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = run(ORCHESTRATOR, &[], dir.path());
    assert_eq!(out.status.code(), Some(1));
}

#[test]
#[serial]
fn once_initializes_workspace_and_exits_zero() {
    let dir = tempfile::tempdir().expect("tempdir");
    let workspace = dir.path().join("AI_Employee_Vault");
    std::fs::create_dir(&workspace).expect("mkdir");
    write_config(&workspace, "taskvault-test-missing-agent");

    // No positional argument: the default folder in the cwd is used.
    let out = run(ORCHESTRATOR, &["--once"], dir.path());
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );

    assert!(workspace.join("Needs_Action").is_dir());
    let dashboard = std::fs::read_to_string(workspace.join("Dashboard.md")).expect("dashboard");
    assert!(dashboard.contains("| Pending Tasks | 0 | ✅ Clear |"));

    let log = std::fs::read_dir(workspace.join("Logs"))
        .expect("logs")
        .filter_map(Result::ok)
        .find(|e| e.file_name().to_string_lossy().starts_with("orchestrator_"))
        .expect("daily orchestrator log must exist");
    let text = std::fs::read_to_string(log.path()).expect("read log");
    assert!(
        text.contains("orchestrator bootstrap"),
        "buffered log lines are flushed on exit: {text}"
    );
}

#[test]
#[serial]
fn invalid_config_fails_with_message() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("taskvault.toml"),
        "check_interval_seconds = 0\n",
    )
    .expect("write config");

    let workspace = dir.path().display().to_string();
    let out = run(ORCHESTRATOR, &[workspace.as_str(), "--once"], dir.path());
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("check_interval_seconds"));
}

#[test]
#[serial]
fn watcher_once_materializes_drops() {
    let dir = tempfile::tempdir().expect("tempdir");
    let workspace = dir.path().display().to_string();
    std::fs::create_dir(dir.path().join("Drop")).expect("mkdir");
    std::fs::write(dir.path().join("Drop").join("invoice.pdf"), b"pdf bytes").expect("drop");

    let out = run(WATCHER, &[workspace.as_str(), "--once", "--no-notify"], dir.path());
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );

    let actions: Vec<_> = std::fs::read_dir(dir.path().join("Needs_Action"))
        .expect("needs action")
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(actions.len(), 1);
    assert!(actions[0].starts_with("FILE_invoice_"));
    assert!(dir.path().join("Files").join("invoice.pdf").is_file());
    assert!(!dir.path().join("Drop").join("invoice.pdf").exists());
    assert!(dir.path().join(".watcher_state.json").is_file());
}

#[test]
#[serial]
fn watcher_accepts_explicit_drop_folder() {
    let dir = tempfile::tempdir().expect("tempdir");
    let inbox = tempfile::tempdir().expect("drop dir");
    std::fs::write(inbox.path().join("notes.txt"), b"hello").expect("drop");

    let workspace = dir.path().display().to_string();
    let drop = inbox.path().display().to_string();
    let out = run(WATCHER, &[workspace.as_str(), drop.as_str(), "--once"], dir.path());
    assert!(out.status.success());
    assert!(!inbox.path().join("notes.txt").exists());
    assert!(dir.path().join("Files").join("notes.txt").is_file());
}

#[test]
#[serial]
fn watcher_rejects_zero_interval() {
    let dir = tempfile::tempdir().expect("tempdir");
    let workspace = dir.path().display().to_string();
    let out = run(WATCHER, &[workspace.as_str(), "--interval", "0"], dir.path());
    assert_eq!(out.status.code(), Some(2), "clap usage errors exit with 2");
}
