//! Runs the treeglass binary end to end.

use std::process::Command;
use tempfile::TempDir;

fn treeglass(workspace: &TempDir, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_treeglass"))
        .env("HOME", workspace.path())
        .env("TREEGLASS_LOG", "off")
        .arg("--workspace")
        .arg(workspace.path())
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn decode_prints_operation_table() {
    let workspace = TempDir::new().unwrap();
    std::fs::write(
        workspace.path().join("payload.json"),
        "[1,1,4,3,65,112,112,1,1,11,0,1,2,5,1,0,1,0]",
    )
    .unwrap();
    let output = treeglass(&workspace, &["decode", "payload.json"]);
    assert!(
        output.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ADD_ROOT"));
    assert!(stdout.contains("App"));
}

#[test]
fn replay_of_malformed_stream_fails() {
    let workspace = TempDir::new().unwrap();
    std::fs::write(workspace.path().join("stream.json"), "[[1,1,0,1,2,5,9,0,0,0]]").unwrap();
    let output = treeglass(&workspace, &["replay", "stream.json"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown parent"));
}

#[test]
fn config_reads_workspace_file() {
    let workspace = TempDir::new().unwrap();
    std::fs::create_dir_all(workspace.path().join("config")).unwrap();
    std::fs::write(
        workspace.path().join("config").join("config.toml"),
        "[registry]\nuntrack_delay_ms = 1234\n",
    )
    .unwrap();
    let output = treeglass(&workspace, &["config", "--format", "json"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("1234"));
}
