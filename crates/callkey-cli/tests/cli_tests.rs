//! Integration tests for the callkey CLI
//!
//! These tests invoke the actual callkey binary and verify:
//! - Exit codes (0 = success, 1 = key failure, 2 = input error)
//! - stdout/stderr output
//! - JSON output format

use std::path::PathBuf;
use std::process::Command;

// ── Helpers ───────────────────────────────────────────────

fn callkey_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_callkey"))
}

fn run_callkey(args: &[&str]) -> std::process::Output {
    Command::new(callkey_bin())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to execute callkey")
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

// ── Version ───────────────────────────────────────────────

#[test]
fn test_version_command() {
    let output = run_callkey(&["version"]);
    assert!(output.status.success(), "version should exit 0");
    let stdout = stdout_of(&output);
    assert!(stdout.contains("callkey"), "should contain 'callkey'");
    assert!(
        stdout.contains(env!("CARGO_PKG_VERSION")),
        "should contain version"
    );
    assert!(stdout.contains("format v1"), "should contain format version");
}

#[test]
fn test_version_flag() {
    let output = run_callkey(&["--version"]);
    assert!(output.status.success(), "--version should exit 0");
    assert!(stdout_of(&output).contains(env!("CARGO_PKG_VERSION")));
}

// ── Key ───────────────────────────────────────────────────

#[test]
fn test_key_prints_hex() {
    let output = run_callkey(&["key", "--args", "[1, 2]"]);
    assert!(output.status.success(), "key should exit 0");
    let stdout = stdout_of(&output);
    assert!(stdout.starts_with("434b01"), "key should start with magic + version: {}", stdout);
    assert!(stdout.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_key_kwargs_order_irrelevant() {
    let a = run_callkey(&["key", "--kwargs", r#"{"a": {"x": 1, "y": 2}}"#]);
    let b = run_callkey(&["key", "--kwargs", r#"{"a": {"y": 2, "x": 1}}"#]);
    assert!(a.status.success() && b.status.success());
    assert_eq!(stdout_of(&a), stdout_of(&b));
}

#[test]
fn test_key_list_order_matters() {
    let a = run_callkey(&["key", "--args", "[[1, 2, 3]]"]);
    let b = run_callkey(&["key", "--args", "[[3, 2, 1]]"]);
    assert_ne!(stdout_of(&a), stdout_of(&b));
}

#[test]
fn test_key_true_is_not_one() {
    let a = run_callkey(&["key", "--args", "[true]"]);
    let b = run_callkey(&["key", "--args", "[1]"]);
    assert_ne!(stdout_of(&a), stdout_of(&b));
}

#[test]
fn test_key_digest() {
    let output = run_callkey(&["key", "--args", "[\"a\"]", "--digest"]);
    assert!(output.status.success());
    let stdout = stdout_of(&output);
    assert_eq!(stdout.len(), 64, "digest should be 64 hex chars: {}", stdout);
}

#[test]
fn test_key_json_output() {
    let output = run_callkey(&["key", "--args", "[1]", "--json"]);
    assert!(output.status.success());
    let parsed: serde_json::Value =
        serde_json::from_str(&stdout_of(&output)).expect("output should be JSON");
    assert_eq!(parsed["format_version"], 1);
    assert_eq!(parsed["digest"].as_str().unwrap().len(), 64);
    assert!(parsed["key"].as_str().unwrap().starts_with("434b01"));
}

#[test]
fn test_key_is_deterministic() {
    let first = stdout_of(&run_callkey(&["key", "--args", r#"[{"k": [1, {"z": 0, "a": 1}]}]"#]));
    for _ in 0..5 {
        let next = stdout_of(&run_callkey(&["key", "--args", r#"[{"k": [1, {"z": 0, "a": 1}]}]"#]));
        assert_eq!(first, next);
    }
}

#[test]
fn test_max_depth_changes_key() {
    let shallow = run_callkey(&["key", "--args", "[[[1]]]", "--max-depth", "1"]);
    let default = run_callkey(&["key", "--args", "[[[1]]]"]);
    assert!(shallow.status.success());
    assert_ne!(stdout_of(&shallow), stdout_of(&default));
}

// ── Inspect ───────────────────────────────────────────────

#[test]
fn test_inspect_sorts_mapping() {
    let output = run_callkey(&["inspect", "--kwargs", r#"{"b": [true], "a": 1}"#]);
    assert!(output.status.success(), "inspect should exit 0");
    let parsed: serde_json::Value =
        serde_json::from_str(&stdout_of(&output)).expect("output should be JSON");
    assert_eq!(
        parsed["kwargs"],
        serde_json::json!({"pairs": [["a", 1], ["b", {"tuple": [true]}]]})
    );
    assert_eq!(parsed["max_depth"], 10);
}

// ── Errors ────────────────────────────────────────────────

#[test]
fn test_invalid_json_exits_2() {
    let output = run_callkey(&["key", "--args", "[1,"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--args"), "stderr should name the flag: {}", stderr);
}

#[test]
fn test_args_must_be_array() {
    let output = run_callkey(&["key", "--args", r#"{"a": 1}"#]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_kwargs_must_be_object() {
    let output = run_callkey(&["key", "--kwargs", "[1]"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_zero_depth_rejected() {
    let output = run_callkey(&["key", "--max-depth", "0"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_missing_config_exits_2() {
    let output = run_callkey(&["key", "--config", "/nonexistent/callkey.json"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_config_file() {
    let path = std::env::temp_dir().join(format!("callkey-cli-{}.json", std::process::id()));
    std::fs::write(&path, r#"{"max_depth": 1}"#).unwrap();
    let from_file = run_callkey(&["key", "--args", "[[[1]]]", "--config", path.to_str().unwrap()]);
    let from_flag = run_callkey(&["key", "--args", "[[[1]]]", "--max-depth", "1"]);
    std::fs::remove_file(&path).unwrap();
    assert!(from_file.status.success());
    assert_eq!(stdout_of(&from_file), stdout_of(&from_flag));
}
