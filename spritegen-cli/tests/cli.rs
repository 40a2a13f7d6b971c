//! Exit-code behaviour of the `spritegen` binary. None of these reach a
//! model download.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const REQUEST: &str = r#"{
    "name": "scout-mech",
    "description": "small bipedal scout mech",
    "gameStyle": "metroidvania"
}"#;

fn spritegen(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_spritegen"))
        .args(args)
        .env("NO_COLOR", "1")
        .output()
        .expect("failed to run spritegen")
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_no_arguments_prints_usage() {
    let output = spritegen(&[]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage"), "stderr: {stderr}");
}

#[test]
fn test_single_argument_prints_usage() {
    let output = spritegen(&["request.json"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage"));
}

#[test]
fn test_help_succeeds() {
    let output = spritegen(&["--help"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("--preset"));
}

#[test]
fn test_missing_request_file() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out.png");
    let output = spritegen(&[path_str(&dir.path().join("missing.json")), path_str(&out)]);

    assert_eq!(output.status.code(), Some(1));
    assert!(!out.exists());
}

#[test]
fn test_missing_description_reported() {
    let dir = TempDir::new().unwrap();
    let request = dir.path().join("request.json");
    std::fs::write(&request, r#"{"name": "x", "gameStyle": "nes"}"#).unwrap();
    let out = dir.path().join("out.png");

    let output = spritegen(&[path_str(&request), path_str(&out)]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("description"), "stderr: {stderr}");
    assert!(!out.exists());
}

#[test]
fn test_unknown_model_leaves_no_output() {
    let dir = TempDir::new().unwrap();
    let request = dir.path().join("request.json");
    std::fs::write(&request, REQUEST).unwrap();
    let out = dir.path().join("out.png");

    let output = spritegen(&[
        path_str(&request),
        path_str(&out),
        "--model-id",
        "not-a/real-model",
        "--cpu",
    ]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not-a/real-model"), "stderr: {stderr}");
    assert!(!out.exists());
}

#[test]
fn test_unsupported_output_extension() {
    let dir = TempDir::new().unwrap();
    let request = dir.path().join("request.json");
    std::fs::write(&request, REQUEST).unwrap();
    let out = dir.path().join("out.sprite");

    let output = spritegen(&[path_str(&request), path_str(&out)]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!out.exists());
}

#[test]
fn test_error_printed_when_logs_filtered() {
    let dir = TempDir::new().unwrap();
    let request = dir.path().join("request.json");
    std::fs::write(&request, r#"{"name": "x", "gameStyle": "nes"}"#).unwrap();
    let out = dir.path().join("out.png");

    let output = Command::new(env!("CARGO_BIN_EXE_spritegen"))
        .args([path_str(&request), path_str(&out)])
        .env("NO_COLOR", "1")
        .env("RUST_LOG", "hf_hub=debug")
        .output()
        .expect("failed to run spritegen");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error: invalid request"), "stderr: {stderr}");
    assert!(stderr.contains("description"), "stderr: {stderr}");
}

#[test]
fn test_missing_output_directory_rejected() {
    let dir = TempDir::new().unwrap();
    let request = dir.path().join("request.json");
    std::fs::write(&request, REQUEST).unwrap();
    let out = dir.path().join("missing").join("out.png");

    let output = spritegen(&[path_str(&request), path_str(&out)]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
}
