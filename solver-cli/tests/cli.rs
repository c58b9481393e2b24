//! End-to-end tests for the `maxcut` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const QUIET: &str = "detailedOutput = 0\n";

fn maxcut(instance: &Path, params: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_maxcut"))
        .arg(instance)
        .arg(params)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run maxcut")
}

#[test]
fn test_usage_error_exits_with_one() {
    let output = Command::new(env!("CARGO_BIN_EXE_maxcut"))
        .output()
        .expect("failed to run maxcut");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_solves_path_graph() {
    let dir = tempfile::tempdir().unwrap();
    let instance = dir.path().join("path.rudy");
    let params = dir.path().join("params");
    fs::write(&instance, "3 2\n1 2 2\n2 3 3\n").unwrap();
    fs::write(&params, QUIET).unwrap();

    let output = maxcut(&instance, &params);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Graph has 3 vertices and 2 edges."));
    assert!(stdout.contains("Maximum value = 5"));
    assert!(stdout.contains("Solution = ( 2 )"));

    let written = fs::read_to_string(dir.path().join("path.rudy.output")).unwrap();
    assert!(written.contains("branchingStrategy = 1"));
    assert!(written.contains("Maximum value = 5"));
}

#[test]
fn test_output_files_are_numbered() {
    let dir = tempfile::tempdir().unwrap();
    let instance = dir.path().join("c5.rudy");
    let params = dir.path().join("params");
    fs::write(&instance, "5 5\n1 2 1\n2 3 1\n3 4 1\n4 5 1\n5 1 1\n").unwrap();
    fs::write(&params, QUIET).unwrap();

    for _ in 0..3 {
        let output = maxcut(&instance, &params);
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Maximum value = 4"));
    }

    assert!(dir.path().join("c5.rudy.output").exists());
    assert!(dir.path().join("c5.rudy.output_1").exists());
    assert!(dir.path().join("c5.rudy.output_2").exists());
}

#[test]
fn test_invalid_branching_strategy_fails() {
    let dir = tempfile::tempdir().unwrap();
    let instance = dir.path().join("g.rudy");
    let params = dir.path().join("params");
    fs::write(&instance, "2 1\n1 2 1\n").unwrap();
    fs::write(&params, "branchingStrategy = 3\n").unwrap();

    let output = maxcut(&instance, &params);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.to_lowercase().contains("branching"));
    assert!(!dir.path().join("g.rudy.output").exists());
}

#[test]
fn test_malformed_graph_fails() {
    let dir = tempfile::tempdir().unwrap();
    let instance = dir.path().join("bad.rudy");
    let params = dir.path().join("params");
    fs::write(&instance, "3 2\n1 2 1\n").unwrap();
    fs::write(&params, QUIET).unwrap();

    let output = maxcut(&instance, &params);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_missing_instance_fails() {
    let dir = tempfile::tempdir().unwrap();
    let params = dir.path().join("params");
    fs::write(&params, QUIET).unwrap();

    let output = maxcut(&dir.path().join("absent.rudy"), &params);
    assert_eq!(output.status.code(), Some(1));
}
