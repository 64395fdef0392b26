//! CLI integration tests

use std::io::Write;
use std::process::Command;

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = Command::new("cargo")
        .args(["run", "-p", "bench-cli", "--", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Eventing Benchmark Analysis"),
        "Should show app name"
    );
    assert!(stdout.contains("summary"), "Should show summary command");
    assert!(stdout.contains("latency"), "Should show latency command");
    assert!(stdout.contains("resources"), "Should show resources command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = Command::new("cargo")
        .args(["run", "-p", "bench-cli", "--", "--version"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("bench"), "Should show binary name");
}

/// End-to-end run over fixture files
#[test]
fn test_summary_over_fixture_files() {
    let dir = tempfile::tempdir().unwrap();
    let write = |name: &str, content: &str| {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    };

    let requests = write(
        "requests.jsonl",
        concat!(
            r#"{"timestamp":"2025-01-29T13:43:10.000Z","experiment_id":1,"status":"200","ttfb":12.5,"event_id":"A"}"#,
            "\n",
            r#"{"timestamp":"2025-01-29T13:43:11.000Z","experiment_id":1,"status":"200","ttfb":14.0,"event_id":"B"}"#,
            "\n",
        ),
    );
    let experiments = write("experiments.jsonl", "{\"id\":1,\"triggers\":4}\n");
    let events = write(
        "events.csv",
        "event_id,timestamp\nA,2025-01-29T13:43:10.250Z\nB,2025-01-29T13:43:11.250Z\n",
    );

    let output = Command::new("cargo")
        .args([
            "run",
            "-p",
            "bench-cli",
            "--",
            "--requests",
            requests.to_str().unwrap(),
            "--experiments",
            experiments.to_str().unwrap(),
            "--events",
            events.to_str().unwrap(),
            "summary",
        ])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "summary should succeed: {}", stdout);
    assert!(stdout.contains("0.25"), "Should show mean processing time");
    assert!(stdout.contains("unmatched completions: 0"));
}
