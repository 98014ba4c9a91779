//! Exit code and output tests for the `pad` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::{json, Value};
use tempfile::TempDir;

const EXIT_SUCCESS: i32 = 0;
const EXIT_INPUT_ERROR: i32 = 1;
const EXIT_ANONYMITY_FAILURE: i32 = 2;

fn pad(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pad"))
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("PAD_CONFIG")
        .env_remove("PAD_K")
        .env_remove("PAD_SEED")
        .output()
        .expect("failed to run pad")
}

/// `n` profiles of 8 slots on two usage levels.
fn write_dataset(dir: &Path, n: usize) -> String {
    let records: Vec<Value> = (0..n)
        .map(|i| {
            let level = if i % 2 == 0 { 1.0 } else { 9.0 };
            let values: Vec<f64> = (0..8)
                .map(|s| level + ((i * 7 + s * 3) % 10) as f64 / 10.0)
                .collect();
            json!({ "key": format!("meter-{:03}", i), "values": values })
        })
        .collect();
    let path = dir.join("meters.json");
    fs::write(&path, json!({ "records": records }).to_string()).unwrap();
    path.to_string_lossy().into_owned()
}

fn write_config(dir: &Path, body: &str) -> String {
    let path = dir.join("pad.toml");
    fs::write(&path, body).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_publish_prints_report_and_dataset() {
    let dir = TempDir::new().unwrap();
    let input = write_dataset(dir.path(), 50);
    let config = write_config(dir.path(), "[anonymity]\nk = 3\n\n[sampling]\nseed = 42\n");

    let output = pad(&["publish", "--input", &input, "--config", &config]);
    println!("stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(output.status.code(), Some(EXIT_SUCCESS));

    let doc: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(doc["report"]["records"], 50);
    assert_eq!(doc["report"]["effective_k"], 3);
    assert_eq!(doc["report"]["seed"], 42);
    let records = doc["dataset"]["records"].as_array().unwrap();
    assert_eq!(records.len(), 50);
    assert_eq!(records[0]["key"], "meter-000");
    assert_eq!(records[49]["key"], "meter-049");
}

#[test]
fn test_publish_to_output_file() {
    let dir = TempDir::new().unwrap();
    let input = write_dataset(dir.path(), 50);
    let target = dir.path().join("published.json");

    let output = pad(&[
        "publish",
        "-i",
        &input,
        "-o",
        target.to_str().unwrap(),
        "-k",
        "4",
        "--seed",
        "9",
    ]);
    assert_eq!(output.status.code(), Some(EXIT_SUCCESS));

    let doc: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(doc.get("dataset").is_none());
    assert_eq!(doc["report"]["requested_k"], 4);

    let published: Value = serde_json::from_str(&fs::read_to_string(&target).unwrap()).unwrap();
    assert_eq!(published["records"].as_array().unwrap().len(), 50);
}

#[test]
fn test_publish_impossible_anonymity_exits_2() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("tiny.json");
    fs::write(
        &input,
        r#"{"records":[{"key":"a","values":[1,2,3]},{"key":"b","values":[2,3,4]}]}"#,
    )
    .unwrap();

    let output = pad(&["publish", "-i", input.to_str().unwrap(), "-k", "5", "--seed", "1"]);
    assert_eq!(output.status.code(), Some(EXIT_ANONYMITY_FAILURE));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Insufficient data"));
}

#[test]
fn test_publish_malformed_dataset_exits_1() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("bad.json");
    fs::write(&input, r#"{"records":[{"key":"a","values":[1,2]},{"key":"a","values":[3,4]}]}"#)
        .unwrap();

    let output = pad(&["publish", "-i", input.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(EXIT_INPUT_ERROR));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_missing_input_exits_1() {
    let output = pad(&["publish", "-i", "/nonexistent/meters.json"]);
    assert_eq!(output.status.code(), Some(EXIT_INPUT_ERROR));
}

#[test]
fn test_describe() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        "description = \"Evening consumption\"\n\n[anonymity]\nk = 4\n\n\
         [[interests]]\nmode = \"window-usage\"\nwindow = [4, 8]\n",
    );
    let input = write_dataset(dir.path(), 10);

    let output = pad(&["describe", "-c", &config, "-i", &input]);
    assert_eq!(output.status.code(), Some(EXIT_SUCCESS));

    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.starts_with("Evening consumption"));
    assert!(text.contains("4-anonymity"));
    assert!(text.contains("window-usage [4, 8)"));
    assert!(text.contains("split into blocks"));
}

#[test]
fn test_check_config() {
    let dir = TempDir::new().unwrap();
    let good = write_config(dir.path(), "[learner]\ncandidates = [\"diagonal\"]\n");

    let output = pad(&["check-config", "-c", &good]);
    assert_eq!(output.status.code(), Some(EXIT_SUCCESS));
    assert!(String::from_utf8_lossy(&output.stdout).contains("learners [diagonal]"));

    let bad = write_config(dir.path(), "[sampling]\ninitial_fraction = 0.0\n");
    let output = pad(&["check-config", "-c", &bad]);
    assert_eq!(output.status.code(), Some(EXIT_INPUT_ERROR));
    assert!(String::from_utf8_lossy(&output.stderr).contains("[sampling]"));
}
