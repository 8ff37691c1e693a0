//! Integration tests for the structured JSONL log contract.
//!
//! Validates that:
//! 1. The log schema file exists at the workspace root and names the
//!    required fields.
//! 2. Every example entry embedded in the schema passes validation.
//! 3. `LogEmitter` produces lines that validate against the contract.
//! 4. Validation rejects entries with missing fields or out-of-vocabulary
//!    enum values.
//! 5. `ArtifactIndex` round-trips through JSON with byte sizes intact.
//!
//! Run: cargo test -p stratio-harness --test structured_log_test

use std::fs;
use std::path::{Path, PathBuf};

use stratio_harness::structured_log::{
    ArtifactIndex, Layer, LogEmitter, LogEntry, LogLevel, Outcome, SuiteKind, validate_log_file,
    validate_log_line,
};

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(Path::parent)
        .expect("harness crate sits two levels below the workspace root")
        .to_path_buf()
}

#[test]
fn log_schema_file_exists_and_names_required_fields() {
    let schema_path = workspace_root().join("tests/conformance/log_schema.json");
    assert!(
        schema_path.exists(),
        "missing log schema at {}",
        schema_path.display()
    );

    let raw = fs::read_to_string(&schema_path).expect("schema is readable");
    let schema: serde_json::Value = serde_json::from_str(&raw).expect("schema is valid JSON");

    assert!(schema.get("schema_version").is_some());
    let required = schema
        .get("required_fields")
        .and_then(|v| v.as_object())
        .expect("required_fields is an object");
    for field in ["timestamp", "trace_id", "level", "event"] {
        assert!(required.contains_key(field), "schema must require {field}");
    }
    assert!(schema.get("optional_fields").is_some());
    assert!(schema.get("examples").is_some());
}

#[test]
fn schema_examples_pass_validation() {
    let schema_path = workspace_root().join("tests/conformance/log_schema.json");
    let raw = fs::read_to_string(&schema_path).expect("schema is readable");
    let schema: serde_json::Value = serde_json::from_str(&raw).expect("schema is valid JSON");

    let examples = schema
        .get("examples")
        .and_then(|v| v.as_object())
        .expect("examples is an object");
    for (name, example) in examples {
        // The artifact index example follows its own schema, not the line schema.
        if name == "artifact_index" {
            continue;
        }
        let line = serde_json::to_string(example).expect("example serializes");
        if let Err(errors) = validate_log_line(&line, 1) {
            panic!("example {name} failed: {errors:?}");
        }
    }
}

#[test]
fn emitter_output_validates_line_by_line() {
    let dir = std::env::temp_dir().join("stratio_structured_log_it");
    fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join("emitter.log.jsonl");

    {
        let mut emitter =
            LogEmitter::to_file(&path, "log-it", "run-0").expect("emitter opens log file");
        for scenario in ["alpha", "beta", "gamma"] {
            emitter
                .emit_entry(
                    LogEntry::new("", LogLevel::Info, "scenario_start")
                        .with_suite(SuiteKind::Conformance)
                        .with_scenario(scenario)
                        .with_op(Layer::Buffered, "read")
                        .with_outcome(Outcome::Pass),
                )
                .expect("emit succeeds");
        }
        emitter.flush().expect("flush succeeds");
    }

    let (line_count, errors) = validate_log_file(&path).expect("log file is readable");
    assert_eq!(line_count, 3);
    assert!(errors.is_empty(), "errors: {errors:?}");

    let raw = fs::read_to_string(&path).expect("log readable");
    for (idx, line) in raw.lines().enumerate() {
        let value: serde_json::Value = serde_json::from_str(line).expect("line is JSON");
        let trace = value["trace_id"].as_str().expect("trace_id present");
        let want = format!("log-it::run-0::{:03}", idx + 1);
        assert_eq!(trace, want, "sequence numbers advance per line");
    }

    fs::remove_file(&path).ok();
}

#[test]
fn validation_rejects_missing_required_fields() {
    let errors = validate_log_line(
        r#"{"timestamp":"2026-08-01T12:00:00.000Z","level":"info"}"#,
        1,
    )
    .expect_err("entry lacks trace_id and event");
    assert!(
        errors.iter().any(|e| e.field == "trace_id"),
        "errors: {errors:?}"
    );
    assert!(
        errors.iter().any(|e| e.field == "event"),
        "errors: {errors:?}"
    );
}

#[test]
fn validation_rejects_out_of_vocabulary_values() {
    let bad_level = r#"{"timestamp":"2026-08-01T12:00:00.000Z","trace_id":"a::b::001","level":"critical","event":"x"}"#;
    assert!(validate_log_line(bad_level, 1).is_err());

    let bad_operation = r#"{"timestamp":"2026-08-01T12:00:00.000Z","trace_id":"a::b::001","level":"info","event":"x","operation":"rewind"}"#;
    assert!(validate_log_line(bad_operation, 1).is_err());

    let bad_newline = r#"{"timestamp":"2026-08-01T12:00:00.000Z","trace_id":"a::b::001","level":"info","event":"x","newline":"mixed"}"#;
    assert!(validate_log_line(bad_newline, 1).is_err());

    let bad_trace = r#"{"timestamp":"2026-08-01T12:00:00.000Z","trace_id":"flat","level":"info","event":"x"}"#;
    assert!(validate_log_line(bad_trace, 1).is_err());
}

#[test]
fn full_entry_with_every_optional_field_validates() {
    let entry = LogEntry::new("log-it::run-0::007", LogLevel::Debug, "scenario_step")
        .with_suite_id("log-it")
        .with_suite(SuiteKind::Conformance)
        .with_gate("conformance")
        .with_scenario("universal_translates_all_terminators")
        .with_op(Layer::Text, "read_line")
        .with_encoding("utf-8")
        .with_newline("universal")
        .with_capacity(8192)
        .with_chunk_size(8192)
        .with_bytes_in(8)
        .with_bytes_out(8)
        .with_outcome(Outcome::Pass)
        .with_latency_ns(2_400)
        .with_duration_ms(1)
        .with_artifacts(vec!["target/conformance/run-0.log.jsonl".to_string()])
        .with_details(serde_json::json!({"terminators": ["\r\n", "\r", "\n"]}));

    let line = entry.to_jsonl().expect("entry serializes");
    let parsed = validate_log_line(&line, 1).expect("full entry validates");
    assert_eq!(parsed.event, "scenario_step");
}

#[test]
fn artifact_index_round_trips_with_byte_sizes() {
    let dir = std::env::temp_dir().join("stratio_artifact_index_it");
    fs::create_dir_all(&dir).expect("temp dir");
    let file = dir.join("evidence.bin");
    fs::write(&file, b"0123456789").expect("fixture file");

    let mut index = ArtifactIndex::new("run-0", "log-it");
    index.add("target/conformance/run-0.report.md", "report", 512);
    index
        .add_file(&file, "log")
        .expect("stat succeeds for an existing file");

    let json = serde_json::to_string_pretty(&index).expect("index serializes");
    let back: ArtifactIndex = serde_json::from_str(&json).expect("index parses");

    assert_eq!(back.index_version, 1);
    assert_eq!(back.run_id, "run-0");
    assert_eq!(back.suite_id, "log-it");
    assert_eq!(back.artifacts.len(), 2);
    assert_eq!(back.artifacts[1].bytes, 10);

    fs::remove_file(&file).ok();
}
