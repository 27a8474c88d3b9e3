//! Integration tests for JSONL storage and record persistence from `run`.

use std::path::Path;

use circom_bench::config::BenchConfig;
use circom_bench::core::env::EnvironmentInfo;
use circom_bench::core::schema::{BackendInfo, BenchRecord, RunConfig, StageStatus};
use circom_bench::process::MockRunner;
use circom_bench::run_cmd;
use circom_bench::storage::JsonlWriter;

fn make_test_record(name: &str) -> BenchRecord {
    BenchRecord::new(
        name.to_string(),
        EnvironmentInfo::default(),
        BackendInfo::snarkjs_groth16(Some("0.7.5".to_string())),
        RunConfig::default(),
    )
}

fn bench_config(dir: &Path) -> BenchConfig {
    let source = dir.join("sha256_2_x15.circom");
    std::fs::write(&source, "pragma circom 2.0.0;").unwrap();
    BenchConfig {
        circuit_path: source,
        output_dir: dir.join(".output"),
        iterations: 4,
        echo_tools: false,
        jsonl: Some(dir.join("history/runs.jsonl")),
        json: Some(dir.join("last.json")),
        ..Default::default()
    }
}

#[test]
fn test_write_and_read_multiple_records() {
    let dir = tempfile::tempdir().unwrap();
    let writer = JsonlWriter::new(dir.path().join("bench.jsonl"));

    let records: Vec<_> = ["circuit_a", "circuit_b", "circuit_c"]
        .into_iter()
        .map(make_test_record)
        .collect();
    for r in &records {
        writer.append(r).expect("failed to append record");
    }

    let read = writer.read_all().expect("failed to read records");
    assert_eq!(read.len(), 3);
    for (a, b) in read.iter().zip(&records) {
        assert_eq!(a.circuit_name, b.circuit_name);
        assert_eq!(a.record_id, b.record_id);
    }
    assert_eq!(read[0].backend.name, "snarkjs");
    assert_eq!(read[0].backend.version.as_deref(), Some("0.7.5"));
    assert_eq!(writer.count().unwrap(), 3);
}

#[test]
fn test_read_filtered_by_circuit() {
    let dir = tempfile::tempdir().unwrap();
    let writer = JsonlWriter::new(dir.path().join("bench.jsonl"));
    writer.append(&make_test_record("sha256_2_x15")).unwrap();
    writer.append(&make_test_record("other")).unwrap();
    writer.append(&make_test_record("sha256_2_x15")).unwrap();

    let filtered = writer.read_filtered(Some("sha256_2_x15")).unwrap();
    assert_eq!(filtered.len(), 2);
    assert!(filtered.iter().all(|r| r.circuit_name == "sha256_2_x15"));
}

#[test]
fn test_run_appends_one_record_per_run() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = bench_config(dir.path());

    let first = run_cmd::run_with_runner(&cfg, &MockRunner::new(), EnvironmentInfo::default(), vec![])
        .unwrap();
    let second = run_cmd::run_with_runner(
        &cfg,
        &MockRunner::new(),
        EnvironmentInfo::default(),
        vec!["circom-bench".into(), "run".into()],
    )
    .unwrap();

    let history = JsonlWriter::new(cfg.jsonl.as_ref().unwrap()).read_all().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].record_id, first.record_id);
    assert_eq!(history[1].record_id, second.record_id);

    assert_eq!(history[0].compile_status, Some(StageStatus::Ran));
    assert_eq!(history[1].compile_status, Some(StageStatus::Cached));
    assert_eq!(history[1].setup_status, Some(StageStatus::Cached));
    assert!(history[1].compile_stats.is_none());
    assert_eq!(history[1].prove_stats.as_ref().map(|s| s.iterations), Some(4));
    assert_eq!(history[1].config.measured_iterations, 4);
    assert_eq!(history[1].cli_args, vec!["circom-bench", "run"]);

    // --json always holds the latest run
    let last: BenchRecord =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("last.json")).unwrap())
            .unwrap();
    assert_eq!(last.record_id, second.record_id);
}

#[test]
fn test_failed_run_appends_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = bench_config(dir.path());
    let runner = MockRunner::new().failing("prove", 2, "out of memory");

    let err = run_cmd::run_with_runner(&cfg, &runner, EnvironmentInfo::default(), vec![]).unwrap_err();
    assert!(err.to_string().contains("out of memory"));
    assert!(!JsonlWriter::new(cfg.jsonl.as_ref().unwrap()).exists());
    assert_eq!(runner.count("prove"), 1);
}

#[test]
fn test_failed_verify_persists_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = bench_config(dir.path());
    cfg.verify = true;
    let runner = MockRunner::new().failing("verify", 1, "Invalid proof");

    let err = run_cmd::run_with_runner(&cfg, &runner, EnvironmentInfo::default(), vec![]).unwrap_err();
    assert!(err.to_string().contains("Invalid proof"));
    assert_eq!(runner.count("prove"), 4);
    assert!(!JsonlWriter::new(cfg.jsonl.as_ref().unwrap()).exists());
    assert!(!dir.path().join("last.json").exists());
}
