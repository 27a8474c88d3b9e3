//! Integration tests for the benchmark pipeline.
//!
//! The pipeline is driven by `MockRunner`, which creates each command's declared
//! outputs instead of running circom, node or snarkjs. No tools are required.

use std::path::{Path, PathBuf};

use circom_bench::{BenchError, BenchResult};
use circom_bench::config::ToolPaths;
use circom_bench::core::StageStatus;
use circom_bench::engine::{OutputLayout, Pipeline, PipelineConfig, PipelineState};
use circom_bench::process::{CommandRunner, Invocation, MockRunner, ProcessOutput};

const SETUP_LABELS: [&str; 6] = [
    "setup:ptau-new",
    "setup:ptau-contribute",
    "setup:ptau-prepare",
    "setup:groth16-setup",
    "setup:zkey-contribute",
    "setup:zkey-export",
];

fn write_source(dir: &Path, body: &str) -> PathBuf {
    let source = dir.join("sha256_2_x15.circom");
    std::fs::write(&source, body).unwrap();
    source
}

fn pipeline_config(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        circuit_name: "sha256_2_x15".to_string(),
        circuit_path: write_source(dir, "pragma circom 2.0.0;\ncomponent main = Sha256_2(15);\n"),
        output_dir: dir.join(".output"),
        tools: ToolPaths::default(),
        ptau_power: 19,
        iterations: 10,
        cache: true,
        verify: false,
    }
}

fn cold_labels() -> Vec<String> {
    let mut labels = vec!["compile".to_string(), "witness".to_string()];
    labels.extend(SETUP_LABELS.iter().map(|s| s.to_string()));
    labels.extend(std::iter::repeat_n("prove".to_string(), 10));
    labels
}

#[test]
fn test_cold_run_order() {
    let dir = tempfile::tempdir().unwrap();
    let runner = MockRunner::new();
    let mut pipeline = Pipeline::new(pipeline_config(dir.path()), &runner);

    let outcome = pipeline.run().expect("cold run should succeed");

    assert_eq!(runner.labels(), cold_labels());
    assert_eq!(outcome.compile.status, StageStatus::Ran);
    assert_eq!(outcome.setup.status, StageStatus::Ran);
    assert_eq!(outcome.prove_samples_ms.len(), 10);
    assert_eq!(pipeline.state(), PipelineState::Done);
}

#[test]
fn test_input_fixture_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let runner = MockRunner::new();
    let mut pipeline = Pipeline::new(pipeline_config(dir.path()), &runner);
    pipeline.run().unwrap();

    let input = std::fs::read_to_string(pipeline.layout().input_json()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&input).unwrap();
    assert_eq!(value["a"][0], "0");
    assert_eq!(value["a"][14], "14");
    assert_eq!(value["b"][0], "15");
    assert_eq!(value["b"][14], "29");
}

/// Fails the test if a command starts before the files it reads exist.
struct InputCheckingRunner {
    inner: MockRunner,
    layout: OutputLayout,
}

impl InputCheckingRunner {
    fn required(&self, label: &str) -> Vec<PathBuf> {
        let l = &self.layout;
        match label {
            "witness" => vec![l.wasm(), l.witness_generator(), l.input_json()],
            "setup:ptau-contribute" => vec![l.ptau("0000")],
            "setup:ptau-prepare" => vec![l.ptau("0001")],
            "setup:groth16-setup" => vec![l.r1cs(), l.ptau("final")],
            "setup:zkey-contribute" => vec![l.zkey("0000")],
            "setup:zkey-export" => vec![l.zkey("0001")],
            "prove" => vec![l.final_zkey(), l.witness()],
            _ => Vec::new(),
        }
    }
}

impl CommandRunner for InputCheckingRunner {
    fn run(&self, invocation: &Invocation) -> BenchResult<ProcessOutput> {
        for path in self.required(&invocation.label) {
            assert!(
                path.exists(),
                "{} started before {} existed",
                invocation.label,
                path.display()
            );
        }
        self.inner.run(invocation)
    }
}

#[test]
fn test_each_stage_runs_after_its_inputs_exist() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = pipeline_config(dir.path());
    let runner = InputCheckingRunner {
        inner: MockRunner::new(),
        layout: OutputLayout::new(&cfg.output_dir, &cfg.circuit_name, cfg.ptau_power),
    };
    Pipeline::new(cfg, &runner).run().unwrap();
    assert_eq!(runner.inner.labels(), cold_labels());
}

#[test]
fn test_warm_run_skips_compile_and_setup() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = pipeline_config(dir.path());

    let cold = MockRunner::new();
    Pipeline::new(cfg.clone(), &cold).run().unwrap();

    let warm = MockRunner::new();
    let outcome = Pipeline::new(cfg, &warm).run().unwrap();

    assert_eq!(warm.count("compile"), 0, "no compiler invocation when cached");
    assert_eq!(warm.count("setup:"), 0, "no setup sub-step when cached");
    assert_eq!(warm.count("witness"), 1);
    assert_eq!(warm.count("prove"), 10);
    assert_eq!(outcome.compile.status, StageStatus::Cached);
    assert_eq!(outcome.compile.elapsed_ms, None);
    assert_eq!(outcome.setup.status, StageStatus::Cached);
}

#[test]
fn test_average_is_arithmetic_mean_of_samples() {
    let dir = tempfile::tempdir().unwrap();
    let samples = [10, 12, 11, 9, 10, 11, 13, 10, 9, 10];
    let runner = MockRunner::new().with_elapsed_ms_sequence("prove", &samples);

    let outcome = Pipeline::new(pipeline_config(dir.path()), &runner)
        .run()
        .unwrap();

    assert_eq!(
        outcome.prove_samples_ms,
        vec![10.0, 12.0, 11.0, 9.0, 10.0, 11.0, 13.0, 10.0, 9.0, 10.0]
    );
    assert_eq!(outcome.average_prove_ms(), Some(10.5));
    assert_eq!(outcome.prove.mean_ms, 10.5);
    assert_eq!(outcome.prove.min_ms, 9.0);
    assert_eq!(outcome.prove.max_ms, 13.0);
}

#[test]
fn test_iterations_controls_prove_count() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = pipeline_config(dir.path());
    cfg.iterations = 3;
    let runner = MockRunner::new();
    let outcome = Pipeline::new(cfg, &runner).run().unwrap();
    assert_eq!(runner.count("prove"), 3);
    assert_eq!(outcome.prove.iterations, 3);
}

#[test]
fn test_failure_halts_later_stages() {
    let dir = tempfile::tempdir().unwrap();
    let runner = MockRunner::new().failing("setup:groth16-setup", 1, "circuit too big for this ptau");

    let mut pipeline = Pipeline::new(pipeline_config(dir.path()), &runner);
    let err = pipeline.run().unwrap_err();

    match &err {
        BenchError::ProcessFailure {
            command,
            status,
            stderr,
        } => {
            assert!(command.contains("groth16 setup"));
            assert_eq!(*status, Some(1));
            assert_eq!(stderr, "circuit too big for this ptau");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("circuit too big for this ptau"));
    assert_eq!(
        runner.labels().last().map(String::as_str),
        Some("setup:groth16-setup")
    );
    assert_eq!(runner.count("setup:zkey"), 0);
    assert_eq!(runner.count("prove"), 0);
    assert_eq!(pipeline.state(), PipelineState::Aborted);
}

#[test]
fn test_compile_failure_runs_nothing_else() {
    let dir = tempfile::tempdir().unwrap();
    let runner = MockRunner::new().failing("compile", 1, "error[P1012]: parse error");
    let err = Pipeline::new(pipeline_config(dir.path()), &runner)
        .run()
        .unwrap_err();
    assert!(err.to_string().contains("parse error"));
    assert_eq!(runner.labels(), vec!["compile".to_string()]);
}

#[test]
fn test_verify_failure_aborts_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = pipeline_config(dir.path());
    cfg.verify = true;
    let runner = MockRunner::new().failing("verify", 1, "[ERROR] snarkJS: Invalid proof");

    let mut pipeline = Pipeline::new(cfg, &runner);
    let err = pipeline.run().unwrap_err();

    match &err {
        BenchError::ProcessFailure { command, status, stderr } => {
            assert!(command.contains("groth16 verify"));
            assert_eq!(*status, Some(1));
            assert!(stderr.contains("Invalid proof"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(runner.count("prove"), 10);
    assert_eq!(runner.labels().last().map(String::as_str), Some("verify"));
    assert_eq!(pipeline.state(), PipelineState::Aborted);
}

#[test]
fn test_interrupted_setup_is_redone() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = pipeline_config(dir.path());

    // zkey contribute fails after the earlier setup files already exist
    let broken = MockRunner::new().failing("setup:zkey-contribute", 1, "killed");
    assert!(Pipeline::new(cfg.clone(), &broken).run().is_err());

    let retry = MockRunner::new();
    let outcome = Pipeline::new(cfg, &retry).run().unwrap();
    assert_eq!(outcome.compile.status, StageStatus::Cached);
    assert_eq!(outcome.setup.status, StageStatus::Ran);
    assert_eq!(retry.count("setup:"), SETUP_LABELS.len());
}

#[test]
fn test_artifacts_without_stamp_do_not_skip() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = pipeline_config(dir.path());
    let layout = OutputLayout::new(&cfg.output_dir, &cfg.circuit_name, cfg.ptau_power);

    // leftovers of a run that never completed
    std::fs::create_dir_all(layout.js_dir()).unwrap();
    for path in [
        layout.r1cs(),
        layout.wasm(),
        layout.witness_generator(),
        layout.final_zkey(),
        layout.verification_key(),
    ] {
        std::fs::write(path, b"partial").unwrap();
    }

    let runner = MockRunner::new();
    Pipeline::new(cfg, &runner).run().unwrap();
    assert_eq!(runner.labels(), cold_labels());
}

#[test]
fn test_changed_source_invalidates_compile_and_setup() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = pipeline_config(dir.path());
    Pipeline::new(cfg.clone(), &MockRunner::new()).run().unwrap();

    write_source(dir.path(), "pragma circom 2.0.0;\ncomponent main = Sha256_2(16);\n");

    let runner = MockRunner::new();
    let outcome = Pipeline::new(cfg, &runner).run().unwrap();
    assert_eq!(outcome.compile.status, StageStatus::Ran);
    assert_eq!(outcome.setup.status, StageStatus::Ran);
    assert_eq!(runner.labels(), cold_labels());
}

#[test]
fn test_changed_ptau_power_reruns_setup_only() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = pipeline_config(dir.path());
    Pipeline::new(cfg.clone(), &MockRunner::new()).run().unwrap();

    cfg.ptau_power = 20;
    let runner = MockRunner::new();
    let outcome = Pipeline::new(cfg, &runner).run().unwrap();
    assert_eq!(outcome.compile.status, StageStatus::Cached);
    assert_eq!(outcome.setup.status, StageStatus::Ran);
    assert!(runner.calls()[1].command.contains("powersoftau new bn128 20"));
}

#[test]
fn test_no_cache_reruns_everything() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = pipeline_config(dir.path());
    Pipeline::new(cfg.clone(), &MockRunner::new()).run().unwrap();

    cfg.cache = false;
    let runner = MockRunner::new();
    Pipeline::new(cfg, &runner).run().unwrap();
    assert_eq!(runner.labels(), cold_labels());
}

#[test]
fn test_setup_tokens_differ_between_cold_runs() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    let first = MockRunner::new();
    let second = MockRunner::new();
    Pipeline::new(pipeline_config(a.path()), &first).run().unwrap();
    Pipeline::new(pipeline_config(b.path()), &second).run().unwrap();

    let contribute = |r: &MockRunner| {
        r.calls()
            .into_iter()
            .find(|i| i.label == "setup:ptau-contribute")
            .map(|i| i.command)
            .unwrap()
    };
    let (x, y) = (contribute(&first), contribute(&second));
    assert!(x.contains("-e="));
    // paths differ too, so compare only the entropy argument
    let entropy = |c: &str| c.rsplit("-e=").next().unwrap().to_string();
    assert_ne!(entropy(&x), entropy(&y));
}
