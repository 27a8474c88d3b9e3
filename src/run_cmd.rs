//! `run` subcommand: benchmark one circuit end to end.

use std::path::PathBuf;

use tracing::info;

use crate::BenchResult;
use crate::config::{BenchConfig, ConfigOverrides};
use crate::core::{BackendInfo, BenchRecord, EnvironmentInfo, RunConfig};
use crate::engine::{BenchmarkOutcome, InputFixture, Pipeline, PipelineConfig, average_ms};
use crate::process::{CancelToken, CommandRunner, RunnerOptions, ShellRunner};
use crate::storage::{JsonlWriter, write_json};

/// Resolve configuration, run the pipeline with real tools, report and persist.
pub fn run(
    config_path: Option<PathBuf>,
    overrides: ConfigOverrides,
    cli_args: Vec<String>,
) -> BenchResult<()> {
    let cfg = BenchConfig::resolve(config_path.as_deref())?.apply_overrides(overrides);
    cfg.validate()?;

    let cancel = CancelToken::new();
    cancel.install_signal_handlers()?;
    let runner = ShellRunner::new(
        RunnerOptions::default()
            .with_timeout_secs(cfg.timeout_secs)
            .with_echo(cfg.echo_tools),
    )
    .with_cancel(cancel);

    let env = EnvironmentInfo::detect_with_tools(&cfg.tools);
    run_with_runner(&cfg, &runner, env, cli_args).map(|_| ())
}

/// Everything after runner construction; returns the persisted record.
pub fn run_with_runner(
    cfg: &BenchConfig,
    runner: &dyn CommandRunner,
    env: EnvironmentInfo,
    cli_args: Vec<String>,
) -> BenchResult<BenchRecord> {
    cfg.validate()?;
    println!("Input: {}", InputFixture::standard().to_json()?);

    let mut pipeline = Pipeline::new(PipelineConfig::from(cfg), runner);
    let outcome = pipeline.run()?;

    let mut record = build_record(cfg, &outcome, env);
    record.cli_args = cli_args;

    if let Some(path) = &cfg.json {
        write_json(path, &record)?;
        info!(path = %path.display(), "wrote record");
    }
    if let Some(path) = &cfg.jsonl {
        JsonlWriter::new(path).append(&record)?;
        info!(path = %path.display(), "appended record");
    }

    if let Some(avg) = average_ms(&outcome.prove_samples_ms) {
        println!("Average proving time: {avg} milliseconds");
    }
    Ok(record)
}

pub fn build_record(cfg: &BenchConfig, outcome: &BenchmarkOutcome, env: EnvironmentInfo) -> BenchRecord {
    let backend = BackendInfo::snarkjs_groth16(env.snarkjs_version.clone());
    let run_config = RunConfig {
        measured_iterations: cfg.iterations as u32,
        ptau_power: cfg.ptau_power,
        timeout_secs: (cfg.timeout_secs > 0).then_some(cfg.timeout_secs),
        cache: cfg.cache,
    };

    let mut record = BenchRecord::new(cfg.circuit_name.clone(), env, backend, run_config);
    record.circuit_path = Some(cfg.circuit_path.to_string_lossy().into_owned());
    record.compile_status = Some(outcome.compile.status);
    record.setup_status = Some(outcome.setup.status);
    record.compile_stats = outcome.compile.timing();
    record.witness_stats = outcome.witness.timing();
    record.setup_stats = outcome.setup.timing();
    record.prove_stats = Some(outcome.prove.clone());
    record.verify_stats = outcome.verify.as_ref().and_then(|v| v.timing());
    record.proof_size_bytes = outcome.proof_size_bytes;
    record.proving_key_size_bytes = outcome.zkey_size_bytes;
    record.verification_key_size_bytes = outcome.verification_key_size_bytes;
    record.r1cs_size_bytes = outcome.r1cs_size_bytes;
    record.peak_rss_mb = outcome
        .peak_memory_bytes
        .map(|b| b as f64 / (1024.0 * 1024.0));
    record
}
