//! Benchmark driver: compile, witness, setup, prove, and optionally verify.
//!
//! Stages run strictly one after another through a `CommandRunner`. The first
//! failure aborts the pipeline; nothing is retried. Compile and Setup consult
//! the `StageCache` and are skipped when a completed, matching run is on disk.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::backend::{SetupTokens, SnarkjsBackend};
use crate::config::{BenchConfig, ToolPaths};
use crate::core::{StageStatus, TimingStat};
use crate::process::{CommandRunner, Invocation, ProcessOutput};
use crate::{BenchError, BenchResult};

use super::cache::{CachedStage, StageCache, fingerprint};
use super::fixture::InputFixture;
use super::layout::OutputLayout;
use super::toolchain::CircomToolchain;

/// What the pipeline needs from the configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub circuit_name: String,
    pub circuit_path: PathBuf,
    pub output_dir: PathBuf,
    pub tools: ToolPaths,
    pub ptau_power: u32,
    pub iterations: usize,
    pub cache: bool,
    pub verify: bool,
}

impl From<&BenchConfig> for PipelineConfig {
    fn from(cfg: &BenchConfig) -> Self {
        PipelineConfig {
            circuit_name: cfg.circuit_name.clone(),
            circuit_path: cfg.circuit_path.clone(),
            output_dir: cfg.output_dir.clone(),
            tools: cfg.tools.clone(),
            ptau_power: cfg.ptau_power,
            iterations: cfg.iterations,
            cache: cfg.cache,
            verify: cfg.verify,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    Compiling,
    WitnessGen,
    SettingUp,
    /// 1-based
    Proving { iteration: usize },
    Verifying,
    Reporting,
    Done,
    Aborted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    pub status: StageStatus,
    /// `None` when the stage was served from cache
    pub elapsed_ms: Option<f64>,
}

impl StageReport {
    pub fn ran(elapsed_ms: f64) -> Self {
        StageReport {
            status: StageStatus::Ran,
            elapsed_ms: Some(elapsed_ms),
        }
    }

    pub fn cached() -> Self {
        StageReport {
            status: StageStatus::Cached,
            elapsed_ms: None,
        }
    }

    pub fn timing(&self) -> Option<TimingStat> {
        self.elapsed_ms.map(TimingStat::single)
    }
}

#[derive(Debug, Clone)]
pub struct BenchmarkOutcome {
    pub compile: StageReport,
    pub witness: StageReport,
    pub setup: StageReport,
    pub prove_samples_ms: Vec<f64>,
    pub prove: TimingStat,
    pub verify: Option<StageReport>,
    pub proof_size_bytes: Option<u64>,
    pub zkey_size_bytes: Option<u64>,
    pub verification_key_size_bytes: Option<u64>,
    pub r1cs_size_bytes: Option<u64>,
    /// Largest RSS seen across every command the pipeline ran
    pub peak_memory_bytes: Option<u64>,
}

impl BenchmarkOutcome {
    pub fn average_prove_ms(&self) -> Option<f64> {
        average_ms(&self.prove_samples_ms)
    }
}

/// Arithmetic mean; `None` for no samples.
pub fn average_ms(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let sum: f64 = samples.iter().sum();
    Some(sum / samples.len() as f64)
}

pub struct Pipeline<'a> {
    config: PipelineConfig,
    runner: &'a dyn CommandRunner,
    layout: OutputLayout,
    toolchain: CircomToolchain,
    backend: SnarkjsBackend,
    cache: StageCache,
    state: PipelineState,
    peak_memory: Option<u64>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: PipelineConfig, runner: &'a dyn CommandRunner) -> Self {
        let layout = OutputLayout::new(
            config.output_dir.clone(),
            config.circuit_name.clone(),
            config.ptau_power,
        );
        let cache = StageCache::new(layout.stamp_dir(), config.cache);
        Pipeline {
            toolchain: CircomToolchain::new(&config.tools),
            backend: SnarkjsBackend::new(config.tools.snarkjs.clone(), config.ptau_power),
            layout,
            cache,
            runner,
            config,
            state: PipelineState::Init,
            peak_memory: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Run every stage in order. On error the state is left at `Aborted`.
    pub fn run(&mut self) -> BenchResult<BenchmarkOutcome> {
        match self.run_stages() {
            Ok(outcome) => {
                self.transition(PipelineState::Done);
                Ok(outcome)
            }
            Err(e) => {
                error!(state = ?self.state, error = %e, "pipeline aborted");
                self.transition(PipelineState::Aborted);
                Err(e)
            }
        }
    }

    fn run_stages(&mut self) -> BenchResult<BenchmarkOutcome> {
        if self.config.iterations == 0 {
            return Err(BenchError::Config("iterations must be at least 1".into()));
        }

        let out = self.layout.dir().to_path_buf();
        std::fs::create_dir_all(&out)
            .map_err(|e| BenchError::io(format!("failed to create {}", out.display()), e))?;

        let source = read_source(&self.config.circuit_path)?;
        let compile_inv = self
            .toolchain
            .compile_invocation(&self.config.circuit_path, &self.layout)?;
        let compile_fp = fingerprint(&[&source, compile_inv.command.as_bytes()]);

        let compile = self.compile(&compile_inv, &compile_fp)?;
        let witness = self.generate_witness()?;

        let setup_fp = fingerprint(&[
            compile_fp.as_bytes(),
            self.backend.ptau_power().to_string().as_bytes(),
            self.backend.curve().as_bytes(),
            self.backend.setup_template(&self.layout)?.as_bytes(),
        ]);
        let setup = self.setup(&setup_fp)?;

        let prove_samples_ms = self.prove()?;
        let verify = if self.config.verify {
            Some(self.verify()?)
        } else {
            None
        };

        self.transition(PipelineState::Reporting);
        let prove = TimingStat::from_samples(&prove_samples_ms);
        Ok(BenchmarkOutcome {
            compile,
            witness,
            setup,
            prove_samples_ms,
            prove,
            verify,
            proof_size_bytes: file_size(&self.layout.proof()),
            zkey_size_bytes: file_size(&self.layout.final_zkey()),
            verification_key_size_bytes: file_size(&self.layout.verification_key()),
            r1cs_size_bytes: file_size(&self.layout.r1cs()),
            peak_memory_bytes: self.peak_memory,
        })
    }

    fn transition(&mut self, next: PipelineState) {
        debug!(from = ?self.state, to = ?next, "pipeline state");
        self.state = next;
    }

    /// Run one command, then check it left its outputs behind.
    fn execute(&mut self, stage: &str, invocation: &Invocation) -> BenchResult<ProcessOutput> {
        debug!(stage, label = %invocation.label, command = %invocation.command, "running");
        let output = self.runner.run(invocation)?;
        if let Some(peak) = output.peak_memory_bytes {
            self.peak_memory = Some(self.peak_memory.map_or(peak, |m| m.max(peak)));
        }
        ensure_exists(stage, &invocation.produces)?;
        Ok(output)
    }

    fn compile(&mut self, invocation: &Invocation, fp: &str) -> BenchResult<StageReport> {
        self.transition(PipelineState::Compiling);
        let outputs = self.toolchain.compile_outputs(&self.layout);
        if self.cache.can_skip(CachedStage::Compile, &outputs, fp) {
            println!("Cached compiled circuit found - skipping...");
            info!(stage = "compile", "cached");
            return Ok(StageReport::cached());
        }

        banner("Compiling circuit...");
        self.cache.invalidate(CachedStage::Compile)?;
        let output = self.execute("compile", invocation)?;
        self.cache.record(CachedStage::Compile, &outputs, fp)?;

        let ms = output.elapsed_ms();
        println!("Compilation took {ms} milliseconds");
        info!(stage = "compile", elapsed_ms = ms, "finished");
        Ok(StageReport::ran(ms))
    }

    fn generate_witness(&mut self) -> BenchResult<StageReport> {
        self.transition(PipelineState::WitnessGen);
        banner("Generating witness...");
        InputFixture::standard().write_to(&self.layout.input_json())?;
        ensure_exists("witness", &self.toolchain.witness_inputs(&self.layout))?;

        let invocation = self.toolchain.witness_invocation(&self.layout)?;
        let output = self.execute("witness", &invocation)?;

        let ms = output.elapsed_ms();
        println!("Witness generation took {ms} milliseconds");
        info!(stage = "witness", elapsed_ms = ms, "finished");
        Ok(StageReport::ran(ms))
    }

    fn setup(&mut self, fp: &str) -> BenchResult<StageReport> {
        self.transition(PipelineState::SettingUp);
        let outputs = self.backend.setup_outputs(&self.layout);
        if self.cache.can_skip(CachedStage::Setup, &outputs, fp) {
            println!("Cached trusted setup found - skipping...");
            info!(stage = "setup", "cached");
            return Ok(StageReport::cached());
        }

        banner("Performing trusted setup...");
        self.cache.invalidate(CachedStage::Setup)?;

        let tokens = SetupTokens::generate();
        let steps = self.backend.setup_steps(&self.layout, &tokens)?;
        let mut timed_ms = 0.0;
        for step in &steps {
            let stage = format!("setup:{}", step.name);
            ensure_exists(&stage, &step.inputs)?;
            let mut step_ms = 0.0;
            for invocation in &step.invocations {
                step_ms += self.execute(&stage, invocation)?.elapsed_ms();
            }
            debug!(step = step.name, timed = step.timed, elapsed_ms = step_ms, "setup step finished");
            if step.timed {
                timed_ms += step_ms;
            }
        }
        self.cache.record(CachedStage::Setup, &outputs, fp)?;

        println!("Setup took {timed_ms} milliseconds");
        info!(stage = "setup", elapsed_ms = timed_ms, "finished");
        Ok(StageReport::ran(timed_ms))
    }

    fn prove(&mut self) -> BenchResult<Vec<f64>> {
        let total = self.config.iterations;
        let invocation = self.backend.prove_invocation(&self.layout)?;
        let inputs = self.backend.prove_inputs(&self.layout);
        let mut samples = Vec::with_capacity(total);
        for iteration in 1..=total {
            self.transition(PipelineState::Proving { iteration });
            banner(&format!("Proving circuit... ({iteration}/{total})"));
            ensure_exists("prove", &inputs)?;
            let ms = self.execute("prove", &invocation)?.elapsed_ms();
            println!("Proving took {ms} milliseconds.");
            debug!(stage = "prove", iteration, elapsed_ms = ms, "sample");
            samples.push(ms);
        }
        Ok(samples)
    }

    fn verify(&mut self) -> BenchResult<StageReport> {
        self.transition(PipelineState::Verifying);
        banner("Verifying proof...");
        ensure_exists("verify", &self.backend.verify_inputs(&self.layout))?;
        let invocation = self.backend.verify_invocation(&self.layout)?;
        let ms = self.execute("verify", &invocation)?.elapsed_ms();
        println!("Verification took {ms} milliseconds");
        info!(stage = "verify", elapsed_ms = ms, "finished");
        Ok(StageReport::ran(ms))
    }
}

fn read_source(path: &Path) -> BenchResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => BenchError::MissingArtifact {
            stage: "compile".to_string(),
            path: path.to_path_buf(),
        },
        _ => BenchError::io(format!("failed to read {}", path.display()), e),
    })
}

fn ensure_exists(stage: &str, paths: &[PathBuf]) -> BenchResult<()> {
    match paths.iter().find(|p| !p.exists()) {
        Some(missing) => Err(BenchError::MissingArtifact {
            stage: stage.to_string(),
            path: missing.clone(),
        }),
        None => Ok(()),
    }
}

fn file_size(path: &Path) -> Option<u64> {
    std::fs::metadata(path).ok().map(|m| m.len())
}

/// Stage start line on stdout, green when attached to a terminal.
fn banner(text: &str) {
    info!("{text}");
    if std::io::stdout().is_terminal() {
        println!("\x1b[32m{text}\x1b[0m");
    } else {
        println!("{text}");
    }
}
