//! Benchmark configuration: defaults, optional TOML file, CLI overrides.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::{BenchError, BenchResult};

pub const DEFAULT_CONFIG: &str = "circom-bench.toml";
pub const DEFAULT_CIRCUIT_NAME: &str = "sha256_2_x15";
pub const DEFAULT_CIRCUIT_PATH: &str = "circuits/sha256/sha256_2_x15.circom";
pub const DEFAULT_OUTPUT_DIR: &str = ".output";
pub const DEFAULT_PTAU_POWER: u32 = 19;
pub const DEFAULT_ITERATIONS: usize = 10;

/// Largest ceremony snarkjs can initialise.
const MAX_PTAU_POWER: u32 = 28;

/// Paths (or bare names on PATH) of the external tools.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolPaths {
    pub circom: PathBuf,
    pub node: PathBuf,
    pub snarkjs: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        ToolPaths {
            circom: PathBuf::from("circom"),
            node: PathBuf::from("node"),
            snarkjs: PathBuf::from("snarkjs"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    pub circuit_name: String,
    pub circuit_path: PathBuf,
    pub output_dir: PathBuf,
    pub tools: ToolPaths,
    pub ptau_power: u32,
    pub iterations: usize,
    /// Per-command deadline in seconds; 0 disables it
    pub timeout_secs: u64,
    pub cache: bool,
    pub verify: bool,
    pub echo_tools: bool,
    pub json: Option<PathBuf>,
    pub jsonl: Option<PathBuf>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            circuit_name: DEFAULT_CIRCUIT_NAME.to_string(),
            circuit_path: PathBuf::from(DEFAULT_CIRCUIT_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            tools: ToolPaths::default(),
            ptau_power: DEFAULT_PTAU_POWER,
            iterations: DEFAULT_ITERATIONS,
            timeout_secs: 0,
            cache: true,
            verify: false,
            echo_tools: true,
            json: None,
            jsonl: None,
        }
    }
}

/// Values given on the command line; `None` keeps the file/default value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub circuit_name: Option<String>,
    pub circuit_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub circom: Option<PathBuf>,
    pub node: Option<PathBuf>,
    pub snarkjs: Option<PathBuf>,
    pub ptau_power: Option<u32>,
    pub iterations: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub no_cache: bool,
    pub verify: bool,
    pub quiet_tools: bool,
    pub json: Option<PathBuf>,
    pub jsonl: Option<PathBuf>,
}

impl BenchConfig {
    pub fn from_toml_str(s: &str) -> BenchResult<Self> {
        toml::from_str(s).map_err(|e| BenchError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> BenchResult<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let cfg = toml::from_str(&s)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(cfg)
    }

    /// Load `path` if given, else `circom-bench.toml` if present, else defaults.
    pub fn resolve(path: Option<&Path>) -> BenchResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let default = Path::new(DEFAULT_CONFIG);
                if default.exists() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn apply_overrides(mut self, o: ConfigOverrides) -> Self {
        if let Some(v) = o.circuit_name {
            self.circuit_name = v;
        }
        if let Some(v) = o.circuit_path {
            self.circuit_path = v;
        }
        if let Some(v) = o.output_dir {
            self.output_dir = v;
        }
        if let Some(v) = o.circom {
            self.tools.circom = v;
        }
        if let Some(v) = o.node {
            self.tools.node = v;
        }
        if let Some(v) = o.snarkjs {
            self.tools.snarkjs = v;
        }
        if let Some(v) = o.ptau_power {
            self.ptau_power = v;
        }
        if let Some(v) = o.iterations {
            self.iterations = v;
        }
        if let Some(v) = o.timeout_secs {
            self.timeout_secs = v;
        }
        if o.no_cache {
            self.cache = false;
        }
        if o.verify {
            self.verify = true;
        }
        if o.quiet_tools {
            self.echo_tools = false;
        }
        if o.json.is_some() {
            self.json = o.json;
        }
        if o.jsonl.is_some() {
            self.jsonl = o.jsonl;
        }
        self
    }

    pub fn validate(&self) -> BenchResult<()> {
        if self.iterations == 0 {
            return Err(BenchError::Config("iterations must be at least 1".into()));
        }
        if !(1..=MAX_PTAU_POWER).contains(&self.ptau_power) {
            return Err(BenchError::Config(format!(
                "ptau_power must be in 1..={MAX_PTAU_POWER}, got {}",
                self.ptau_power
            )));
        }
        if self.circuit_name.trim().is_empty() {
            return Err(BenchError::Config("circuit_name must not be empty".into()));
        }
        Ok(())
    }
}
