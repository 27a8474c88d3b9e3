//! BenchRecord schema v1 - canonical schema for all benchmark outputs.

use serde::{Deserialize, Serialize};

use super::env::EnvironmentInfo;

/// Schema version for forward compatibility
pub const SCHEMA_VERSION: u32 = 1;

/// Timing statistics for a benchmark phase.
///
/// `mean_ms` is the reported aggregate. Min/max and the raw samples are kept
/// so stored records can be re-aggregated later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingStat {
    pub iterations: u32,
    pub mean_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub samples_ms: Vec<f64>,
}

impl TimingStat {
    /// Create TimingStat from a slice of sample times in milliseconds
    pub fn from_samples(samples: &[f64]) -> Self {
        let n = samples.len();
        if n == 0 {
            return TimingStat {
                iterations: 0,
                mean_ms: 0.0,
                min_ms: 0.0,
                max_ms: 0.0,
                samples_ms: Vec::new(),
            };
        }

        let sum: f64 = samples.iter().sum();
        let mean_ms = sum / n as f64;
        let min_ms = samples.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_ms = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        TimingStat {
            iterations: n as u32,
            mean_ms,
            min_ms,
            max_ms,
            samples_ms: samples.to_vec(),
        }
    }

    /// Single-sample stat for stages that run once.
    pub fn single(elapsed_ms: f64) -> Self {
        Self::from_samples(&[elapsed_ms])
    }
}

/// Whether a cacheable stage actually ran in this benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Ran,
    Cached,
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageStatus::Ran => f.write_str("ran"),
            StageStatus::Cached => f.write_str("cached"),
        }
    }
}

/// Proving system information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl BackendInfo {
    pub fn snarkjs_groth16(version: Option<String>) -> Self {
        BackendInfo {
            name: "snarkjs".to_string(),
            version,
            variant: Some("groth16".to_string()),
        }
    }
}

/// Run configuration for benchmarks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub measured_iterations: u32,
    pub ptau_power: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    pub cache: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            measured_iterations: 10,
            ptau_power: 19,
            timeout_secs: None,
            cache: true,
        }
    }
}

/// Canonical benchmark record - the unified output schema for all benchmarks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchRecord {
    /// Schema version for forward compatibility
    pub schema_version: u32,

    /// Unique identifier for this record
    pub record_id: String,

    /// ISO 8601 timestamp
    pub timestamp: String,

    /// Circuit name (short identifier)
    pub circuit_name: String,

    /// Path to circuit source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circuit_path: Option<String>,

    /// Environment information (CPU, OS, versions, etc.)
    pub env: EnvironmentInfo,

    /// Backend used for setup/proving
    pub backend: BackendInfo,

    /// Run configuration
    pub config: RunConfig,

    // --- Cache outcome ---
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compile_status: Option<StageStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_status: Option<StageStatus>,

    // --- Timing statistics ---
    /// Circuit compilation timing (absent when cached)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compile_stats: Option<TimingStat>,

    /// Witness generation timing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness_stats: Option<TimingStat>,

    /// Circuit-specific setup timing (absent when cached)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_stats: Option<TimingStat>,

    /// Proving timing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prove_stats: Option<TimingStat>,

    /// Verification timing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_stats: Option<TimingStat>,

    // --- Size metrics ---
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_size_bytes: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proving_key_size_bytes: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_key_size_bytes: Option<u64>,

    /// Constraint system (r1cs) size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r1cs_size_bytes: Option<u64>,

    // --- Memory metrics ---
    /// Peak resident set size in MB, over all tool invocations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_rss_mb: Option<f64>,

    // --- CLI context ---
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cli_args: Vec<String>,
}

impl BenchRecord {
    /// Create a new BenchRecord with required fields
    pub fn new(
        circuit_name: String,
        env: EnvironmentInfo,
        backend: BackendInfo,
        config: RunConfig,
    ) -> Self {
        let timestamp = crate::now_rfc3339();
        let record_id = uuid::Uuid::new_v4().simple().to_string();

        BenchRecord {
            schema_version: SCHEMA_VERSION,
            record_id,
            timestamp,
            circuit_name,
            circuit_path: None,
            env,
            backend,
            config,
            compile_status: None,
            setup_status: None,
            compile_stats: None,
            witness_stats: None,
            setup_stats: None,
            prove_stats: None,
            verify_stats: None,
            proof_size_bytes: None,
            proving_key_size_bytes: None,
            verification_key_size_bytes: None,
            r1cs_size_bytes: None,
            peak_rss_mb: None,
            cli_args: Vec::new(),
        }
    }
}
