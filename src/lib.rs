pub mod backend;
pub mod config;
pub mod core;
pub mod engine;
pub mod history_cmd;
pub mod process;
pub mod run_cmd;
pub mod storage;

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenchError {
    /// An external command could not be launched or exited abnormally.
    #[error("command failed ({}): {command}\n{stderr}", display_status(.status))]
    ProcessFailure {
        command: String,
        status: Option<i32>,
        stderr: String,
    },
    #[error("command timed out after {}s: {command}", .timeout.as_secs_f64())]
    Timeout { command: String, timeout: Duration },
    #[error("command cancelled: {command}")]
    Cancelled { command: String },
    #[error("{stage}: missing artifact {}", .path.display())]
    MissingArtifact { stage: String, path: PathBuf },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl BenchError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        BenchError::Io { context: context.into(), source }
    }
}

fn display_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {code}"),
        None => "no exit status".to_string(),
    }
}

pub type BenchResult<T> = Result<T, BenchError>;

pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha256::digest;
    digest(bytes)
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}
