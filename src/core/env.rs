//! Environment detection utilities for benchmark records.

use std::path::Path;
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::config::ToolPaths;

/// Environment information for benchmark reproducibility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_cores: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_ram_bytes: Option<u64>,

    pub os: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_sha: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_dirty: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub circom_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub snarkjs_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_version: Option<String>,
}

impl Default for EnvironmentInfo {
    fn default() -> Self {
        EnvironmentInfo {
            cpu_model: None,
            cpu_cores: None,
            total_ram_bytes: None,
            os: std::env::consts::OS.to_string(),
            hostname: None,
            git_sha: None,
            git_dirty: None,
            circom_version: None,
            snarkjs_version: None,
            node_version: None,
        }
    }
}

impl EnvironmentInfo {
    /// Detect host information only (no tool shell-outs besides git).
    pub fn detect_host() -> Self {
        use sysinfo::System;

        let mut sys = System::new_all();
        sys.refresh_all();

        EnvironmentInfo {
            cpu_model: sys.cpus().first().map(|c| c.brand().to_string()),
            cpu_cores: sys.physical_core_count().map(|c| c as u32),
            total_ram_bytes: Some(sys.total_memory()),
            os: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
            hostname: System::host_name(),
            git_sha: detect_git_sha(),
            git_dirty: detect_git_dirty(),
            ..Default::default()
        }
    }

    /// Detect host information plus the versions of the configured tools.
    pub fn detect_with_tools(tools: &ToolPaths) -> Self {
        let mut env = Self::detect_host();
        env.circom_version = detect_tool_version(&tools.circom, "--version");
        env.snarkjs_version = detect_snarkjs_version(&tools.snarkjs);
        env.node_version = detect_tool_version(&tools.node, "--version");
        env
    }
}

/// Detect git SHA from `git rev-parse HEAD`
fn detect_git_sha() -> Option<String> {
    Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Detect if git working directory is dirty
fn detect_git_dirty() -> Option<bool> {
    Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| !o.stdout.is_empty())
}

fn detect_tool_version(path: &Path, flag: &str) -> Option<String> {
    Command::new(path)
        .arg(flag)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .and_then(|s| first_line(&s))
}

/// snarkjs prints its banner and usage and exits non-zero for `--version`.
fn detect_snarkjs_version(path: &Path) -> Option<String> {
    let output = Command::new(path).arg("--version").output().ok()?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_snarkjs_version(&stdout)
}

/// Extract `0.7.5` from a banner line like `snarkjs@0.7.5`.
pub fn parse_snarkjs_version(output: &str) -> Option<String> {
    let line = output.lines().map(str::trim).find(|l| !l.is_empty())?;
    match line.split_once('@') {
        Some((_, version)) => version.split_whitespace().next().map(str::to_string),
        None => Some(line.to_string()),
    }
}

fn first_line(s: &str) -> Option<String> {
    s.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}
