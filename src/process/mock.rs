//! Scripted command runner for testing.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::{BenchError, BenchResult};

use super::runner::{CommandRunner, Invocation, ProcessOutput};

#[derive(Debug, Clone)]
struct Failure {
    status: i32,
    stderr: String,
}

/// Runner that never spawns anything.
///
/// Every invocation is recorded. Rules are matched by label prefix; on success
/// the invocation's `produces` files are created, standing in for the real tool.
#[derive(Debug)]
pub struct MockRunner {
    default_elapsed: Duration,
    elapsed: Vec<(String, Duration)>,
    sequences: Mutex<Vec<(String, VecDeque<Duration>)>>,
    failures: Vec<(String, Failure)>,
    no_outputs: Vec<String>,
    calls: Mutex<Vec<Invocation>>,
}

impl Default for MockRunner {
    fn default() -> Self {
        MockRunner {
            default_elapsed: Duration::from_millis(1),
            elapsed: Vec::new(),
            sequences: Mutex::new(Vec::new()),
            failures: Vec::new(),
            no_outputs: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MockRunner {
    /// Create a runner where every command succeeds in 1ms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a fixed duration for labels starting with `prefix`.
    pub fn with_elapsed(mut self, prefix: impl Into<String>, elapsed: Duration) -> Self {
        self.elapsed.push((prefix.into(), elapsed));
        self
    }

    /// Report durations in order for successive matching calls.
    ///
    /// Sequences are consulted in registration order; an exhausted one falls through.
    pub fn with_elapsed_ms_sequence(mut self, prefix: impl Into<String>, ms: &[u64]) -> Self {
        let queue = ms.iter().map(|v| Duration::from_millis(*v)).collect();
        if let Ok(seqs) = self.sequences.get_mut() {
            seqs.push((prefix.into(), queue));
        }
        self
    }

    /// Exit non-zero for labels starting with `prefix`.
    pub fn failing(
        mut self,
        prefix: impl Into<String>,
        status: i32,
        stderr: impl Into<String>,
    ) -> Self {
        self.failures.push((
            prefix.into(),
            Failure {
                status,
                stderr: stderr.into(),
            },
        ));
        self
    }

    /// Succeed without creating the declared outputs.
    pub fn without_outputs(mut self, prefix: impl Into<String>) -> Self {
        self.no_outputs.push(prefix.into());
        self
    }

    /// All invocations received so far, in order.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn labels(&self) -> Vec<String> {
        self.calls().into_iter().map(|i| i.label).collect()
    }

    /// Number of invocations whose label starts with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|i| i.label.starts_with(prefix))
            .count()
    }

    fn elapsed_for(&self, label: &str) -> Duration {
        if let Ok(mut seqs) = self.sequences.lock() {
            let next = seqs
                .iter_mut()
                .filter(|(prefix, _)| label.starts_with(prefix.as_str()))
                .find_map(|(_, queue)| queue.pop_front());
            if let Some(d) = next {
                return d;
            }
        }
        self.elapsed
            .iter()
            .find(|(prefix, _)| label.starts_with(prefix.as_str()))
            .map(|(_, d)| *d)
            .unwrap_or(self.default_elapsed)
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, invocation: &Invocation) -> BenchResult<ProcessOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(invocation.clone());
        }

        let label = invocation.label.as_str();
        if let Some((_, failure)) = self
            .failures
            .iter()
            .find(|(prefix, _)| label.starts_with(prefix.as_str()))
        {
            return Err(BenchError::ProcessFailure {
                command: invocation.command.clone(),
                status: Some(failure.status),
                stderr: failure.stderr.clone(),
            });
        }

        let writes_outputs = !self.no_outputs.iter().any(|p| label.starts_with(p.as_str()));
        if writes_outputs {
            for path in &invocation.produces {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| BenchError::io("mock: create parent dir", e))?;
                }
                std::fs::write(path, format!("mock output of {label}\n"))
                    .map_err(|e| BenchError::io("mock: write output", e))?;
            }
        }

        Ok(ProcessOutput {
            stdout: String::new(),
            stderr: String::new(),
            status: Some(0),
            elapsed: self.elapsed_for(label),
            peak_memory_bytes: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_calls_and_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/proof.json");
        let runner = MockRunner::new();
        runner
            .run(&Invocation::new("prove", "snarkjs groth16 prove").producing(&out))
            .unwrap();
        assert!(out.exists());
        assert_eq!(runner.labels(), vec!["prove".to_string()]);
    }

    #[test]
    fn test_mock_sequence_then_fallback() {
        let runner = MockRunner::new()
            .with_elapsed("prove", Duration::from_millis(7))
            .with_elapsed_ms_sequence("prove", &[10, 12]);
        let inv = Invocation::new("prove", "x");
        assert_eq!(runner.run(&inv).unwrap().elapsed, Duration::from_millis(10));
        assert_eq!(runner.run(&inv).unwrap().elapsed, Duration::from_millis(12));
        assert_eq!(runner.run(&inv).unwrap().elapsed, Duration::from_millis(7));
    }

    #[test]
    fn test_mock_overlapping_sequences_use_registration_order() {
        let runner = MockRunner::new()
            .with_elapsed_ms_sequence("setup:", &[5])
            .with_elapsed_ms_sequence("setup:ptau", &[20, 21]);
        let inv = Invocation::new("setup:ptau-new", "x");
        assert_eq!(runner.run(&inv).unwrap().elapsed, Duration::from_millis(5));
        assert_eq!(runner.run(&inv).unwrap().elapsed, Duration::from_millis(20));
        assert_eq!(runner.run(&inv).unwrap().elapsed, Duration::from_millis(21));
        assert_eq!(runner.run(&inv).unwrap().elapsed, Duration::from_millis(1));
    }

    #[test]
    fn test_mock_failure_is_process_failure() {
        let runner = MockRunner::new().failing("setup:", 1, "bad ptau");
        let err = runner
            .run(&Invocation::new("setup:ptau-new", "snarkjs powersoftau new"))
            .unwrap_err();
        assert!(err.to_string().contains("bad ptau"));
        assert_eq!(runner.count("setup:"), 1);
    }

    #[test]
    fn test_mock_without_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("witness.wtns");
        let runner = MockRunner::new().without_outputs("witness");
        runner
            .run(&Invocation::new("witness", "node gen").producing(&out))
            .unwrap();
        assert!(!out.exists());
    }
}
