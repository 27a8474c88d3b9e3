//! Shell command execution with output capture, deadlines and cancellation.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::{BenchError, BenchResult};

use super::cancel::CancelToken;

/// A single external command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Short name used in logs and by the mock runner (e.g. "setup:ptau-new")
    pub label: String,
    /// Full shell command line
    pub command: String,
    /// Artifacts the command is expected to create
    pub produces: Vec<PathBuf>,
}

impl Invocation {
    pub fn new(label: impl Into<String>, command: impl Into<String>) -> Self {
        Invocation {
            label: label.into(),
            command: command.into(),
            produces: Vec::new(),
        }
    }

    pub fn producing(mut self, path: impl Into<PathBuf>) -> Self {
        self.produces.push(path.into());
        self
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: Option<i32>,
    /// Wall time from spawn to exit
    pub elapsed: Duration,
    pub peak_memory_bytes: Option<u64>,
}

impl ProcessOutput {
    pub fn elapsed_ms(&self) -> f64 {
        // exact for whole-millisecond durations
        self.elapsed.as_nanos() as f64 / 1_000_000.0
    }
}

/// Executes invocations one at a time.
pub trait CommandRunner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> BenchResult<ProcessOutput>;
}

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Per-command deadline; `None` waits forever
    pub timeout: Option<Duration>,
    /// Forward tool output to our own stdout/stderr while capturing it
    pub echo: bool,
    pub poll_interval: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        RunnerOptions {
            timeout: None,
            echo: true,
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl RunnerOptions {
    /// Zero means no deadline.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }
}

/// Runs commands through `sh -c`, each in its own process group.
#[derive(Debug, Clone, Default)]
pub struct ShellRunner {
    options: RunnerOptions,
    cancel: CancelToken,
}

impl ShellRunner {
    pub fn new(options: RunnerOptions) -> Self {
        ShellRunner {
            options,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn spawn_failure(command: &str, e: std::io::Error) -> BenchError {
        BenchError::ProcessFailure {
            command: command.to_string(),
            status: None,
            stderr: format!("failed to spawn: {e}"),
        }
    }

    /// Wait for exit, enforcing the deadline and cancellation.
    fn wait(
        &self,
        mut child: std::process::Child,
        start: Instant,
        command: &str,
    ) -> BenchResult<(ExitStatus, Duration, Option<u64>)> {
        let pid = child.id();
        let (tx, rx) = mpsc::channel();
        let waiter = thread::spawn(move || {
            let result = child.wait();
            let _ = tx.send((result, Instant::now()));
        });

        let mut memory = MemorySampler::new(pid);

        loop {
            match rx.recv_timeout(self.options.poll_interval) {
                Ok((result, exited_at)) => {
                    let _ = waiter.join();
                    let status = result.map_err(|e| BenchError::io("failed to wait for child", e))?;
                    // leftover background jobs would hold the pipes open past the deadline
                    reap_stragglers(pid);
                    memory.sample();
                    return Ok((status, exited_at.duration_since(start), memory.peak()));
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(BenchError::Message(format!(
                        "lost track of child process {pid}: {command}"
                    )));
                }
            }

            let abort = if self.cancel.is_cancelled() {
                Some(BenchError::Cancelled {
                    command: command.to_string(),
                })
            } else {
                match self.options.timeout {
                    Some(timeout) if start.elapsed() >= timeout => Some(BenchError::Timeout {
                        command: command.to_string(),
                        timeout,
                    }),
                    _ => None,
                }
            };

            if let Some(err) = abort {
                warn!(pid, command, "terminating process group");
                if let Err(e) = kill_process_group(pid) {
                    warn!(pid, error = %e, "killpg failed");
                }
                // reap so no zombie outlives the run
                let _ = rx.recv();
                let _ = waiter.join();
                return Err(err);
            }

            memory.sample();
        }
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, invocation: &Invocation) -> BenchResult<ProcessOutput> {
        let command = invocation.command.as_str();
        if self.cancel.is_cancelled() {
            return Err(BenchError::Cancelled {
                command: command.to_string(),
            });
        }

        debug!(label = %invocation.label, command, "spawning");
        let mut cmd = shell_command(command);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|e| Self::spawn_failure(command, e))?;

        let echo = self.options.echo;
        let stdout_pump = child.stdout.take().map(|s| pump(s, Stream::Stdout, echo));
        let stderr_pump = child.stderr.take().map(|s| pump(s, Stream::Stderr, echo));

        let waited = self.wait(child, start, command);

        // The whole process group is dead at this point, so the pipes are closed.
        let stdout = join_pump(stdout_pump);
        let stderr = join_pump(stderr_pump);

        let (status, elapsed, peak_memory_bytes) = waited?;
        debug!(
            label = %invocation.label,
            status = ?status.code(),
            elapsed_ms = elapsed.as_millis() as u64,
            "exited"
        );

        if !status.success() {
            return Err(BenchError::ProcessFailure {
                command: command.to_string(),
                status: status.code(),
                stderr,
            });
        }

        Ok(ProcessOutput {
            stdout,
            stderr,
            status: status.code(),
            elapsed,
            peak_memory_bytes,
        })
    }
}

/// Quote one argument for interpolation into a `sh -c` command line.
pub fn shell_quote(arg: &str) -> BenchResult<String> {
    shlex::try_quote(arg)
        .map(|q| q.into_owned())
        .map_err(|e| BenchError::Config(format!("cannot quote argument {arg:?}: {e}")))
}

pub fn shell_quote_path(path: &Path) -> BenchResult<String> {
    shell_quote(&path.to_string_lossy())
}

#[cfg(unix)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(not(unix))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

#[cfg(unix)]
fn kill_process_group(pid: u32) -> std::io::Result<()> {
    // SAFETY: killpg has no memory-safety preconditions; the child was spawned
    // with process_group(0) so its pgid equals its pid.
    let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(unix))]
fn kill_process_group(pid: u32) -> std::io::Result<()> {
    Command::new("taskkill")
        .args(["/T", "/F", "/PID", &pid.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|_| ())
}

/// Kill whatever is left in the group after the shell itself exited.
///
/// An empty group is the normal case and reports ESRCH.
#[cfg(unix)]
fn reap_stragglers(pid: u32) {
    match kill_process_group(pid) {
        Ok(()) => debug!(pid, "killed leftover processes in group"),
        Err(e) if e.raw_os_error() == Some(libc::ESRCH) => {}
        Err(e) => warn!(pid, error = %e, "killpg failed"),
    }
}

// taskkill cannot find the tree once its root has exited.
#[cfg(not(unix))]
fn reap_stragglers(_pid: u32) {}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Copy a child's stream into a buffer, echoing it as it arrives.
fn pump<R: Read + Send + 'static>(mut reader: R, stream: Stream, echo: bool) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut captured = Vec::new();
        let mut buf = [0u8; 8192];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if echo {
                        forward(stream, &buf[..n]);
                    }
                    captured.extend_from_slice(&buf[..n]);
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        String::from_utf8_lossy(&captured).into_owned()
    })
}

fn forward(stream: Stream, bytes: &[u8]) {
    match stream {
        Stream::Stdout => {
            let mut out = std::io::stdout().lock();
            let _ = out.write_all(bytes);
            let _ = out.flush();
        }
        Stream::Stderr => {
            let mut err = std::io::stderr().lock();
            let _ = err.write_all(bytes);
        }
    }
}

fn join_pump(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Peak RSS of the direct child (the tool itself, since `sh -c` execs a simple command).
struct MemorySampler {
    #[cfg(feature = "mem")]
    sys: sysinfo::System,
    #[cfg(feature = "mem")]
    pid: sysinfo::Pid,
    peak: Option<u64>,
}

impl MemorySampler {
    fn new(pid: u32) -> Self {
        #[cfg(feature = "mem")]
        {
            use sysinfo::{ProcessRefreshKind, RefreshKind, System};
            MemorySampler {
                sys: System::new_with_specifics(
                    RefreshKind::new().with_processes(ProcessRefreshKind::everything()),
                ),
                pid: sysinfo::Pid::from_u32(pid),
                peak: None,
            }
        }
        #[cfg(not(feature = "mem"))]
        {
            let _ = pid;
            MemorySampler { peak: None }
        }
    }

    fn sample(&mut self) {
        #[cfg(feature = "mem")]
        {
            if self.sys.refresh_process(self.pid) {
                if let Some(p) = self.sys.process(self.pid) {
                    self.peak = Some(self.peak.unwrap_or(0).max(p.memory()));
                }
            }
        }
    }

    fn peak(&self) -> Option<u64> {
        self.peak
    }
}
