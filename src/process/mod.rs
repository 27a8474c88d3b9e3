//! External process execution.
//!
//! Every tool the benchmark drives (circom, node, snarkjs) is run through a
//! `CommandRunner`. `ShellRunner` is the real implementation; `MockRunner`
//! scripts outcomes for tests.

pub mod cancel;
pub mod mock;
pub mod runner;

pub use cancel::CancelToken;
pub use mock::MockRunner;
pub use runner::{
    CommandRunner, Invocation, ProcessOutput, RunnerOptions, ShellRunner, shell_quote,
    shell_quote_path,
};
