//! circom toolchain: circuit compilation and witness generation.
//!
//! A `CircomToolchain` only *builds* invocations; running them is the
//! `CommandRunner`'s job. This is distinct from `crate::backend`, which handles
//! the proving system (setup, prove, verify).

use std::path::{Path, PathBuf};

use crate::BenchResult;
use crate::config::ToolPaths;
use crate::process::{Invocation, shell_quote_path};

use super::layout::OutputLayout;

pub struct CircomToolchain {
    circom: PathBuf,
    node: PathBuf,
}

impl CircomToolchain {
    pub fn new(tools: &ToolPaths) -> Self {
        CircomToolchain {
            circom: tools.circom.clone(),
            node: tools.node.clone(),
        }
    }

    /// `circom <source> --r1cs --wasm -o <out>`
    pub fn compile_invocation(&self, source: &Path, layout: &OutputLayout) -> BenchResult<Invocation> {
        let command = format!(
            "{} {} --r1cs --wasm -o {}",
            shell_quote_path(&self.circom)?,
            shell_quote_path(source)?,
            shell_quote_path(layout.dir())?,
        );
        Ok(Invocation::new("compile", command)
            .producing(layout.r1cs())
            .producing(layout.wasm())
            .producing(layout.witness_generator()))
    }

    /// Artifacts compilation must leave behind.
    pub fn compile_outputs(&self, layout: &OutputLayout) -> Vec<PathBuf> {
        vec![layout.r1cs(), layout.wasm(), layout.witness_generator()]
    }

    /// `node generate_witness.js <wasm> <input.json> <witness.wtns>`
    pub fn witness_invocation(&self, layout: &OutputLayout) -> BenchResult<Invocation> {
        let command = format!(
            "{} {} {} {} {}",
            shell_quote_path(&self.node)?,
            shell_quote_path(&layout.witness_generator())?,
            shell_quote_path(&layout.wasm())?,
            shell_quote_path(&layout.input_json())?,
            shell_quote_path(&layout.witness())?,
        );
        Ok(Invocation::new("witness", command).producing(layout.witness()))
    }

    /// Inputs the witness generator reads.
    pub fn witness_inputs(&self, layout: &OutputLayout) -> Vec<PathBuf> {
        vec![layout.witness_generator(), layout.wasm(), layout.input_json()]
    }
}
