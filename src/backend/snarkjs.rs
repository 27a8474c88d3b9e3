//! snarkjs backend: powers-of-tau ceremony, Groth16 key setup, prove, verify.

use std::path::PathBuf;

use crate::BenchResult;
use crate::engine::layout::OutputLayout;
use crate::process::{Invocation, shell_quote, shell_quote_path};

/// Contribution name and entropy strings for one run's setup.
///
/// Generated fresh per run and never persisted, so two cold runs produce
/// different key material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupTokens {
    pub contribution_name: String,
    pub entropy_0: String,
    pub entropy_1: String,
}

impl SetupTokens {
    pub fn generate() -> Self {
        SetupTokens {
            contribution_name: uuid::Uuid::new_v4().to_string(),
            entropy_0: uuid::Uuid::new_v4().to_string(),
            entropy_1: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Fixed tokens, for fingerprinting the command templates.
    pub fn placeholder() -> Self {
        SetupTokens {
            contribution_name: "{name}".to_string(),
            entropy_0: "{entropy0}".to_string(),
            entropy_1: "{entropy1}".to_string(),
        }
    }
}

/// One link of the setup chain.
#[derive(Debug, Clone)]
pub struct SetupStep {
    pub name: &'static str,
    /// Counted towards the reported setup duration
    pub timed: bool,
    /// Files produced by earlier steps (or stages) that this step consumes
    pub inputs: Vec<PathBuf>,
    pub invocations: Vec<Invocation>,
}

#[derive(Debug, Clone)]
pub struct SnarkjsBackend {
    snarkjs: PathBuf,
    curve: String,
    ptau_power: u32,
}

impl SnarkjsBackend {
    pub fn new(snarkjs: impl Into<PathBuf>, ptau_power: u32) -> Self {
        SnarkjsBackend {
            snarkjs: snarkjs.into(),
            curve: "bn128".to_string(),
            ptau_power,
        }
    }

    pub fn ptau_power(&self) -> u32 {
        self.ptau_power
    }

    pub fn curve(&self) -> &str {
        &self.curve
    }

    fn cmd(&self, args: &str) -> BenchResult<String> {
        Ok(format!("{} {}", shell_quote_path(&self.snarkjs)?, args))
    }

    /// The five setup steps, in dependency order.
    ///
    /// Steps 1-2 bootstrap a circuit-independent ceremony and are not timed.
    pub fn setup_steps(&self, layout: &OutputLayout, tokens: &SetupTokens) -> BenchResult<Vec<SetupStep>> {
        let q = shell_quote_path;
        let ptau_0 = layout.ptau("0000");
        let ptau_1 = layout.ptau("0001");
        let ptau_final = layout.ptau("final");
        let zkey_0 = layout.zkey("0000");
        let zkey_1 = layout.zkey("0001");
        let vk = layout.verification_key();

        let ptau_new = Invocation::new(
            "setup:ptau-new",
            self.cmd(&format!(
                "powersoftau new {} {} {} -v",
                shell_quote(&self.curve)?,
                self.ptau_power,
                q(&ptau_0)?
            ))?,
        )
        .producing(&ptau_0);

        let ptau_contribute = Invocation::new(
            "setup:ptau-contribute",
            self.cmd(&format!(
                "powersoftau contribute {} {} --name={} -v -e={}",
                q(&ptau_0)?,
                q(&ptau_1)?,
                shell_quote("First contribution")?,
                shell_quote(&tokens.entropy_0)?
            ))?,
        )
        .producing(&ptau_1);

        let ptau_prepare = Invocation::new(
            "setup:ptau-prepare",
            self.cmd(&format!(
                "powersoftau prepare phase2 {} {} -v",
                q(&ptau_1)?,
                q(&ptau_final)?
            ))?,
        )
        .producing(&ptau_final);

        let groth16_setup = Invocation::new(
            "setup:groth16-setup",
            self.cmd(&format!(
                "groth16 setup {} {} {}",
                q(&layout.r1cs())?,
                q(&ptau_final)?,
                q(&zkey_0)?
            ))?,
        )
        .producing(&zkey_0);

        let zkey_contribute = Invocation::new(
            "setup:zkey-contribute",
            self.cmd(&format!(
                "zkey contribute {} {} --name={} -v -e={}",
                q(&zkey_0)?,
                q(&zkey_1)?,
                shell_quote(&format!("sha2_benchmark_{}", tokens.contribution_name))?,
                shell_quote(&tokens.entropy_1)?
            ))?,
        )
        .producing(&zkey_1);

        let zkey_export = Invocation::new(
            "setup:zkey-export",
            self.cmd(&format!(
                "zkey export verificationkey {} {}",
                q(&zkey_1)?,
                q(&vk)?
            ))?,
        )
        .producing(&vk);

        Ok(vec![
            SetupStep {
                name: "ptau-new",
                timed: false,
                inputs: Vec::new(),
                invocations: vec![ptau_new],
            },
            SetupStep {
                name: "ptau-contribute",
                timed: false,
                inputs: vec![ptau_0],
                invocations: vec![ptau_contribute],
            },
            SetupStep {
                name: "ptau-prepare",
                timed: true,
                inputs: vec![ptau_1],
                invocations: vec![ptau_prepare],
            },
            SetupStep {
                name: "groth16-setup",
                timed: true,
                inputs: vec![layout.r1cs(), ptau_final],
                invocations: vec![groth16_setup],
            },
            SetupStep {
                name: "zkey-contribute",
                timed: true,
                inputs: vec![zkey_0],
                invocations: vec![zkey_contribute, zkey_export],
            },
        ])
    }

    /// Artifacts a completed setup leaves behind for proving and verifying.
    pub fn setup_outputs(&self, layout: &OutputLayout) -> Vec<PathBuf> {
        vec![layout.final_zkey(), layout.verification_key()]
    }

    /// The setup commands with placeholder tokens, for cache fingerprinting.
    pub fn setup_template(&self, layout: &OutputLayout) -> BenchResult<String> {
        let steps = self.setup_steps(layout, &SetupTokens::placeholder())?;
        Ok(steps
            .iter()
            .flat_map(|s| s.invocations.iter().map(|i| i.command.as_str()))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// `snarkjs groth16 prove <zkey> <witness> <proof> <public>`
    pub fn prove_invocation(&self, layout: &OutputLayout) -> BenchResult<Invocation> {
        let command = self.cmd(&format!(
            "groth16 prove {} {} {} {}",
            shell_quote_path(&layout.final_zkey())?,
            shell_quote_path(&layout.witness())?,
            shell_quote_path(&layout.proof())?,
            shell_quote_path(&layout.public())?
        ))?;
        Ok(Invocation::new("prove", command)
            .producing(layout.proof())
            .producing(layout.public()))
    }

    pub fn prove_inputs(&self, layout: &OutputLayout) -> Vec<PathBuf> {
        vec![layout.final_zkey(), layout.witness()]
    }

    /// `snarkjs groth16 verify <vk> <public> <proof>`
    pub fn verify_invocation(&self, layout: &OutputLayout) -> BenchResult<Invocation> {
        let command = self.cmd(&format!(
            "groth16 verify {} {} {}",
            shell_quote_path(&layout.verification_key())?,
            shell_quote_path(&layout.public())?,
            shell_quote_path(&layout.proof())?
        ))?;
        Ok(Invocation::new("verify", command))
    }

    pub fn verify_inputs(&self, layout: &OutputLayout) -> Vec<PathBuf> {
        vec![layout.verification_key(), layout.public(), layout.proof()]
    }
}
