//! Fixed artifact paths inside the output directory.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct OutputLayout {
    dir: PathBuf,
    circuit: String,
    ptau_power: u32,
}

impl OutputLayout {
    pub fn new(dir: impl Into<PathBuf>, circuit: impl Into<String>, ptau_power: u32) -> Self {
        OutputLayout {
            dir: dir.into(),
            circuit: circuit.into(),
            ptau_power,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn r1cs(&self) -> PathBuf {
        self.dir.join(format!("{}.r1cs", self.circuit))
    }

    /// Directory circom writes the wasm witness generator into.
    pub fn js_dir(&self) -> PathBuf {
        self.dir.join(format!("{}_js", self.circuit))
    }

    pub fn wasm(&self) -> PathBuf {
        self.js_dir().join(format!("{}.wasm", self.circuit))
    }

    pub fn witness_generator(&self) -> PathBuf {
        self.js_dir().join("generate_witness.js")
    }

    pub fn input_json(&self) -> PathBuf {
        self.dir.join("input.json")
    }

    pub fn witness(&self) -> PathBuf {
        self.dir.join("witness.wtns")
    }

    /// Ceremony file, e.g. `pot19_0000.ptau`; `tag` is `0000`, `0001` or `final`.
    pub fn ptau(&self, tag: &str) -> PathBuf {
        self.dir.join(format!("pot{}_{}.ptau", self.ptau_power, tag))
    }

    /// Key file, e.g. `sha256_2_x15_0001.zkey`.
    pub fn zkey(&self, tag: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.zkey", self.circuit, tag))
    }

    /// Key material used for proving.
    pub fn final_zkey(&self) -> PathBuf {
        self.zkey("0001")
    }

    pub fn verification_key(&self) -> PathBuf {
        self.dir.join("verification_key.json")
    }

    pub fn proof(&self) -> PathBuf {
        self.dir.join("proof.json")
    }

    pub fn public(&self) -> PathBuf {
        self.dir.join("public.json")
    }

    pub fn stamp_dir(&self) -> PathBuf {
        self.dir.join(".stamps")
    }
}
