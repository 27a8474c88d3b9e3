use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{BenchError, BenchResult};

pub const FIXTURE_LEN: usize = 15;

/// Circuit input: two numeric-string sequences, `b` offset from `a`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFixture {
    a: Vec<String>,
    b: Vec<String>,
}

impl InputFixture {
    pub fn new(len: usize, offset: usize) -> Self {
        InputFixture {
            a: (0..len).map(|i| i.to_string()).collect(),
            b: (0..len).map(|i| (i + offset).to_string()).collect(),
        }
    }

    /// `a = 0..15`, `b = 15..30`.
    pub fn standard() -> Self {
        Self::new(FIXTURE_LEN, FIXTURE_LEN)
    }

    pub fn a(&self) -> &[String] {
        &self.a
    }

    pub fn b(&self) -> &[String] {
        &self.b
    }

    pub fn to_json(&self) -> BenchResult<String> {
        serde_json::to_string(self)
            .map_err(|e| BenchError::Message(format!("failed to serialize input: {e}")))
    }

    pub fn write_to(&self, path: &Path) -> BenchResult<()> {
        let json = self.to_json()?;
        std::fs::write(path, json)
            .map_err(|e| BenchError::io(format!("failed to write {}", path.display()), e))
    }
}
