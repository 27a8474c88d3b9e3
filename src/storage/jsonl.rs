//! JSONL (JSON Lines) storage for benchmark records.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::core::schema::{BenchRecord, SCHEMA_VERSION};
use crate::{BenchError, BenchResult};

/// Append-only run history, one `BenchRecord` per line.
///
/// Appending never rewrites earlier lines, so a history file can be shared by
/// many runs and streamed without loading it whole.
#[derive(Debug, Clone)]
pub struct JsonlWriter {
    path: PathBuf,
}

impl JsonlWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        JsonlWriter {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a single record, creating the file and its directory if needed.
    ///
    /// # Errors
    /// Fails if the record's `schema_version` is not `SCHEMA_VERSION`, or on
    /// I/O and serialization errors.
    pub fn append(&self, record: &BenchRecord) -> BenchResult<()> {
        if record.schema_version != SCHEMA_VERSION {
            return Err(BenchError::Message(format!(
                "schema version mismatch: record has v{}, expected v{}",
                record.schema_version, SCHEMA_VERSION
            )));
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    BenchError::io(format!("failed to create {}", parent.display()), e)
                })?;
            }
        }

        let json = serde_json::to_string(record)
            .map_err(|e| BenchError::Message(format!("failed to serialize record: {e}")))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| BenchError::io(format!("failed to open {}", self.path.display()), e))?;
        writeln!(file, "{json}")
            .map_err(|e| BenchError::io(format!("failed to write {}", self.path.display()), e))
    }

    pub fn read_all(&self) -> BenchResult<Vec<BenchRecord>> {
        self.read_filtered(None)
    }

    /// Read records, keeping only `circuit_name` when given. Blank lines are skipped.
    pub fn read_filtered(&self, circuit_name: Option<&str>) -> BenchResult<Vec<BenchRecord>> {
        let file = File::open(&self.path)
            .map_err(|e| BenchError::io(format!("failed to open {}", self.path.display()), e))?;

        let mut records = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line_no = idx + 1;
            let line = line.map_err(|e| BenchError::io(format!("failed to read line {line_no}"), e))?;
            if line.trim().is_empty() {
                continue;
            }
            let record: BenchRecord = serde_json::from_str(&line).map_err(|e| {
                BenchError::Message(format!(
                    "{}:{line_no}: failed to parse record: {e}",
                    self.path.display()
                ))
            })?;
            if circuit_name.is_some_and(|name| record.circuit_name != name) {
                continue;
            }
            records.push(record);
        }
        Ok(records)
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Number of non-blank lines; 0 if the file does not exist.
    pub fn count(&self) -> BenchResult<usize> {
        if !self.path.exists() {
            return Ok(0);
        }
        let file = File::open(&self.path)
            .map_err(|e| BenchError::io(format!("failed to open {}", self.path.display()), e))?;
        Ok(BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter(|l| !l.trim().is_empty())
            .count())
    }
}

/// Write one record as pretty JSON, replacing any existing file.
pub fn write_json(path: &Path, record: &BenchRecord) -> BenchResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| BenchError::io(format!("failed to create {}", parent.display()), e))?;
        }
    }
    let json = serde_json::to_string_pretty(record)
        .map_err(|e| BenchError::Message(format!("failed to serialize record: {e}")))?;
    std::fs::write(path, json)
        .map_err(|e| BenchError::io(format!("failed to write {}", path.display()), e))
}
