//! CLI command handler for `history`.
//!
//! Summarises the runs stored in a JSONL history file, one line per run.

use std::path::PathBuf;

use crate::core::schema::BenchRecord;
use crate::storage::JsonlWriter;
use crate::{BenchError, BenchResult};

pub fn run(jsonl_path: PathBuf, circuit: Option<String>) -> BenchResult<()> {
    if !jsonl_path.exists() {
        return Err(BenchError::Message(format!(
            "JSONL file not found: {}",
            jsonl_path.display()
        )));
    }

    let records = JsonlWriter::new(&jsonl_path).read_filtered(circuit.as_deref())?;
    if records.is_empty() {
        eprintln!("No runs recorded in {}", jsonl_path.display());
        return Ok(());
    }
    for record in &records {
        println!("{}", summary_line(record));
    }
    eprintln!("{} run(s)", records.len());
    Ok(())
}

/// `<timestamp>  <circuit>  compile=<s> setup=<s>  prove mean=<ms> ms (n=<n>)`
pub fn summary_line(record: &BenchRecord) -> String {
    let status = |s: Option<crate::core::StageStatus>| {
        s.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string())
    };
    let prove = match &record.prove_stats {
        Some(stat) => format!("mean={:.3} ms (n={})", stat.mean_ms, stat.iterations),
        None => "-".to_string(),
    };
    format!(
        "{}  {}  compile={} setup={}  prove {}",
        record.timestamp,
        record.circuit_name,
        status(record.compile_status),
        status(record.setup_status),
        prove
    )
}
