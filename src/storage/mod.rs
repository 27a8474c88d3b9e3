//! Storage layer for benchmark records.

pub mod jsonl;

pub use jsonl::{JsonlWriter, write_json};
