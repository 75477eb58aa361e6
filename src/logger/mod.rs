//! Structured activity logging for the sync layer.

pub mod jsonl;
