//! Batch import pipeline

pub mod processor;
pub mod source;

pub use processor::{BatchError, BatchProcessor};
pub use source::{rows_from_csv, rows_from_json, BatchInputError};
