//! Data models for roster imports
//!
//! - Entity kinds and canonical entity snapshots
//! - Raw batch rows as handed over by the row source
//! - Per-row outcomes and the batch report

pub mod entity;
pub mod report;
pub mod row;

pub use entity::{CanonicalEntity, EntityKind, RegistryKind};
pub use report::{ErrorKind, ImportReport, ImportSummary, ReportErrorEntry, RowError, RowOutcome, RowStatus, WriteKind};
pub use row::BatchRow;
