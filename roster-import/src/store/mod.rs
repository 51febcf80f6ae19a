//! Storage collaborators
//!
//! The batch pipeline talks to storage only through [`CanonicalStore`]:
//! one bulk read per registry at batch start, one upsert per valid row, and
//! one history record per finished batch.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    CanonicalEntity, EntityKind, ImportReport, ImportSummary, RegistryKind, ReportErrorEntry,
    WriteKind,
};
use crate::validate::{NaturalKey, ValidatedPayload};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value could not be decoded
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Store error: {0}")]
    Internal(String),
}

/// Result of one upsert
#[derive(Debug, Clone, PartialEq)]
pub struct Upserted {
    pub entity: CanonicalEntity,
    pub write: WriteKind,
}

/// Stored summary of a finished batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub batch_id: Uuid,
    pub kind: EntityKind,
    pub total_rows: usize,
    pub summary: ImportSummary,
    pub cancelled: bool,
    pub errors: Vec<ReportErrorEntry>,
    pub started_at: String,
    pub finished_at: String,
}

impl BatchRecord {
    pub fn from_report(
        batch_id: Uuid,
        kind: EntityKind,
        report: &ImportReport,
        started_at: String,
        finished_at: String,
    ) -> Self {
        Self {
            batch_id,
            kind,
            total_rows: report.summary().total(),
            summary: report.summary(),
            cancelled: report.cancelled(),
            errors: report.error_entries(),
            started_at,
            finished_at,
        }
    }
}

#[async_trait]
pub trait CanonicalStore: Send + Sync {
    /// Every entity of a referenceable kind, in insertion order
    async fn find_all(&self, kind: RegistryKind) -> Result<Vec<CanonicalEntity>, StoreError>;

    /// Create or update the entity identified by `key`
    async fn upsert(
        &self,
        key: &NaturalKey,
        payload: &ValidatedPayload,
    ) -> Result<Upserted, StoreError>;

    async fn count(&self, kind: EntityKind) -> Result<usize, StoreError>;

    async fn record_batch(&self, record: &BatchRecord) -> Result<(), StoreError>;

    async fn load_batch(&self, batch_id: Uuid) -> Result<Option<BatchRecord>, StoreError>;
}
