//! Per-row outcomes and the batch report
//!
//! The report is built once from the complete list of outcomes and is not
//! mutated afterwards. Summary counts are derived from the outcomes, so
//! `imported + failed + skipped` always equals the number of rows processed.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::entity::CanonicalEntity;

/// Final state of one row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RowStatus {
    Imported,
    Failed,
    Skipped,
}

/// Whether an imported row created a new entity or updated an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WriteKind {
    Created,
    Updated,
}

/// Row-local error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    MissingRequiredField,
    UnresolvedReference,
    DuplicateInBatch,
    ConstraintViolation,
    PersistenceError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::MissingRequiredField => "MissingRequiredField",
            ErrorKind::UnresolvedReference => "UnresolvedReference",
            ErrorKind::DuplicateInBatch => "DuplicateInBatch",
            ErrorKind::ConstraintViolation => "ConstraintViolation",
            ErrorKind::PersistenceError => "PersistenceError",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowError {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowOutcome {
    pub row_index: usize,
    pub status: RowStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RowError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_entity: Option<CanonicalEntity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write: Option<WriteKind>,
    /// Why a row was skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl RowOutcome {
    pub fn imported(row_index: usize, entity: CanonicalEntity, write: WriteKind) -> Self {
        Self {
            row_index,
            status: RowStatus::Imported,
            error: None,
            resolved_entity: Some(entity),
            write: Some(write),
            note: None,
        }
    }

    pub fn failed(row_index: usize, kind: ErrorKind, message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = kind.to_string();
        }
        Self {
            row_index,
            status: RowStatus::Failed,
            error: Some(RowError { kind, message }),
            resolved_entity: None,
            write: None,
            note: None,
        }
    }

    pub fn skipped(row_index: usize, note: impl Into<String>) -> Self {
        Self {
            row_index,
            status: RowStatus::Skipped,
            error: None,
            resolved_entity: None,
            write: None,
            note: Some(note.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl ImportSummary {
    pub fn total(&self) -> usize {
        self.imported + self.failed + self.skipped
    }

    fn count(mut self, outcome: &RowOutcome) -> Self {
        match outcome.status {
            RowStatus::Imported => self.imported += 1,
            RowStatus::Failed => self.failed += 1,
            RowStatus::Skipped => self.skipped += 1,
        }
        self
    }
}

/// Wire form of one failed row: `{"row": 2, "error": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportErrorEntry {
    pub row: usize,
    pub error: String,
}

/// Result of one batch
#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport {
    summary: ImportSummary,
    outcomes: Vec<RowOutcome>,
    cancelled: bool,
}

impl ImportReport {
    /// Fold outcomes (already in row order) into a report
    pub fn from_outcomes(outcomes: Vec<RowOutcome>, cancelled: bool) -> Self {
        let summary = outcomes
            .iter()
            .fold(ImportSummary::default(), ImportSummary::count);
        Self {
            summary,
            outcomes,
            cancelled,
        }
    }

    pub fn summary(&self) -> ImportSummary {
        self.summary
    }

    /// Every row, in row order
    pub fn outcomes(&self) -> &[RowOutcome] {
        &self.outcomes
    }

    /// Failed rows, in row order
    pub fn errors(&self) -> impl Iterator<Item = &RowOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == RowStatus::Failed)
    }

    /// True when the batch was stopped before every row was attempted
    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn error_entries(&self) -> Vec<ReportErrorEntry> {
        self.errors()
            .map(|o| ReportErrorEntry {
                row: o.row_index,
                error: o
                    .error
                    .as_ref()
                    .map(|e| e.message.clone())
                    .unwrap_or_default(),
            })
            .collect()
    }
}

#[derive(Serialize)]
struct ReportJson<'a> {
    summary: &'a ImportSummary,
    errors: Vec<ReportErrorEntry>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    cancelled: bool,
}

impl Serialize for ImportReport {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ReportJson {
            summary: &self.summary,
            errors: self.error_entries(),
            cancelled: self.cancelled,
        }
        .serialize(serializer)
    }
}
