//! Row sources: CSV text and JSON objects
//!
//! File-level problems (unreadable text, a header without a required column)
//! are `BatchInputError`s and stop the batch before any row is processed.
//! Row-level problems are left to validation.

use csv::{ReaderBuilder, Trim};
use serde_json::{Map, Value};
use std::io::Read;
use thiserror::Error;

use crate::models::row::column_key;
use crate::models::{BatchRow, EntityKind};
use crate::validate::required_columns;

#[derive(Debug, Error)]
pub enum BatchInputError {
    #[error("Malformed batch input: {0}")]
    Malformed(String),

    #[error("Batch input has no header row")]
    MissingHeader,

    #[error("Missing required column '{column}' for {kind} import")]
    MissingColumn {
        column: &'static str,
        kind: EntityKind,
    },
}

impl From<csv::Error> for BatchInputError {
    fn from(err: csv::Error) -> Self {
        let message = match err.position() {
            Some(pos) => format!("line {}: {}", pos.line(), err),
            None => err.to_string(),
        };
        BatchInputError::Malformed(message)
    }
}

/// Parse CSV with a header row into batch rows
///
/// Header names are matched like row columns (trimmed, case-insensitive).
/// Short records are allowed; missing trailing cells read as empty.
pub fn rows_from_csv<R: Read>(reader: R, kind: EntityKind) -> Result<Vec<BatchRow>, BatchInputError> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(BatchInputError::MissingHeader);
    }

    let present: Vec<String> = headers.iter().map(column_key).collect();
    for column in required_columns(kind) {
        if !present.contains(&column_key(column)) {
            return Err(BatchInputError::MissingColumn { column, kind });
        }
    }

    rdr.records()
        .enumerate()
        .map(|(index, record)| {
            let record = record?;
            Ok(BatchRow::new(index + 1, headers.iter().zip(record.iter())))
        })
        .collect()
}

/// Convert JSON objects (one per row) into batch rows
///
/// Scalars become their text form so `"Day": 1` and `"Day": "1"` are the same
/// cell; `null` is an empty cell.
pub fn rows_from_json(objects: Vec<Map<String, Value>>) -> Vec<BatchRow> {
    objects
        .into_iter()
        .enumerate()
        .map(|(index, object)| {
            BatchRow::new(
                index + 1,
                object.into_iter().map(|(k, v)| (k, cell_text(v))),
            )
        })
        .collect()
}

fn cell_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SCHEDULE_CSV: &str = "\
ClassName,TeacherEmail,Subject,Day,StartTime,EndTime
7A,budi@school.id,Mathematics,1,07:00,08:00
7B, rina@school.id ,Biology,2,08:00,09:00
";

    #[test]
    fn test_csv_rows_are_one_based() {
        let rows = rows_from_csv(SCHEDULE_CSV.as_bytes(), EntityKind::Schedule).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_index, 1);
        assert_eq!(rows[1].get("teacheremail"), Some("rina@school.id"));
    }

    #[test]
    fn test_csv_header_missing_required_column() {
        let csv = "ClassName,Subject,Day,StartTime,EndTime\n7A,Art,1,07:00,08:00\n";
        let err = rows_from_csv(csv.as_bytes(), EntityKind::Schedule).unwrap_err();
        assert!(matches!(
            err,
            BatchInputError::MissingColumn {
                column: "TeacherEmail",
                kind: EntityKind::Schedule
            }
        ));
    }

    #[test]
    fn test_csv_header_case_insensitive() {
        let csv = "subject,CODE\nArt,ART\n";
        let rows = rows_from_csv(csv.as_bytes(), EntityKind::Subject).unwrap();
        assert_eq!(rows[0].get("Code"), Some("ART"));
    }

    #[test]
    fn test_empty_input_has_no_header() {
        let err = rows_from_csv("".as_bytes(), EntityKind::Subject).unwrap_err();
        assert!(matches!(err, BatchInputError::MissingHeader));
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let bytes: &[u8] = b"Subject,Code\n\xff\xfe,ART\n";
        let err = rows_from_csv(bytes, EntityKind::Subject).unwrap_err();
        assert!(matches!(err, BatchInputError::Malformed(_)));
    }

    #[test]
    fn test_json_scalars_become_text() {
        let objects = vec![json!({"Day": 3, "Subject": "Art", "Code": null})
            .as_object()
            .cloned()
            .unwrap()];
        let rows = rows_from_json(objects);
        assert_eq!(rows[0].get("Day"), Some("3"));
        assert_eq!(rows[0].get("Code"), None);
    }
}
