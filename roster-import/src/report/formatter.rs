//! Flat tables for export
//!
//! A `Table` is a header row followed by data rows, all strings. Everything
//! here is pure; writing the result somewhere is the caller's job.

use crate::models::{ImportReport, RowOutcome};
use crate::resolve::MatchResult;

pub type Table = Vec<Vec<String>>;

const REPORT_HEADER: [&str; 6] = ["Row", "Status", "ErrorKind", "Message", "Identifier", "Write"];
const AUDIT_HEADER: [&str; 4] = ["OldIdentifier", "ResolvedIdentifier", "Tier", "Status"];

fn header(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}

fn outcome_row(outcome: &RowOutcome) -> Vec<String> {
    let (kind, message) = match (&outcome.error, &outcome.note) {
        (Some(error), _) => (error.kind.to_string(), error.message.clone()),
        (None, Some(note)) => (String::new(), note.clone()),
        (None, None) => (String::new(), String::new()),
    };

    vec![
        outcome.row_index.to_string(),
        format!("{:?}", outcome.status).to_uppercase(),
        kind,
        message,
        outcome
            .resolved_entity
            .as_ref()
            .map(|e| e.primary_identifier.clone())
            .unwrap_or_default(),
        outcome
            .write
            .map(|w| format!("{:?}", w).to_uppercase())
            .unwrap_or_default(),
    ]
}

/// One line per row, in row order
pub fn to_table(report: &ImportReport) -> Table {
    std::iter::once(header(&REPORT_HEADER))
        .chain(report.outcomes().iter().map(outcome_row))
        .collect()
}

/// Old identifier, what it resolved to and which tier did it
pub fn audit_table(results: &[MatchResult]) -> Table {
    std::iter::once(header(&AUDIT_HEADER))
        .chain(results.iter().map(|r| {
            vec![
                r.raw_identifier.clone(),
                r.resolved_identifier().to_string(),
                r.matched_tier.to_string(),
                r.status.to_string(),
            ]
        }))
        .collect()
}

pub fn to_csv(table: &[Vec<String>]) -> Result<String, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    for row in table {
        writer.write_record(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| {
        csv::Error::from(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}

/// Column-aligned plain text for terminals
pub fn render_text(table: &[Vec<String>]) -> String {
    let columns = table.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|i| {
            table
                .iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    for row in table {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CanonicalEntity, ErrorKind, RegistryKind, WriteKind};
    use crate::resolve::{CanonicalRegistry, IdentifierResolver};
    use uuid::Uuid;

    fn report() -> ImportReport {
        ImportReport::from_outcomes(
            vec![
                RowOutcome::imported(
                    1,
                    CanonicalEntity::new(Uuid::new_v4(), "7A", "7A"),
                    WriteKind::Created,
                ),
                RowOutcome::failed(2, ErrorKind::ConstraintViolation, "Day 9, out of range"),
                RowOutcome::skipped(3, "blank row"),
            ],
            false,
        )
    }

    #[test]
    fn test_table_has_header_and_one_line_per_row() {
        let table = to_table(&report());
        assert_eq!(table.len(), 4);
        assert_eq!(table[0][0], "Row");
        assert_eq!(table[1], vec!["1", "IMPORTED", "", "", "7A", "CREATED"]);
        assert_eq!(table[2][1], "FAILED");
        assert_eq!(table[2][2], "ConstraintViolation");
        assert_eq!(table[3][3], "blank row");
    }

    #[test]
    fn test_csv_quotes_cells_with_commas() {
        let csv = to_csv(&to_table(&report())).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Row,Status,ErrorKind,Message,Identifier,Write");
        assert_eq!(lines[2], "2,FAILED,ConstraintViolation,\"Day 9, out of range\",,");
    }

    #[test]
    fn test_audit_table_rows() {
        let registry = CanonicalRegistry::new(
            RegistryKind::Teacher,
            vec![CanonicalEntity::new(Uuid::new_v4(), "rina.w@school.id", "Rina")],
        );
        let resolver = IdentifierResolver::default();
        let results = resolver.resolve_all(["rina@school.id", "zzqq@school.id"], &registry);

        let table = audit_table(&results);
        assert_eq!(table[1], vec!["rina@school.id", "rina.w@school.id", "3", "NORMALIZED_PREFIX"]);
        assert_eq!(table[2], vec!["zzqq@school.id", "zzqq@school.id", "5", "UNRESOLVED"]);
    }

    #[test]
    fn test_render_text_aligns_columns() {
        let table = vec![
            vec!["a".to_string(), "bb".to_string()],
            vec!["ccc".to_string(), "d".to_string()],
        ];
        assert_eq!(render_text(&table), "a    bb\nccc  d\n");
    }
}
