//! Import templates: schema header plus two example rows per kind

use crate::models::EntityKind;
use crate::validate::columns;

use super::formatter::Table;

fn examples(kind: EntityKind) -> [&'static [&'static str]; 2] {
    match kind {
        EntityKind::Teacher => [
            &["Budi Santoso", "budi.santoso@school.id", "changeme", "teacher", "7A"],
            &["Rina Wati", "rina.wati@school.id", "changeme", "teacher", ""],
        ],
        EntityKind::Student => [
            &["Sari Dewi", "sari.dewi@school.id", "changeme", "student", "7A"],
            &["Andi Pratama", "andi.pratama@school.id", "changeme", "student", "7B"],
        ],
        EntityKind::Class => [
            &["7A", "7", "budi.santoso@school.id"],
            &["7B", "7", ""],
        ],
        EntityKind::Subject => [&["Mathematics", "MTK"], &["Biology", "BIO"]],
        EntityKind::Schedule => [
            &["7A", "budi.santoso@school.id", "Mathematics", "1", "07:00", "08:30"],
            &["7B", "rina.wati@school.id", "Biology", "3", "10:00", "11:30"],
        ],
    }
}

/// Header row in column order, then two filled-in examples
pub fn template(kind: EntityKind) -> Table {
    let header: Vec<String> = columns(kind).iter().map(|c| c.name.to_string()).collect();
    std::iter::once(header)
        .chain(
            examples(kind)
                .iter()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<_>>()),
        )
        .collect()
}
