//! Raw batch rows

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One spreadsheet row as handed over by the row source
///
/// Column names are matched case-insensitively and ignoring surrounding
/// whitespace, so `ClassName`, `classname` and ` CLASSNAME ` are one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRow {
    /// 1-based position of the row in the batch, used in every report
    pub row_index: usize,
    fields: BTreeMap<String, String>,
}

impl BatchRow {
    pub fn new<K, V>(row_index: usize, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|(k, v)| (column_key(k.as_ref()), v.into()))
            .collect();
        Self { row_index, fields }
    }

    /// Trimmed value of a column, `None` when absent or blank
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .get(&column_key(column))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// True when every cell is empty (trailing spreadsheet rows)
    pub fn is_blank(&self) -> bool {
        self.fields.values().all(|v| v.trim().is_empty())
    }
}

pub(crate) fn column_key(column: &str) -> String {
    column.trim().to_lowercase()
}
