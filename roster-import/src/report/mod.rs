//! Tabular rendering of reports, audits and templates

pub mod formatter;
pub mod template;

pub use formatter::{audit_table, render_text, to_csv, to_table, Table};
pub use template::template;
