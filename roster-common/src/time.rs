//! Timestamp utilities

use chrono::{SecondsFormat, Utc};

/// Current UTC timestamp as RFC 3339 text, the form stored in the database
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
