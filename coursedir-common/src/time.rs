//! Timestamp utilities

use chrono::{DateTime, NaiveDate, Utc};
use tracing::warn;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Modification-timestamp storage form (RFC 3339, seconds precision)
pub fn timestamp() -> String {
    now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// ISO-basic stamp used in backup and rolling-log file names
pub fn backup_stamp() -> String {
    now().format("%Y%m%dT%H%M%SZ").to_string()
}

/// Today's date in UTC, the reference point for expiration checks
pub fn today() -> NaiveDate {
    now().date_naive()
}

/// Parse an expiration-date field (`YYYY-MM-DD`)
///
/// Empty fields mean no expiration. An unparsable value is warned and
/// treated as no expiration rather than hiding the record on bad data.
pub fn parse_expiration(field: &str) -> Option<NaiveDate> {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            warn!(value = trimmed, "unparsable expiration date ignored");
            None
        }
    }
}
