//! Surrogate-key utilities
//!
//! Surrogate keys are UUIDv4 strings, generated once at record creation and
//! never reused.

use uuid::Uuid;

/// Generate a new surrogate key
pub fn generate() -> String {
    Uuid::new_v4().to_string()
}

/// Parse a surrogate key from storage form
pub fn parse(s: &str) -> Result<Uuid, uuid::Error> {
    Uuid::parse_str(s)
}
