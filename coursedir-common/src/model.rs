//! Record model and flag conventions
//!
//! A record is an ordered tuple of untyped string fields. Typed meaning
//! ("Yes"/"No" flags, the persist active/inactive sub-flag, dates) is a
//! convention interpreted at the call site, not enforced by the store.

use serde::{Deserialize, Serialize};

/// How a loaded row related to the current schema width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowShape {
    /// Width matched the current schema
    Current,
    /// A tolerated historical width, padded up to current
    Padded,
    /// Unrecognized width; preserved verbatim and excluded from matching
    Malformed,
}

/// One record: ordered string fields at fixed positions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: Vec<String>,
    shape: RowShape,
}

impl Record {
    /// Build a record with the current shape
    pub fn new(fields: Vec<String>) -> Self {
        Self {
            fields,
            shape: RowShape::Current,
        }
    }

    /// Build a record with an explicit shape (used by the loader)
    pub fn with_shape(fields: Vec<String>, shape: RowShape) -> Self {
        Self { fields, shape }
    }

    /// Field value at `idx`, or "" when out of range
    pub fn get(&self, idx: usize) -> &str {
        self.fields.get(idx).map(String::as_str).unwrap_or("")
    }

    /// Overwrite the field at `idx`; out-of-range writes are ignored
    pub fn set(&mut self, idx: usize, value: impl Into<String>) {
        if let Some(slot) = self.fields.get_mut(idx) {
            *slot = value.into();
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn shape(&self) -> RowShape {
        self.shape
    }

    /// Malformed rows are carried through untouched and never matched
    pub fn is_malformed(&self) -> bool {
        self.shape == RowShape::Malformed
    }

    /// Storage form: fields joined by the store delimiter
    pub fn to_line(&self, delimiter: char) -> String {
        self.fields.join(&delimiter.to_string())
    }
}

/// Whether a flag field holds "Yes" (case-insensitive, trimmed)
pub fn is_yes(field: &str) -> bool {
    field.trim().eq_ignore_ascii_case("yes")
}

/// Whether a flag field holds "No" (case-insensitive, trimmed)
///
/// Distinct from `!is_yes`: an empty or unrecognized value is neither, and
/// the two defaults differ per flag (sync participation defaults on, persist
/// defaults off).
pub fn is_no(field: &str) -> bool {
    field.trim().eq_ignore_ascii_case("no")
}

/// The persist active/inactive sub-flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersistState {
    Active,
    Inactive,
}

impl PersistState {
    /// Parse from storage form; anything other than "inactive" reads as
    /// active (the pre-migration rows carried no value at all)
    pub fn parse(field: &str) -> Self {
        if field.trim().eq_ignore_ascii_case("inactive") {
            PersistState::Inactive
        } else {
            PersistState::Active
        }
    }

    /// Storage form
    pub fn as_str(&self) -> &'static str {
        match self {
            PersistState::Active => "active",
            PersistState::Inactive => "inactive",
        }
    }
}
