//! Catalog Schema Definitions
//!
//! Single source of truth for the positional layout of every record kind.
//! Each module defines the column indexes for one file format plus the set
//! of tolerated historical widths (schema migrations are additive-column
//! only: short rows from before a migration are padded, never truncated).

/// Positional schema for one record kind
#[derive(Debug, Clone, Copy)]
pub struct RecordSchema {
    /// Record kind name, used in logs and run summaries
    pub name: &'static str,
    /// Column names in storage order
    pub columns: &'static [&'static str],
    /// Field counts from earlier schema versions that the loader pads
    pub historical_widths: &'static [usize],
}

impl RecordSchema {
    /// Current field count
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Header row in storage form
    pub fn header(&self) -> String {
        self.columns.join("\t")
    }

    /// Whether a row of `width` fields is loadable (current or historical)
    pub fn tolerates(&self, width: usize) -> bool {
        width == self.width() || self.historical_widths.contains(&width)
    }
}

/// Course catalog: the locally-owned course directory
pub mod course {
    use super::RecordSchema;

    pub const GUID: usize = 0;
    pub const CODE: usize = 1;
    pub const TITLE: usize = 2;
    pub const PROVIDER: usize = 3;
    pub const DESCRIPTION: usize = 4;
    pub const HOURS: usize = 5;
    pub const LEVEL: usize = 6;
    pub const URL: usize = 7;
    pub const SYNC: usize = 8;
    pub const PERSIST: usize = 9;
    pub const PERSIST_STATE: usize = 10;
    pub const INCLUDED: usize = 11;
    pub const EXPIRES: usize = 12;
    pub const UPDATED: usize = 13;
    // Appended by the notes/owner migration; migrations only ever add
    // trailing columns so historical rows pad cleanly
    pub const NOTES: usize = 14;
    pub const OWNER: usize = 15;

    pub const COLUMNS: &[&str] = &[
        "guid",
        "code",
        "title",
        "provider",
        "description",
        "hours",
        "level",
        "url",
        "sync",
        "persist",
        "persist_state",
        "included",
        "expires",
        "updated",
        "notes",
        "owner",
    ];

    // Rows written before the notes/owner columns were added
    pub const HISTORICAL_WIDTHS: &[usize] = &[14];

    pub fn schema() -> RecordSchema {
        RecordSchema {
            name: "courses",
            columns: COLUMNS,
            historical_widths: HISTORICAL_WIDTHS,
        }
    }
}

/// Course feed: the upstream system's course export (read-only input)
pub mod course_feed {
    use super::RecordSchema;

    pub const CODE: usize = 0;
    pub const TITLE: usize = 1;
    pub const PROVIDER_NAME: usize = 2;
    pub const DESCRIPTION: usize = 3;
    pub const HOURS: usize = 4;
    pub const LEVEL: usize = 5;
    pub const URL: usize = 6;

    pub const COLUMNS: &[&str] = &[
        "code",
        "title",
        "provider_name",
        "description",
        "hours",
        "level",
        "url",
    ];

    pub fn schema() -> RecordSchema {
        RecordSchema {
            name: "course_feed",
            columns: COLUMNS,
            historical_widths: &[],
        }
    }
}

/// Offering catalog: scheduled class offerings with attendance counters
pub mod offering {
    use super::RecordSchema;

    pub const GUID: usize = 0;
    pub const CODE: usize = 1;
    pub const COURSE_GUID: usize = 2;
    pub const START_DATE: usize = 3;
    pub const SEATS: usize = 4;
    pub const ENROLLED: usize = 5;
    pub const UPDATED: usize = 6;
    // Appended by the waitlist migration
    pub const WAITLISTED: usize = 7;

    pub const COLUMNS: &[&str] = &[
        "guid",
        "code",
        "course_guid",
        "start_date",
        "seats",
        "enrolled",
        "updated",
        "waitlisted",
    ];

    // Rows written before the waitlisted column was added
    pub const HISTORICAL_WIDTHS: &[usize] = &[7];

    pub fn schema() -> RecordSchema {
        RecordSchema {
            name: "offerings",
            columns: COLUMNS,
            historical_widths: HISTORICAL_WIDTHS,
        }
    }
}

/// Enrollment feed: the upstream attendance export (read-only input)
pub mod enrollment_feed {
    use super::RecordSchema;

    pub const CODE: usize = 0;
    pub const ENROLLED: usize = 1;
    pub const WAITLISTED: usize = 2;
    pub const SEATS: usize = 3;

    pub const COLUMNS: &[&str] = &["code", "enrolled", "waitlisted", "seats"];

    pub fn schema() -> RecordSchema {
        RecordSchema {
            name: "enrollment_feed",
            columns: COLUMNS,
            historical_widths: &[],
        }
    }
}

/// Partner table: maps partner organization names to internal identifiers
pub mod partner {
    use super::RecordSchema;

    pub const ID: usize = 0;
    pub const NAME: usize = 1;
    pub const CONTACT: usize = 2;

    pub const COLUMNS: &[&str] = &["id", "name", "contact"];

    pub fn schema() -> RecordSchema {
        RecordSchema {
            name: "partners",
            columns: COLUMNS,
            historical_widths: &[],
        }
    }
}
