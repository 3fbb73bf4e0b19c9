//! Common error types for coursedir

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for coursedir operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the coursedir tools
///
/// The first three variants are fatal to a reconciliation run and are only
/// raised while the catalog is still in its pre-run state. `MalformedRecord`
/// and `AmbiguousMerge` are per-record conditions: the caller logs them and
/// continues.
#[derive(Error, Debug)]
pub enum Error {
    /// Feed or catalog file missing or unreadable; the run aborts before
    /// any mutation
    #[error("Source unreadable: {path}: {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Row field count matches no tolerated schema width
    #[error("Malformed record at line {line}: expected {expected} fields, found {found}")]
    MalformedRecord {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// Pre-write backup copy failed; the run aborts before any mutation
    #[error("Backup failed: {path}: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Temp-file write or rename failed after the backup was taken; the
    /// original file is untouched and the backup is the recovery path
    #[error("Atomic replace failed: {path}: {source}")]
    AtomicReplace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A field-translation lookup failed; the field keeps its prior value
    #[error("Ambiguous merge for {field}: unresolvable value {value:?}")]
    AmbiguousMerge { field: &'static str, value: String },

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
