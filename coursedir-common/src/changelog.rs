//! Change log, duplicate candidates and run summaries
//!
//! A reconciliation run accumulates an append-only change log plus a list of
//! duplicate candidates withheld from auto-merge. The assembled `RunSummary`
//! is the notifier contract input and is also written to the change-log
//! files after the catalog has been committed.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::time;

/// One human-readable change description for one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    /// Natural key of the changed record (may be empty for local records)
    pub code: String,
    /// Display name of the changed record
    pub title: String,
    /// Old-to-new description of the change
    pub description: String,
}

impl ChangeLogEntry {
    pub fn new(
        code: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            title: title.into(),
            description: description.into(),
        }
    }
}

/// An external record withheld from creation due to a display-name collision
///
/// Never auto-merged; surfaced for manual resolution and excluded from both
/// the updated and created sets for the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateCandidate {
    pub feed_code: String,
    pub feed_title: String,
    pub catalog_guid: String,
    pub catalog_code: String,
    pub catalog_title: String,
}

/// Completion summary for one reconciliation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Record kind the run operated on
    pub catalog: String,
    /// Records with at least one merged field change
    pub updated: usize,
    /// Records created from unmatched feed rows
    pub created: usize,
    /// Records whose visibility flag flipped to hidden
    pub hidden: usize,
    /// Feed rows with no catalog match (enrollment sync only; no creation path)
    pub unmatched: usize,
    /// Field merges skipped because a translation lookup failed
    pub unresolved_fields: usize,
    /// Catalog rows preserved verbatim due to unrecognized shape
    pub malformed_rows: usize,
    pub duplicates: Vec<DuplicateCandidate>,
    pub changes: Vec<ChangeLogEntry>,
}

impl RunSummary {
    pub fn new(catalog: impl Into<String>) -> Self {
        Self {
            catalog: catalog.into(),
            ..Self::default()
        }
    }

    /// Whether the run changed anything worth reporting
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty() || !self.duplicates.is_empty()
    }
}

/// Writes run results to the persistent and per-run change-log files
///
/// The persistent `sync.log` accumulates one line per change across runs;
/// each run additionally gets a rolling `sync-<stamp>.log` holding the full
/// summary as JSON. Both are written only after the catalog is committed,
/// so failures here are recoverable.
pub struct ChangeLogWriter {
    dir: PathBuf,
}

impl ChangeLogWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Append this run's entries to `sync.log` and write the rolling log
    pub fn append(&self, summary: &RunSummary) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let stamp = time::timestamp();

        let mut persistent = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join("sync.log"))?;
        for entry in &summary.changes {
            writeln!(
                persistent,
                "{} [{}] {} {}: {}",
                stamp, summary.catalog, entry.code, entry.title, entry.description
            )?;
        }
        for dup in &summary.duplicates {
            writeln!(
                persistent,
                "{} [{}] {} {}: duplicate candidate of {} ({})",
                stamp, summary.catalog, dup.feed_code, dup.feed_title, dup.catalog_code, dup.catalog_guid
            )?;
        }

        let rolling = self.rolling_path();
        let json = serde_json::to_string_pretty(summary)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(&rolling, json)?;

        debug!(
            dir = %self.dir.display(),
            changes = summary.changes.len(),
            duplicates = summary.duplicates.len(),
            "change log written"
        );
        Ok(())
    }

    fn rolling_path(&self) -> PathBuf {
        self.dir.join(format!("sync-{}.log", time::backup_stamp()))
    }
}
