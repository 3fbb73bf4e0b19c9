//! Enrollment-counter sync
//!
//! The reduced instance of the reconciliation pattern for scheduled
//! offerings: matching is by natural key only (offerings are never merged
//! by name), the diff covers the numeric attendance counters, there is no
//! creation path and no lifecycle machine. Feed rows with no catalog match
//! are counted and left alone.

use std::path::Path;

use coursedir_common::changelog::{ChangeLogEntry, ChangeLogWriter, RunSummary};
use coursedir_common::config::CatalogPaths;
use coursedir_common::schema::{enrollment_feed, offering};
use coursedir_common::{store, time, Result};
use tracing::{debug, info, warn};

use crate::index::key_index;
use crate::notify::Notifier;

/// External-authoritative counters: (feed column, catalog column, label)
pub const ENROLLMENT_FIELD_POLICY: &[(usize, usize, &str)] = &[
    (enrollment_feed::ENROLLED, offering::ENROLLED, "enrolled"),
    (enrollment_feed::WAITLISTED, offering::WAITLISTED, "waitlisted"),
    (enrollment_feed::SEATS, offering::SEATS, "seats"),
];

/// Sync offering attendance counters from the upstream attendance export
pub fn run_enrollment_sync(
    paths: &CatalogPaths,
    feed_path: &Path,
    notifier: &dyn Notifier,
) -> Result<RunSummary> {
    let now = time::timestamp();

    info!(
        feed = %feed_path.display(),
        catalog = %paths.offerings().display(),
        "starting enrollment sync"
    );

    let feed = store::load(feed_path, &enrollment_feed::schema())?;
    let catalog = store::load(&paths.offerings(), &offering::schema())?;

    let mut summary = RunSummary::new("offerings");
    summary.malformed_rows = catalog.malformed;

    let mut working = catalog.records;
    let keys = key_index(&working, offering::CODE);

    for feed_record in feed.records.iter().filter(|r| !r.is_malformed()) {
        let code = feed_record.get(enrollment_feed::CODE).trim();
        if code.is_empty() {
            continue;
        }
        let Some(&position) = keys.get(code) else {
            debug!(code, "no offering for feed row; left untouched");
            summary.unmatched += 1;
            continue;
        };

        let record = &mut working[position];
        let mut entries = Vec::new();
        for (feed_idx, catalog_idx, label) in ENROLLMENT_FIELD_POLICY {
            let new = feed_record.get(*feed_idx).trim();
            let Ok(new_value) = new.parse::<i64>() else {
                warn!(code, field = label, value = new, "non-numeric feed value skipped");
                continue;
            };
            let old = record.get(*catalog_idx).trim().to_string();
            let differs = match old.parse::<i64>() {
                Ok(old_value) => old_value != new_value,
                Err(_) => true,
            };
            if differs {
                record.set(*catalog_idx, new_value.to_string());
                entries.push(ChangeLogEntry::new(
                    code,
                    record.get(offering::COURSE_GUID),
                    format!("{}: {:?} -> {:?}", label, old, new_value.to_string()),
                ));
            }
        }

        if !entries.is_empty() {
            record.set(offering::UPDATED, now.as_str());
            summary.updated += 1;
            summary.changes.extend(entries);
        }
    }

    store::atomic_replace(&paths.offerings(), &offering::schema().header(), &working)?;

    if summary.has_changes() {
        let writer = ChangeLogWriter::new(paths.log_dir());
        if let Err(e) = writer.append(&summary) {
            warn!(error = %e, "change-log files not written");
        }
    }
    if let Err(e) = notifier.notify(&summary) {
        warn!(error = %e, "notifier failed after commit");
    }
    info!(
        updated = summary.updated,
        unmatched = summary.unmatched,
        "enrollment sync complete"
    );
    Ok(summary)
}
