//! Course-catalog reconciliation run
//!
//! Control flow: load feed -> load catalog -> build indexes -> per feed
//! record match/merge/create/withhold -> sweep records absent from the feed
//! -> persist atomically -> write change-log files -> notify. File-level
//! failures abort before any mutation; per-record conditions are logged and
//! recovered. The engine assumes a single run at a time against one root
//! folder; nothing here takes locks.

use std::path::Path;

use coursedir_common::changelog::{ChangeLogWriter, RunSummary};
use coursedir_common::config::CatalogPaths;
use coursedir_common::model::is_yes;
use coursedir_common::schema::{course, course_feed, partner};
use coursedir_common::{ids, store, time, Record, Result};
use tracing::{debug, info, warn};

use crate::index::{key_index, name_index};
use crate::lifecycle::{apply_state, next_state, LifecycleFlags, LifecycleState};
use crate::matcher::{match_course, Match};
use crate::merge::{course_from_feed, merge_course, PartnerDirectory};
use crate::notify::Notifier;

/// Reconcile the course catalog against an upstream export file
///
/// Feed order drives matching; the persisted catalog preserves the original
/// internal ordering with newly created records appended at the end.
pub fn run_course_sync(
    paths: &CatalogPaths,
    feed_path: &Path,
    notifier: &dyn Notifier,
) -> Result<RunSummary> {
    let today = time::today();
    let now = time::timestamp();

    info!(
        feed = %feed_path.display(),
        catalog = %paths.courses().display(),
        "starting course reconciliation"
    );

    let feed = store::load(feed_path, &course_feed::schema())?;
    let catalog = store::load(&paths.courses(), &course::schema())?;
    let partners = load_partners(paths);

    let mut summary = RunSummary::new("courses");
    summary.malformed_rows = catalog.malformed;

    let mut working = catalog.records;
    let keys = key_index(&working, course::CODE);
    let names = name_index(&working, course::TITLE);

    let mut present = vec![false; working.len()];
    let mut withheld = vec![false; working.len()];
    let mut created: Vec<Record> = Vec::new();

    for feed_record in feed.records.iter().filter(|r| !r.is_malformed()) {
        let code = feed_record.get(course_feed::CODE).trim();
        if code.is_empty() {
            warn!(
                title = feed_record.get(course_feed::TITLE).trim(),
                "feed row without a natural key skipped"
            );
            continue;
        }

        match match_course(feed_record, &keys, &names, &working) {
            Match::Exact(position) => {
                present[position] = true;
                let outcome = merge_course(&mut working[position], feed_record, &partners, &now);
                summary.unresolved_fields += outcome.unresolved;
                if outcome.changed {
                    summary.updated += 1;
                    summary.changes.extend(outcome.entries);
                }
            }
            Match::Duplicate {
                position,
                candidate,
            } => {
                // The colliding internal record is plausibly the same
                // entity, so it is shielded from the absence sweep but
                // receives no merge until resolved manually.
                withheld[position] = true;
                summary.duplicates.push(candidate);
            }
            Match::None => {
                let (record, unresolved) =
                    course_from_feed(feed_record, &partners, ids::generate(), &now);
                summary.unresolved_fields += unresolved;
                summary.changes.push(
                    coursedir_common::changelog::ChangeLogEntry::new(
                        record.get(course::CODE),
                        record.get(course::TITLE),
                        "created from feed",
                    ),
                );
                summary.created += 1;
                created.push(record);
            }
        }
    }

    // Sweep: lifecycle pass over the full working set. Expiration applies
    // to every record; feed-absence rules only to records that carry a
    // natural key (a locally originated record the upstream system does not
    // know yet is never auto-hidden).
    for (position, record) in working.iter_mut().enumerate() {
        if record.is_malformed() {
            continue;
        }
        let flags = LifecycleFlags::of(record);
        let has_key = !record.get(course::CODE).trim().is_empty();

        let state = if withheld[position] || !has_key {
            if flags.expired(today) {
                LifecycleState::Excluded
            } else {
                continue;
            }
        } else {
            next_state(&flags, present[position], today)
        };

        let was_visible = is_yes(record.get(course::INCLUDED));
        let entries = apply_state(record, state);
        if entries.is_empty() {
            continue;
        }
        if was_visible && !is_yes(record.get(course::INCLUDED)) {
            summary.hidden += 1;
        }
        record.set(course::UPDATED, now.as_str());
        summary.changes.extend(entries);
    }

    working.extend(created);
    let backup = store::atomic_replace(&paths.courses(), &course::schema().header(), &working)?;
    debug!(backup = %backup.display(), "catalog committed");

    finish_run(paths, notifier, &summary);
    Ok(summary)
}

/// Hide records whose expiration date has passed
///
/// The scheduled counterpart of lifecycle rule 4: no feed, no matching,
/// just the hard cutoff. The catalog is rewritten only when something
/// actually expired.
pub fn run_expiration_sweep(paths: &CatalogPaths, notifier: &dyn Notifier) -> Result<RunSummary> {
    let today = time::today();
    let now = time::timestamp();

    let catalog = store::load(&paths.courses(), &course::schema())?;
    let mut summary = RunSummary::new("courses");
    summary.malformed_rows = catalog.malformed;

    let mut working = catalog.records;
    for record in working.iter_mut().filter(|r| !r.is_malformed()) {
        let flags = LifecycleFlags::of(record);
        if !flags.expired(today) {
            continue;
        }
        let was_visible = is_yes(record.get(course::INCLUDED));
        let entries = apply_state(record, LifecycleState::Excluded);
        if entries.is_empty() {
            continue;
        }
        if was_visible {
            summary.hidden += 1;
        }
        record.set(course::UPDATED, now.as_str());
        summary.changes.extend(entries);
    }

    if summary.changes.is_empty() {
        info!("expiration sweep: nothing expired");
        return Ok(summary);
    }

    store::atomic_replace(&paths.courses(), &course::schema().header(), &working)?;
    finish_run(paths, notifier, &summary);
    Ok(summary)
}

/// Post-commit bookkeeping: change-log files and notification
///
/// The catalog is already persisted, so every failure in here is a warning,
/// never an abort.
fn finish_run(paths: &CatalogPaths, notifier: &dyn Notifier, summary: &RunSummary) {
    if summary.has_changes() {
        let writer = ChangeLogWriter::new(paths.log_dir());
        if let Err(e) = writer.append(summary) {
            warn!(error = %e, "change-log files not written");
        }
    }
    if let Err(e) = notifier.notify(summary) {
        warn!(error = %e, "notifier failed after commit");
    }
    info!(
        updated = summary.updated,
        created = summary.created,
        hidden = summary.hidden,
        duplicates = summary.duplicates.len(),
        unresolved_fields = summary.unresolved_fields,
        "run complete"
    );
}

fn load_partners(paths: &CatalogPaths) -> PartnerDirectory {
    match store::load(&paths.partners(), &partner::schema()) {
        Ok(file) => PartnerDirectory::from_records(&file.records),
        Err(e) => {
            warn!(error = %e, "partner table unavailable; provider translation disabled");
            PartnerDirectory::empty()
        }
    }
}
