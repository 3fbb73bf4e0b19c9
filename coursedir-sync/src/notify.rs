//! Notifier seam
//!
//! Email composition and delivery live outside this engine; the contract is
//! the completed run summary. Notification is best-effort and runs strictly
//! after the catalog has been persisted, so a failing notifier can never
//! roll back or block a committed run.

use coursedir_common::changelog::RunSummary;
use coursedir_common::Result;
use tracing::{info, warn};

/// Receives the completed run summary after persistence
pub trait Notifier {
    fn notify(&self, summary: &RunSummary) -> Result<()>;
}

/// Default notifier: reports the summary through tracing
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, summary: &RunSummary) -> Result<()> {
        info!(
            catalog = %summary.catalog,
            updated = summary.updated,
            created = summary.created,
            hidden = summary.hidden,
            unmatched = summary.unmatched,
            duplicates = summary.duplicates.len(),
            changes = summary.changes.len(),
            "reconciliation summary"
        );
        for entry in &summary.changes {
            info!(code = %entry.code, title = %entry.title, "{}", entry.description);
        }
        for dup in &summary.duplicates {
            warn!(
                feed_code = %dup.feed_code,
                feed_title = %dup.feed_title,
                catalog_code = %dup.catalog_code,
                catalog_guid = %dup.catalog_guid,
                "duplicate candidate withheld from creation; manual resolution required"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_notifier_accepts_empty_summary() {
        let summary = RunSummary::new("courses");
        assert!(LogNotifier.notify(&summary).is_ok());
    }
}
