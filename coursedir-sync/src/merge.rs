//! Field-level merge policy and diff engine
//!
//! For a matched (catalog, feed) pair, each external-authoritative field is
//! normalized on both sides and compared; only actual differences overwrite
//! the catalog value and emit a change-log entry, so an unchanged feed
//! merges to zero entries. Fields outside the policy table (flags, notes,
//! owner) are never touched, which is how locally-owned edits survive
//! repeated syncs.

use std::collections::HashMap;

use coursedir_common::changelog::ChangeLogEntry;
use coursedir_common::schema::{course, course_feed, partner};
use coursedir_common::{Error, Record};
use tracing::{debug, warn};

use crate::index::normalize_name;

/// External-authoritative course fields: (feed column, catalog column, label)
pub const COURSE_FIELD_POLICY: &[(usize, usize, &str)] = &[
    (course_feed::TITLE, course::TITLE, "title"),
    (course_feed::DESCRIPTION, course::DESCRIPTION, "description"),
    (course_feed::HOURS, course::HOURS, "hours"),
    (course_feed::LEVEL, course::LEVEL, "level"),
    (course_feed::URL, course::URL, "url"),
];

/// Decode the entity set the upstream export emits
///
/// `&amp;` is decoded last so a double-encoded `&amp;lt;` collapses exactly
/// one level.
pub fn decode_entities(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Storage-normal form: entity decode, trim, collapse whitespace runs
pub fn normalize_value(value: &str) -> String {
    decode_entities(value)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Translates upstream partner names into internal partner identifiers
#[derive(Debug, Default)]
pub struct PartnerDirectory {
    by_name: HashMap<String, String>,
}

impl PartnerDirectory {
    /// Empty directory: every lookup misses and the provider field is
    /// skipped rather than overwritten
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from the partner table; lookup key is the normalized name
    pub fn from_records(records: &[Record]) -> Self {
        let mut by_name = HashMap::new();
        for record in records {
            if record.is_malformed() {
                continue;
            }
            let name = normalize_name(record.get(partner::NAME));
            let id = record.get(partner::ID).trim();
            if name.is_empty() || id.is_empty() {
                continue;
            }
            by_name.entry(name).or_insert_with(|| id.to_string());
        }
        debug!(partners = by_name.len(), "partner directory built");
        Self { by_name }
    }

    /// Resolve a free-text partner name to an internal identifier
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.by_name.get(&normalize_name(name)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Result of merging one feed record into one catalog record
#[derive(Debug, Default)]
pub struct MergeOutcome {
    /// Whether any field was overwritten
    pub changed: bool,
    /// One entry per changed field
    pub entries: Vec<ChangeLogEntry>,
    /// Provider translations that failed and were skipped
    pub unresolved: usize,
}

/// Merge external-authoritative fields from `feed` into `internal`
///
/// The provider field goes through the partner-name translation; a failed
/// lookup skips the field and keeps the prior value so unresolvable free
/// text never lands in an identifier column. A merge that changes anything
/// refreshes the modification timestamp.
pub fn merge_course(
    internal: &mut Record,
    feed: &Record,
    partners: &PartnerDirectory,
    now: &str,
) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();
    let mut diffs: Vec<(usize, &str, String, String)> = Vec::new();

    for (feed_idx, catalog_idx, label) in COURSE_FIELD_POLICY {
        let new = normalize_value(feed.get(*feed_idx));
        let old = internal.get(*catalog_idx).to_string();
        if normalize_value(&old) != new {
            diffs.push((*catalog_idx, *label, old, new));
        }
    }

    let feed_provider = feed.get(course_feed::PROVIDER_NAME).trim();
    if !feed_provider.is_empty() {
        match partners.resolve(feed_provider) {
            Some(id) => {
                let old = internal.get(course::PROVIDER).to_string();
                if old.trim() != id {
                    diffs.push((course::PROVIDER, "provider", old, id.to_string()));
                }
            }
            None => {
                let err = Error::AmbiguousMerge {
                    field: "provider",
                    value: feed_provider.to_string(),
                };
                warn!(
                    code = feed.get(course_feed::CODE).trim(),
                    %err,
                    "provider translation failed; keeping prior value"
                );
                outcome.unresolved += 1;
            }
        }
    }

    if diffs.is_empty() {
        return outcome;
    }

    for (catalog_idx, _, _, new) in &diffs {
        internal.set(*catalog_idx, new.clone());
    }
    internal.set(course::UPDATED, now);

    let code = internal.get(course::CODE).to_string();
    let title = internal.get(course::TITLE).to_string();
    outcome.entries = diffs
        .into_iter()
        .map(|(_, label, old, new)| {
            ChangeLogEntry::new(&code, &title, format!("{}: {:?} -> {:?}", label, old, new))
        })
        .collect();
    outcome.changed = true;
    outcome
}

/// Build a new catalog record from an unmatched feed row
///
/// Fresh surrogate key, feed values normalized through the same policy,
/// default flags (participates in sync, not persisted, visible).
pub fn course_from_feed(
    feed: &Record,
    partners: &PartnerDirectory,
    guid: String,
    now: &str,
) -> (Record, usize) {
    let mut fields = vec![String::new(); course::schema().width()];
    let mut unresolved = 0;

    fields[course::GUID] = guid;
    fields[course::CODE] = feed.get(course_feed::CODE).trim().to_string();
    for (feed_idx, catalog_idx, _) in COURSE_FIELD_POLICY {
        fields[*catalog_idx] = normalize_value(feed.get(*feed_idx));
    }

    let feed_provider = feed.get(course_feed::PROVIDER_NAME).trim();
    if !feed_provider.is_empty() {
        match partners.resolve(feed_provider) {
            Some(id) => fields[course::PROVIDER] = id.to_string(),
            None => {
                warn!(
                    code = fields[course::CODE].as_str(),
                    provider = feed_provider,
                    "provider translation failed on create; leaving empty"
                );
                unresolved += 1;
            }
        }
    }

    fields[course::SYNC] = "Yes".to_string();
    fields[course::PERSIST] = "No".to_string();
    fields[course::INCLUDED] = "Yes".to_string();
    fields[course::UPDATED] = now.to_string();

    (Record::new(fields), unresolved)
}
