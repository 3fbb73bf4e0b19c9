//! Inclusion/lifecycle state machine
//!
//! A record's visibility is derived from feed presence plus two independent
//! override flags and an optional expiration date. The precedence is
//! load-bearing: expiration can hide a record even while the feed still
//! carries it, and the sync opt-out blocks automatic hiding even when the
//! feed has lost it. Exclusion is always reversible by feed presence except
//! when forced by expiration.

use chrono::NaiveDate;
use coursedir_common::changelog::ChangeLogEntry;
use coursedir_common::model::{is_no, is_yes, PersistState};
use coursedir_common::schema::course;
use coursedir_common::{time, Record};

/// Visibility states a record can land in after a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Visible, normal
    Included,
    /// Visible, persist flag set, feed currently has the record
    PersistedActive,
    /// Visible with substitute messaging, persist flag set, feed lost it
    PersistedInactive,
    /// Hidden
    Excluded,
}

/// Snapshot of the lifecycle flag fields of one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleFlags {
    /// Whether feed absence may hide the record at all; only an explicit
    /// "No" opts out
    pub sync_participation: bool,
    /// Whether the record stays visible with substitute messaging instead
    /// of being hidden; only an explicit "Yes" opts in
    pub persist: bool,
    /// Derived sub-flag: whether the feed currently has the record
    pub persist_state: PersistState,
    /// Current visibility flag
    pub included: bool,
    /// Optional hard cutoff independent of feed presence
    pub expires: Option<NaiveDate>,
}

impl LifecycleFlags {
    /// Read the flag fields out of a course record
    pub fn of(record: &Record) -> Self {
        Self {
            sync_participation: !is_no(record.get(course::SYNC)),
            persist: is_yes(record.get(course::PERSIST)),
            persist_state: PersistState::parse(record.get(course::PERSIST_STATE)),
            included: is_yes(record.get(course::INCLUDED)),
            expires: time::parse_expiration(record.get(course::EXPIRES)),
        }
    }

    /// State implied by the flags as currently stored
    pub fn current_state(&self) -> LifecycleState {
        if !self.included {
            return LifecycleState::Excluded;
        }
        if self.persist {
            return match self.persist_state {
                PersistState::Active => LifecycleState::PersistedActive,
                PersistState::Inactive => LifecycleState::PersistedInactive,
            };
        }
        LifecycleState::Included
    }

    /// Whether the expiration cutoff has passed relative to `today`
    ///
    /// A record expires at the end of its expiration day, so `expires ==
    /// today` is still visible.
    pub fn expired(&self, today: NaiveDate) -> bool {
        self.expires.map(|date| date < today).unwrap_or(false)
    }
}

/// Pure transition function: `(flags, feed presence, today) -> state`
///
/// Precedence:
/// 1. A past expiration date forces `Excluded` regardless of feed presence.
/// 2. Feed presence makes the record visible (persist records with the
///    sub-flag forced active).
/// 3. Sync opt-out leaves the stored state untouched.
/// 4. Feed absence demotes persist records to `PersistedInactive` (still
///    visible) and hides everything else.
pub fn next_state(flags: &LifecycleFlags, present_in_feed: bool, today: NaiveDate) -> LifecycleState {
    if flags.expired(today) {
        return LifecycleState::Excluded;
    }
    if present_in_feed {
        if flags.persist {
            return LifecycleState::PersistedActive;
        }
        return LifecycleState::Included;
    }
    if !flags.sync_participation {
        return flags.current_state();
    }
    if flags.persist {
        return LifecycleState::PersistedInactive;
    }
    LifecycleState::Excluded
}

/// Write `state` back into the record's flag fields
///
/// Emits one change-log entry per field whose stored value actually
/// changed, so re-applying the same state produces nothing. The persist
/// sub-flag is only maintained for persist records; rewriting it on others
/// would churn diffs on a meaningless field.
pub fn apply_state(record: &mut Record, state: LifecycleState) -> Vec<ChangeLogEntry> {
    let code = record.get(course::CODE).to_string();
    let title = record.get(course::TITLE).to_string();
    let mut entries = Vec::new();

    let target_visible = state != LifecycleState::Excluded;
    let old_included = record.get(course::INCLUDED).to_string();
    if is_yes(&old_included) != target_visible {
        let new_included = if target_visible { "Yes" } else { "No" };
        record.set(course::INCLUDED, new_included);
        entries.push(ChangeLogEntry::new(
            &code,
            &title,
            format!("included: {:?} -> {:?}", old_included, new_included),
        ));
    }

    let target_sub = match state {
        LifecycleState::PersistedActive => Some(PersistState::Active),
        LifecycleState::PersistedInactive => Some(PersistState::Inactive),
        _ => None,
    };
    if let Some(target) = target_sub {
        let old_sub = record.get(course::PERSIST_STATE).to_string();
        if PersistState::parse(&old_sub) != target {
            record.set(course::PERSIST_STATE, target.as_str());
            entries.push(ChangeLogEntry::new(
                &code,
                &title,
                format!("persist_state: {:?} -> {:?}", old_sub, target.as_str()),
            ));
        }
    }

    entries
}
