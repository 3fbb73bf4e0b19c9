//! Key and name indexes over a loaded catalog
//!
//! Both indexes are rebuilt from scratch once per run; nothing mutates them
//! incrementally. Malformed rows are never index targets.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use coursedir_common::Record;
use tracing::warn;

use crate::merge::normalize_value;

/// Map natural keys to record positions
///
/// Keys are trimmed and compared case-sensitively. Empty keys are excluded:
/// a record without a natural key cannot be the target of a key match. On a
/// duplicate key the first position wins (primary keys are unique by
/// catalog invariant, so a collision is data worth warning about).
pub fn key_index(records: &[Record], field: usize) -> HashMap<String, usize> {
    let mut index = HashMap::new();
    for (pos, record) in records.iter().enumerate() {
        if record.is_malformed() {
            continue;
        }
        let key = record.get(field).trim();
        if key.is_empty() {
            continue;
        }
        match index.entry(key.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(pos);
            }
            Entry::Occupied(existing) => {
                warn!(
                    key,
                    first = existing.get(),
                    duplicate = pos,
                    "duplicate natural key in catalog; keeping first"
                );
            }
        }
    }
    index
}

/// Duplicate-detection normal form for display names: entity decode, trim,
/// collapse whitespace, lowercase
pub fn normalize_name(name: &str) -> String {
    normalize_value(name).to_lowercase()
}

/// Map normalized display names to record positions
///
/// First occupant wins; later rows with the same normalized name cannot be
/// duplicate-match targets and are warned once at build time.
pub fn name_index(records: &[Record], field: usize) -> HashMap<String, usize> {
    let mut index = HashMap::new();
    for (pos, record) in records.iter().enumerate() {
        if record.is_malformed() {
            continue;
        }
        let name = normalize_name(record.get(field));
        if name.is_empty() {
            continue;
        }
        match index.entry(name) {
            Entry::Vacant(slot) => {
                slot.insert(pos);
            }
            Entry::Occupied(existing) => {
                warn!(
                    name = %existing.key(),
                    first = existing.get(),
                    shadowed = pos,
                    "display-name collision inside catalog; later row unreachable as duplicate target"
                );
            }
        }
    }
    index
}
