//! Feed-to-catalog matching
//!
//! Exact match is by natural key. On a key miss the normalized display name
//! is tried; a name hit is a probable duplicate (two systems assigning
//! different keys to the same entity) and is withheld from both merge and
//! creation rather than silently inserted.

use std::collections::HashMap;

use coursedir_common::changelog::DuplicateCandidate;
use coursedir_common::schema::{course, course_feed};
use coursedir_common::Record;

use crate::index::normalize_name;

/// Outcome of matching one feed record against the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Match {
    /// Natural key found; position of the catalog record
    Exact(usize),
    /// No key match, but the display name collides with an existing record;
    /// withheld from merge and creation, surfaced for manual resolution
    Duplicate {
        position: usize,
        candidate: DuplicateCandidate,
    },
    /// Neither lookup succeeded; the caller creates a new record
    None,
}

/// Classify a feed record against the catalog indexes
pub fn match_course(
    feed: &Record,
    keys: &HashMap<String, usize>,
    names: &HashMap<String, usize>,
    catalog: &[Record],
) -> Match {
    let code = feed.get(course_feed::CODE).trim();
    if let Some(&position) = keys.get(code) {
        return Match::Exact(position);
    }

    let name = normalize_name(feed.get(course_feed::TITLE));
    if !name.is_empty() {
        if let Some(&position) = names.get(&name) {
            let hit = &catalog[position];
            return Match::Duplicate {
                position,
                candidate: DuplicateCandidate {
                    feed_code: code.to_string(),
                    feed_title: feed.get(course_feed::TITLE).trim().to_string(),
                    catalog_guid: hit.get(course::GUID).to_string(),
                    catalog_code: hit.get(course::CODE).to_string(),
                    catalog_title: hit.get(course::TITLE).to_string(),
                },
            };
        }
    }

    Match::None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{key_index, name_index};

    fn catalog() -> Vec<Record> {
        let mut a = vec![String::new(); course::schema().width()];
        a[course::GUID] = "g-1".to_string();
        a[course::CODE] = "ITEM-1".to_string();
        a[course::TITLE] = "Welding Basics".to_string();
        let mut b = vec![String::new(); course::schema().width()];
        b[course::GUID] = "g-2".to_string();
        b[course::CODE] = "ITEM-2".to_string();
        b[course::TITLE] = "Forklift Operation".to_string();
        vec![Record::new(a), Record::new(b)]
    }

    fn feed(code: &str, title: &str) -> Record {
        let mut fields = vec![String::new(); course_feed::schema().width()];
        fields[course_feed::CODE] = code.to_string();
        fields[course_feed::TITLE] = title.to_string();
        Record::new(fields)
    }

    #[test]
    fn test_exact_key_match() {
        let records = catalog();
        let keys = key_index(&records, course::CODE);
        let names = name_index(&records, course::TITLE);
        let result = match_course(&feed("ITEM-2", "Renamed Title"), &keys, &names, &records);
        assert_eq!(result, Match::Exact(1));
    }

    #[test]
    fn test_name_collision_is_duplicate_not_match() {
        let records = catalog();
        let keys = key_index(&records, course::CODE);
        let names = name_index(&records, course::TITLE);
        let result = match_course(&feed("ITEM-5", "welding  basics"), &keys, &names, &records);
        match result {
            Match::Duplicate { position, candidate } => {
                assert_eq!(position, 0);
                assert_eq!(candidate.feed_code, "ITEM-5");
                assert_eq!(candidate.catalog_guid, "g-1");
                assert_eq!(candidate.catalog_code, "ITEM-1");
            }
            other => panic!("expected duplicate, got {:?}", other),
        }
    }

    #[test]
    fn test_no_match_signals_creation() {
        let records = catalog();
        let keys = key_index(&records, course::CODE);
        let names = name_index(&records, course::TITLE);
        let result = match_course(&feed("ITEM-9", "Confined Spaces"), &keys, &names, &records);
        assert_eq!(result, Match::None);
    }

    #[test]
    fn test_key_match_wins_over_name_collision() {
        let records = catalog();
        let keys = key_index(&records, course::CODE);
        let names = name_index(&records, course::TITLE);
        // Key matches one record, name matches another; key wins
        let result = match_course(&feed("ITEM-1", "Forklift Operation"), &keys, &names, &records);
        assert_eq!(result, Match::Exact(0));
    }
}
