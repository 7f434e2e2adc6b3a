//! Existing-user matching between two snapshots

use crate::reader::{Snapshot, StudentRecord};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// A student present in both snapshots
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingUserPair<'a> {
    /// Normalized join key
    pub email: String,
    pub previous: &'a StudentRecord,
    pub current: &'a StudentRecord,
}

/// Result of joining two snapshots on the normalized email
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOutcome<'a> {
    /// Pairs in ascending email order
    pub pairs: Vec<ExistingUserPair<'a>>,
    pub previous_unique: usize,
    pub current_unique: usize,
    /// Rows ignored because an earlier row had the same email
    pub previous_duplicates: usize,
    pub current_duplicates: usize,
}

impl MatchOutcome<'_> {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// First record per normalized email, plus the number of duplicate rows skipped
fn index_by_email(records: &[StudentRecord]) -> (BTreeMap<String, &StudentRecord>, usize) {
    let mut index = BTreeMap::new();
    let mut duplicates = 0;
    for record in records {
        let Some(key) = record.email_key() else {
            continue;
        };
        if index.contains_key(&key) {
            debug!(email = %key, row = record.row, "duplicate email ignored");
            duplicates += 1;
        } else {
            index.insert(key, record);
        }
    }
    (index, duplicates)
}

/// Join two snapshots on the trimmed, case-insensitive email.
///
/// Only emails present on both sides produce a pair. Blank emails never
/// match and the first occurrence wins on duplicates.
pub fn match_existing_users<'a>(
    previous: &'a Snapshot,
    current: &'a Snapshot,
) -> MatchOutcome<'a> {
    let (previous_index, previous_duplicates) = index_by_email(&previous.records);
    let (mut current_index, current_duplicates) = index_by_email(&current.records);
    let previous_unique = previous_index.len();
    let current_unique = current_index.len();

    let pairs: Vec<ExistingUserPair<'a>> = previous_index
        .into_iter()
        .filter_map(|(email, previous_record)| {
            current_index
                .remove(&email)
                .map(|current_record| ExistingUserPair {
                    email,
                    previous: previous_record,
                    current: current_record,
                })
        })
        .collect();

    info!(
        previous = previous_unique,
        current = current_unique,
        existing = pairs.len(),
        "matched existing users"
    );

    MatchOutcome {
        pairs,
        previous_unique,
        current_unique,
        previous_duplicates,
        current_duplicates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record(row: u32, email: &str, sessions: f64) -> StudentRecord {
        StudentRecord {
            row,
            email: Some(email.to_string()),
            sessions: Some(sessions),
            ..Default::default()
        }
    }

    fn snapshot(name: &str, records: Vec<StudentRecord>) -> Snapshot {
        Snapshot {
            sheet_name: name.to_string(),
            records,
            columns: BTreeMap::new(),
            data_rows: None,
            malformed_values: 0,
        }
    }

    #[test]
    fn test_case_insensitive_join() {
        let july = snapshot("July", vec![record(1, "a@x.com", 5.0)]);
        let august = snapshot("August", vec![record(1, " A@X.com ", 8.0)]);
        let outcome = match_existing_users(&july, &august);
        assert_eq!(outcome.len(), 1);
        assert_eq!(outcome.pairs[0].email, "a@x.com");
        assert_eq!(outcome.pairs[0].previous.sessions, Some(5.0));
        assert_eq!(outcome.pairs[0].current.sessions, Some(8.0));
    }

    #[test]
    fn test_intersection_only_and_sorted() {
        let july = snapshot(
            "July",
            vec![
                record(1, "c@x.com", 1.0),
                record(2, "a@x.com", 1.0),
                record(3, "only-july@x.com", 1.0),
            ],
        );
        let august = snapshot(
            "August",
            vec![
                record(1, "A@x.com", 2.0),
                record(2, "C@X.COM", 2.0),
                record(3, "new@x.com", 2.0),
                record(4, "other@x.com", 2.0),
            ],
        );
        let outcome = match_existing_users(&july, &august);
        let emails: Vec<_> = outcome.pairs.iter().map(|p| p.email.as_str()).collect();
        assert_eq!(emails, vec!["a@x.com", "c@x.com"]);
        assert_eq!(outcome.previous_unique, 3);
        assert_eq!(outcome.current_unique, 4);
        assert!(outcome.len() <= outcome.previous_unique.min(outcome.current_unique));
    }

    #[test]
    fn test_first_occurrence_wins() {
        let july = snapshot(
            "July",
            vec![record(1, "a@x.com", 5.0), record(2, "A@x.com", 50.0)],
        );
        let august = snapshot("August", vec![record(1, "a@x.com", 8.0)]);
        let outcome = match_existing_users(&july, &august);
        assert_eq!(outcome.len(), 1);
        assert_eq!(outcome.pairs[0].previous.row, 1);
        assert_eq!(outcome.previous_duplicates, 1);
        assert_eq!(outcome.current_duplicates, 0);
    }

    #[test]
    fn test_blank_emails_never_match() {
        let july = snapshot("July", vec![record(1, "  ", 5.0), record(2, "b@x.com", 1.0)]);
        let august = snapshot("August", vec![record(1, "", 8.0)]);
        let outcome = match_existing_users(&july, &august);
        assert!(outcome.is_empty());
        assert_eq!(outcome.previous_unique, 1);
        assert_eq!(outcome.current_unique, 0);
    }
}
