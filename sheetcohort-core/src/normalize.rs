//! Free-text normalization for categorical and multi-value fields
//!
//! Every function here is pure. Malformed input never fails: it lands in
//! the unrecognized or blank bucket, which stay distinct so that totals
//! can tell "nothing entered" apart from "entered but not understood".

use crate::reader::IndustryCatalog;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Label used for blank or missing input in every vocabulary
pub const BLANK_LABEL: &str = "(blank)";

/// Remove export artifacts (quotes and pipes) and surrounding whitespace
pub fn clean_text(raw: &str) -> String {
    raw.replace(['\'', '|'], "").trim().to_string()
}

/// Outcome of classifying one raw value against a vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Index into the vocabulary entries
    Known(usize),
    Unrecognized,
    Blank,
}

/// One canonical token and the patterns that select it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabEntry {
    pub label: String,
    /// Substrings of the cleaned text that select this entry
    #[serde(default)]
    pub contains: Vec<String>,
    /// Whole cleaned values that select this entry
    #[serde(default)]
    pub exact: Vec<String>,
}

impl VocabEntry {
    pub fn new(label: &str, contains: &[&str], exact: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            contains: contains.iter().map(|s| s.to_string()).collect(),
            exact: exact.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn matches(&self, cleaned: &str) -> bool {
        self.contains.iter().any(|pattern| cleaned.contains(pattern.as_str()))
            || self.exact.iter().any(|value| cleaned == value)
    }
}

/// A fixed, ordered set of canonical tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub entries: Vec<VocabEntry>,
    pub unrecognized_label: String,
}

impl Vocabulary {
    /// Faculties matched by substring containment
    pub fn faculties() -> Self {
        let names = [
            "Faculty of Engineering",
            "Faculty of Arts and Social Sciences",
            "University of Sydney Business School",
            "Faculty of Medicine and Health",
            "Sydney School of Architecture, Design and Planning",
            "Sydney Law School",
            "Sydney Conservatorium of Music",
        ];
        Self {
            entries: names
                .iter()
                .map(|name| VocabEntry::new(name, &[name], &[]))
                .collect(),
            unrecognized_label: "Other".to_string(),
        }
    }

    /// Year of study, by ordinal phrase or bare digit
    pub fn years() -> Self {
        let years = [
            ("1st Year", "1"),
            ("2nd Year", "2"),
            ("3rd Year", "3"),
            ("4th Year", "4"),
            ("5th Year", "5"),
        ];
        Self {
            entries: years
                .iter()
                .map(|(label, digit)| VocabEntry::new(label, &[label], &[digit]))
                .collect(),
            unrecognized_label: "Unknown".to_string(),
        }
    }

    /// Domestic/international status, by exact value
    pub fn international_status() -> Self {
        Self {
            entries: vec![
                VocabEntry::new("Domestic", &[], &["Domestic"]),
                VocabEntry::new("International", &[], &["International"]),
            ],
            unrecognized_label: "Other".to_string(),
        }
    }

    /// Classify a raw cell value; the first matching entry wins
    pub fn classify(&self, raw: Option<&str>) -> Bucket {
        let cleaned = match raw {
            Some(raw) => clean_text(raw),
            None => return Bucket::Blank,
        };
        if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("nan") {
            return Bucket::Blank;
        }
        self.entries
            .iter()
            .position(|entry| entry.matches(&cleaned))
            .map(Bucket::Known)
            .unwrap_or(Bucket::Unrecognized)
    }

    /// Canonical label of a bucket
    pub fn label(&self, bucket: Bucket) -> &str {
        match bucket {
            Bucket::Known(i) => self
                .entries
                .get(i)
                .map(|e| e.label.as_str())
                .unwrap_or(self.unrecognized_label.as_str()),
            Bucket::Unrecognized => &self.unrecognized_label,
            Bucket::Blank => BLANK_LABEL,
        }
    }

    /// Classify and return the canonical label
    pub fn canonical(&self, raw: Option<&str>) -> &str {
        self.label(self.classify(raw))
    }

    /// Declared labels in order
    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.label.clone()).collect()
    }

    /// Declared labels followed by the unrecognized and blank buckets
    pub fn all_labels(&self) -> Vec<String> {
        let mut labels = self.labels();
        labels.push(self.unrecognized_label.clone());
        labels.push(BLANK_LABEL.to_string());
        labels
    }
}

/// Split a pipe- or comma-delimited field into trimmed, non-empty tokens
pub fn split_multi(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(['|', ','])
            .map(|token| token.replace('\'', "").trim().to_string())
            .filter(|token| !token.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

/// Every integer substring of a field, in order of appearance
pub fn parse_codes(raw: Option<&str>) -> Vec<u32> {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    let Some(raw) = raw else {
        return Vec::new();
    };
    let re = DIGITS.get_or_init(|| Regex::new(r"\d+").unwrap());
    re.find_iter(raw)
        .filter_map(|m| m.as_str().parse::<u32>().ok())
        .collect()
}

/// Industry names for the codes of a field that exist in the catalog
pub fn resolve_industries<'a>(raw: Option<&str>, catalog: &'a IndustryCatalog) -> Vec<&'a str> {
    parse_codes(raw)
        .into_iter()
        .filter_map(|code| catalog.name(code))
        .collect()
}
