//! Categorical tallies with percentages of the total

use super::stats::{percentage, round2};
use crate::normalize::Vocabulary;
use serde::{Deserialize, Serialize};

/// Label of the catch-all bucket for values outside the declared buckets
pub const OTHER_LABEL: &str = "Other";

/// A numeric range with an inclusive `max`; `max = None` is open-ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeBucket {
    pub label: String,
    pub min: f64,
    #[serde(default)]
    pub max: Option<f64>,
}

impl RangeBucket {
    pub fn new(label: &str, min: f64, max: Option<f64>) -> Self {
        Self {
            label: label.to_string(),
            min,
            max,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && self.max.is_none_or(|max| value <= max)
    }
}

/// Bucket for `value`: the first containing bucket, else the bucket whose
/// span reaches up to the next bucket's `min` (so `0-2` takes 2.5 when the
/// next bucket starts at 3)
fn range_index(buckets: &[RangeBucket], value: f64) -> Option<usize> {
    buckets.iter().position(|b| b.contains(value)).or_else(|| {
        buckets
            .windows(2)
            .position(|pair| value >= pair[0].min && value < pair[1].min)
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketCount {
    pub label: String,
    pub count: usize,
}

/// Bucket counts that always sum to `total`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown {
    pub title: String,
    pub buckets: Vec<BucketCount>,
    pub total: usize,
}

impl Breakdown {
    fn with_labels<I>(title: &str, labels: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            title: title.to_string(),
            buckets: labels
                .into_iter()
                .map(|label| BucketCount { label, count: 0 })
                .collect(),
            total: 0,
        }
    }

    fn add(&mut self, index: Option<usize>) {
        match index {
            Some(i) => self.buckets[i].count += 1,
            None => match self.buckets.iter_mut().find(|b| b.label == OTHER_LABEL) {
                Some(other) => other.count += 1,
                None => self.buckets.push(BucketCount {
                    label: OTHER_LABEL.to_string(),
                    count: 1,
                }),
            },
        }
        self.total += 1;
    }

    /// Count values equal to each declared level.
    ///
    /// Values that match no level land in "Other"; missing values are not
    /// part of the total.
    pub fn exact_values<I>(title: &str, levels: &[u32], values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let mut breakdown = Self::with_labels(title, levels.iter().map(|l| l.to_string()));
        for value in values.into_iter().flatten() {
            breakdown.add(levels.iter().position(|&l| f64::from(l) == value));
        }
        breakdown
    }

    /// Count values per range bucket.
    ///
    /// The first containing bucket wins. A value between one bucket's `max`
    /// and the next bucket's `min` counts toward the lower bucket, so
    /// fractional ratios never fall through integer-labelled ranges.
    pub fn ranges<I>(title: &str, buckets: &[RangeBucket], values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let mut breakdown = Self::with_labels(title, buckets.iter().map(|b| b.label.clone()));
        for value in values.into_iter().flatten() {
            breakdown.add(range_index(buckets, value));
        }
        breakdown
    }

    /// Count raw values by their canonical vocabulary label.
    ///
    /// Every declared label appears; the unrecognized and blank buckets
    /// appear only when non-empty.
    pub fn categories<'a, I>(title: &str, vocabulary: &Vocabulary, values: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut breakdown = Self::with_labels(title, vocabulary.all_labels());
        for raw in values {
            let label = vocabulary.canonical(raw);
            let index = breakdown.buckets.iter().position(|b| b.label == label);
            breakdown.add(index);
        }
        let declared = vocabulary.entries.len();
        let mut position = 0;
        breakdown.buckets.retain(|b| {
            let keep = position < declared || b.count > 0;
            position += 1;
            keep
        });
        breakdown
    }

    pub fn count(&self, label: &str) -> Option<usize> {
        self.buckets.iter().find(|b| b.label == label).map(|b| b.count)
    }

    /// Percentage of the total, rounded for reporting
    pub fn percent(&self, bucket: &BucketCount) -> f64 {
        round2(percentage(bucket.count as f64, self.total as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::BLANK_LABEL;

    fn repeat(value: f64, times: usize) -> impl Iterator<Item = Option<f64>> {
        std::iter::repeat_n(Some(value), times)
    }

    #[test]
    fn test_vwe_levels_scenario() {
        let values = repeat(1.0, 103)
            .chain(repeat(2.0, 66))
            .chain(repeat(3.0, 19))
            .chain(repeat(4.0, 4));
        let breakdown = Breakdown::exact_values("VWE", &[1, 2, 3, 4], values);
        assert_eq!(breakdown.total, 192);
        let percents: Vec<f64> = breakdown.buckets.iter().map(|b| breakdown.percent(b)).collect();
        assert_eq!(percents, vec![53.65, 34.38, 9.9, 2.08]);
        let sum: f64 = percents.iter().sum();
        assert!((sum - 100.0).abs() < 0.05);
        assert_eq!(breakdown.count(OTHER_LABEL), None);
    }

    #[test]
    fn test_declared_levels_appear_with_zero() {
        let breakdown =
            Breakdown::exact_values("VWE", &[1, 2, 3, 4], [Some(1.0), Some(7.0), None]);
        assert_eq!(breakdown.count("2"), Some(0));
        assert_eq!(breakdown.count(OTHER_LABEL), Some(1));
        assert_eq!(breakdown.total, 2);
        let sum: usize = breakdown.buckets.iter().map(|b| b.count).sum();
        assert_eq!(sum, breakdown.total);
    }

    #[test]
    fn test_ranges() {
        let buckets = [
            RangeBucket::new("1-3", 1.0, Some(3.0)),
            RangeBucket::new("4-6", 4.0, Some(6.0)),
            RangeBucket::new("7+", 7.0, None),
        ];
        let values = [Some(1.0), Some(3.0), Some(5.0), Some(40.0), Some(0.0)];
        let breakdown = Breakdown::ranges("Industries", &buckets, values);
        assert_eq!(breakdown.count("1-3"), Some(2));
        assert_eq!(breakdown.count("4-6"), Some(1));
        assert_eq!(breakdown.count("7+"), Some(1));
        assert_eq!(breakdown.count(OTHER_LABEL), Some(1));
        assert_eq!(breakdown.total, 5);
    }

    #[test]
    fn test_fractional_ratios_fill_range_gaps() {
        let buckets = crate::config::SummaryConfig::default().engagement_ranges;
        let values = [Some(2.5), Some(0.5), Some(5.5), Some(3.0), Some(6.2)];
        let breakdown = Breakdown::ranges("Engagement", &buckets, values);
        assert_eq!(breakdown.count("0-2 Modules"), Some(2));
        assert_eq!(breakdown.count("3-5 Modules"), Some(2));
        assert_eq!(breakdown.count("6+ Modules"), Some(1));
        assert_eq!(breakdown.count(OTHER_LABEL), None);
        assert_eq!(breakdown.total, 5);
    }

    #[test]
    fn test_values_past_a_bounded_last_range_are_other() {
        let buckets = [
            RangeBucket::new("1-3", 1.0, Some(3.0)),
            RangeBucket::new("4-6", 4.0, Some(6.0)),
        ];
        let breakdown = Breakdown::ranges("Industries", &buckets, [Some(6.5), Some(0.5)]);
        assert_eq!(breakdown.count(OTHER_LABEL), Some(2));
    }

    #[test]
    fn test_categories_keep_blank_and_unrecognized_apart() {
        let vocabulary = Vocabulary::years();
        let values = [Some("1"), Some("|2nd Year|"), Some("Masters"), None, Some("")];
        let breakdown = Breakdown::categories("Year", &vocabulary, values);
        assert_eq!(breakdown.count("1st Year"), Some(1));
        assert_eq!(breakdown.count("5th Year"), Some(0));
        assert_eq!(breakdown.count("Unknown"), Some(1));
        assert_eq!(breakdown.count(BLANK_LABEL), Some(2));
        assert_eq!(breakdown.total, 5);
    }

    #[test]
    fn test_categories_hide_empty_catch_all_buckets() {
        let vocabulary = Vocabulary::international_status();
        let breakdown = Breakdown::categories("Status", &vocabulary, [Some("Domestic")]);
        let labels: Vec<&str> = breakdown.buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Domestic", "International"]);
    }
}
