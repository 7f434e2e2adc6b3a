//! Descriptive statistics over optional numeric values

use serde::Serialize;

/// Round to two decimals for reporting
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Share of `part` in `total` as a percentage; 0 when the total is 0
pub fn percentage(part: f64, total: f64) -> f64 {
    if total == 0.0 { 0.0 } else { part / total * 100.0 }
}

/// Summary of a numeric column, computed over present values only
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Descriptive {
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

/// Describe the present, finite values; `None` when there are none.
///
/// Missing values are excluded from the denominator, never counted as zero.
pub fn describe<I>(values: I) -> Option<Descriptive>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut present: Vec<f64> = values
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .collect();
    if present.is_empty() {
        return None;
    }
    present.sort_by(|a, b| a.total_cmp(b));

    let count = present.len();
    let sum: f64 = present.iter().sum();
    let median = if count % 2 == 0 {
        (present[count / 2 - 1] + present[count / 2]) / 2.0
    } else {
        present[count / 2]
    };

    Some(Descriptive {
        count,
        sum,
        mean: sum / count as f64,
        median,
        min: present[0],
        max: present[count - 1],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_ignores_missing() {
        let stats = describe([Some(4.0), None, Some(1.0), Some(10.0)]).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.sum, 15.0);
        assert_eq!(stats.mean, 5.0);
        assert_eq!(stats.median, 4.0);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 10.0);
    }

    #[test]
    fn test_describe_even_count_median() {
        let stats = describe([Some(3.0), Some(1.0), Some(2.0), Some(10.0)]).unwrap();
        assert_eq!(stats.median, 2.5);
    }

    #[test]
    fn test_describe_empty() {
        assert!(describe([None, None]).is_none());
        assert!(describe(std::iter::empty()).is_none());
        assert!(describe([Some(f64::NAN)]).is_none());
    }

    #[test]
    fn test_round2_and_percentage() {
        assert_eq!(round2(53.645833), 53.65);
        assert_eq!(round2(-10.0), -10.0);
        assert_eq!(percentage(1.0, 0.0), 0.0);
        assert_eq!(round2(percentage(66.0, 192.0)), 34.38);
    }
}
