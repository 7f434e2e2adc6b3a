//! Per-user deltas between two snapshots

use super::stats::{Descriptive, describe, round2};
use crate::matcher::ExistingUserPair;
use crate::reader::{Field, Snapshot};
use serde::Serialize;

/// Numeric metrics tracked across snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Metric {
    Sessions,
    AvgDuration,
    Vwe,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Sessions, Metric::AvgDuration, Metric::Vwe];

    pub fn field(&self) -> Field {
        match self {
            Metric::Sessions => Field::Sessions,
            Metric::AvgDuration => Field::AvgDuration,
            Metric::Vwe => Field::Vwe,
        }
    }

    /// Column label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Sessions => "Sessions",
            Metric::AvgDuration => "Avg Time (s)",
            Metric::Vwe => "VWE Modules",
        }
    }

    /// Why the metric cannot be compared, if one of the snapshots lacks it
    pub fn unavailable_reason(&self, previous: &Snapshot, current: &Snapshot) -> Option<String> {
        let field = self.field();
        let missing: Vec<&str> = [previous, current]
            .into_iter()
            .filter(|s| !s.has(field))
            .map(|s| s.sheet_name.trim())
            .collect();
        if missing.is_empty() {
            None
        } else {
            Some(format!("no {} column in {}", field.label(), missing.join(" and ")))
        }
    }
}

/// Percentage change rounded to two decimals; 0 when the previous value is 0
pub fn percent_change(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        round2((current - previous) / previous * 100.0)
    }
}

/// One metric for one existing user
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricDelta {
    pub metric: Metric,
    pub previous: Option<f64>,
    pub current: Option<f64>,
}

impl MetricDelta {
    pub fn for_pair(metric: Metric, pair: &ExistingUserPair<'_>) -> Self {
        Self {
            metric,
            previous: pair.previous.number(metric.field()),
            current: pair.current.number(metric.field()),
        }
    }

    /// `current - previous`, unrounded; `None` when either side is missing
    pub fn delta(&self) -> Option<f64> {
        Some(self.current? - self.previous?)
    }

    pub fn percent(&self) -> Option<f64> {
        Some(percent_change(self.previous?, self.current?))
    }
}

/// How many pairs moved in each direction for one metric
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DirectionCounts {
    pub increased: usize,
    pub decreased: usize,
    pub unchanged: usize,
    /// Pairs where either value is missing
    pub unavailable: usize,
}

impl DirectionCounts {
    pub fn tally<'a, I>(deltas: I) -> Self
    where
        I: IntoIterator<Item = &'a MetricDelta>,
    {
        let mut counts = Self::default();
        for delta in deltas {
            match delta.delta() {
                Some(d) if d > 0.0 => counts.increased += 1,
                Some(d) if d < 0.0 => counts.decreased += 1,
                Some(_) => counts.unchanged += 1,
                None => counts.unavailable += 1,
            }
        }
        counts
    }

    /// Pairs with a value on both sides
    pub fn with_data(&self) -> usize {
        self.increased + self.decreased + self.unchanged
    }
}

/// Aggregates for one metric across every existing user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub metric: Metric,
    pub previous: Option<Descriptive>,
    pub current: Option<Descriptive>,
    pub delta: Option<Descriptive>,
    pub directions: DirectionCounts,
}

impl MetricSummary {
    pub fn from_deltas(metric: Metric, deltas: &[MetricDelta]) -> Self {
        let own: Vec<&MetricDelta> = deltas.iter().filter(|d| d.metric == metric).collect();
        Self {
            metric,
            previous: describe(own.iter().map(|d| d.previous)),
            current: describe(own.iter().map(|d| d.current)),
            delta: describe(own.iter().map(|d| d.delta())),
            directions: DirectionCounts::tally(own.iter().copied()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::StudentRecord;

    #[test]
    fn test_scenario_deltas() {
        let july = StudentRecord {
            email: Some("a@x.com".into()),
            sessions: Some(5.0),
            avg_duration: Some(100.0),
            ..Default::default()
        };
        let august = StudentRecord {
            email: Some("A@X.com".into()),
            sessions: Some(8.0),
            avg_duration: Some(90.0),
            ..Default::default()
        };
        let pair = ExistingUserPair {
            email: "a@x.com".into(),
            previous: &july,
            current: &august,
        };

        let sessions = MetricDelta::for_pair(Metric::Sessions, &pair);
        assert_eq!(sessions.delta(), Some(3.0));
        assert_eq!(sessions.percent(), Some(60.0));

        let time = MetricDelta::for_pair(Metric::AvgDuration, &pair);
        assert_eq!(time.delta(), Some(-10.0));
        assert_eq!(time.percent(), Some(-10.0));

        let vwe = MetricDelta::for_pair(Metric::Vwe, &pair);
        assert_eq!(vwe.delta(), None);
        assert_eq!(vwe.percent(), None);
    }

    #[test]
    fn test_zero_denominator() {
        assert_eq!(percent_change(0.0, 7.0), 0.0);
        assert_eq!(percent_change(3.0, 4.0), 33.33);
    }

    #[test]
    fn test_direction_counts() {
        let deltas = [
            MetricDelta { metric: Metric::Vwe, previous: Some(1.0), current: Some(2.0) },
            MetricDelta { metric: Metric::Vwe, previous: Some(2.0), current: Some(1.0) },
            MetricDelta { metric: Metric::Vwe, previous: Some(2.0), current: Some(2.0) },
            MetricDelta { metric: Metric::Vwe, previous: None, current: Some(2.0) },
        ];
        let counts = DirectionCounts::tally(&deltas);
        assert_eq!(
            counts,
            DirectionCounts { increased: 1, decreased: 1, unchanged: 1, unavailable: 1 }
        );
        assert_eq!(counts.with_data(), 3);
    }

    #[test]
    fn test_metric_summary_excludes_missing() {
        let deltas = [
            MetricDelta { metric: Metric::Sessions, previous: Some(5.0), current: Some(8.0) },
            MetricDelta { metric: Metric::Sessions, previous: Some(1.0), current: None },
            MetricDelta { metric: Metric::Vwe, previous: Some(1.0), current: Some(1.0) },
        ];
        let summary = MetricSummary::from_deltas(Metric::Sessions, &deltas);
        assert_eq!(summary.previous.unwrap().count, 2);
        assert_eq!(summary.previous.unwrap().mean, 3.0);
        assert_eq!(summary.current.unwrap().count, 1);
        assert_eq!(summary.delta.unwrap().mean, 3.0);
        assert_eq!(summary.directions.unavailable, 1);
    }
}
