//! Metrics engine: statistics, deltas, breakdowns and cross-tabs
//!
//! Aggregates are computed on unrounded values; rounding happens only when
//! a percentage is reported.

pub mod breakdown;
pub mod crosstab;
pub mod delta;
pub mod stats;

pub use breakdown::{Breakdown, BucketCount, OTHER_LABEL, RangeBucket};
pub use crosstab::{ColumnKey, CrossTab};
pub use delta::{DirectionCounts, Metric, MetricDelta, MetricSummary, percent_change};
pub use stats::{Descriptive, describe, percentage, round2};
