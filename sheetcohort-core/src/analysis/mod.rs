//! Analyses built on the metrics engine, each producing report sheets

pub mod comparison;
pub mod pivot;
pub mod snapshot;

pub use comparison::{Comparison, ComparisonSummary, MetricReport, compare};
pub use pivot::{industry_preferences, industry_sheet, sessions_by_status, sessions_sheet};
pub use snapshot::{SnapshotSummary, summarize};
