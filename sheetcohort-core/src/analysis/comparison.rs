//! Existing-user comparison between two snapshots

use crate::config::OutputConfig;
use crate::matcher::{ExistingUserPair, MatchOutcome, match_existing_users};
use crate::metrics::{Metric, MetricDelta, MetricSummary};
use crate::reader::{Field, Snapshot};
use crate::report::{ReportBlock, ReportCell, ReportSheet, column_range, local_range, quote_sheet};
use serde::Serialize;
use tracing::{info, warn};

/// First column of the per-metric group in the per-user table
fn metric_base_column(index: usize) -> u32 {
    3 + 4 * index as u32
}

/// Every existing user with per-metric deltas
#[derive(Debug, Clone)]
pub struct Comparison<'a> {
    pub previous: &'a Snapshot,
    pub current: &'a Snapshot,
    pub outcome: MatchOutcome<'a>,
    /// One entry per pair, each holding every metric in `Metric::ALL` order
    pub deltas: Vec<Vec<MetricDelta>>,
    pub metrics: Vec<MetricReport>,
}

/// Aggregates of one metric, or why they could not be computed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricReport {
    pub metric: Metric,
    pub unavailable: Option<String>,
    pub summary: MetricSummary,
}

/// Serializable overview of a comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonSummary {
    pub previous_sheet: String,
    pub current_sheet: String,
    pub previous_unique: usize,
    pub current_unique: usize,
    pub existing_users: usize,
    pub previous_duplicates: usize,
    pub current_duplicates: usize,
    pub malformed_values: usize,
    pub metrics: Vec<MetricReport>,
}

/// Match both snapshots and compute every tracked metric
pub fn compare<'a>(previous: &'a Snapshot, current: &'a Snapshot) -> Comparison<'a> {
    let outcome = match_existing_users(previous, current);

    let deltas: Vec<Vec<MetricDelta>> = outcome
        .pairs
        .iter()
        .map(|pair| {
            Metric::ALL
                .iter()
                .map(|metric| MetricDelta::for_pair(*metric, pair))
                .collect()
        })
        .collect();

    let flat: Vec<MetricDelta> = deltas.iter().flatten().copied().collect();
    let metrics = Metric::ALL
        .iter()
        .map(|metric| {
            let unavailable = metric.unavailable_reason(previous, current);
            if let Some(reason) = &unavailable {
                warn!(metric = metric.label(), "{}", reason);
            }
            MetricReport {
                metric: *metric,
                unavailable,
                summary: MetricSummary::from_deltas(*metric, &flat),
            }
        })
        .collect();

    info!(existing_users = outcome.len(), "comparison computed");

    Comparison {
        previous,
        current,
        outcome,
        deltas,
        metrics,
    }
}

impl Comparison<'_> {
    fn previous_label(&self) -> &str {
        self.previous.sheet_name.trim()
    }

    fn current_label(&self) -> &str {
        self.current.sheet_name.trim()
    }

    pub fn summary(&self) -> ComparisonSummary {
        ComparisonSummary {
            previous_sheet: self.previous_label().to_string(),
            current_sheet: self.current_label().to_string(),
            previous_unique: self.outcome.previous_unique,
            current_unique: self.outcome.current_unique,
            existing_users: self.outcome.len(),
            previous_duplicates: self.outcome.previous_duplicates,
            current_duplicates: self.outcome.current_duplicates,
            malformed_values: self.previous.malformed_values + self.current.malformed_values,
            metrics: self.metrics.clone(),
        }
    }

    /// One row per existing user with raw values and derived deltas
    pub fn user_table(&self, sheet_name: &str) -> ReportSheet {
        let (prev, curr) = (self.previous_label(), self.current_label());
        let mut headers = vec![
            "Email".to_string(),
            format!("First Name ({})", prev),
            format!("First Name ({})", curr),
        ];
        for metric in Metric::ALL {
            headers.push(format!("{} {}", prev, metric.label()));
            headers.push(format!("{} {}", curr, metric.label()));
            headers.push(format!("{} Change", metric.label()));
            headers.push(format!("{} % Change", metric.label()));
        }
        headers.push(format!("{} Person Tag", prev));
        headers.push(format!("{} Person Tag", curr));
        headers.push(format!("{} Industries", prev));
        headers.push(format!("{} Industries", curr));

        let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();
        let mut block = ReportBlock::new(None, &header_refs);

        for (pair, deltas) in self.outcome.pairs.iter().zip(&self.deltas) {
            let mut row = vec![
                ReportCell::text(pair.email.as_str()),
                text_cell(self.previous, pair, Field::DisplayName, true),
                text_cell(self.current, pair, Field::DisplayName, false),
            ];
            for (delta, report) in deltas.iter().zip(&self.metrics) {
                let reason = report
                    .unavailable
                    .as_deref()
                    .unwrap_or("value missing for this user");
                row.push(ReportCell::number_or(delta.previous, reason));
                row.push(ReportCell::number_or(delta.current, reason));
                row.push(ReportCell::number_or(delta.delta(), reason));
                row.push(ReportCell::number_or(delta.percent(), reason));
            }
            row.push(text_cell(self.previous, pair, Field::EngagementTags, true));
            row.push(text_cell(self.current, pair, Field::EngagementTags, false));
            row.push(text_cell(self.previous, pair, Field::Industries, true));
            row.push(text_cell(self.current, pair, Field::Industries, false));
            block.push_row(row);
        }

        let mut sheet = ReportSheet::new(sheet_name);
        sheet.push(block);
        sheet
    }

    /// Overview, per-metric statistics with formulas, and formula examples
    pub fn summary_sheet(&self, output: &OutputConfig) -> ReportSheet {
        let mut sheet = ReportSheet::new(&output.comparison_summary_sheet);
        sheet.push(self.overview_block());
        sheet.push(self.statistics_block(&output.comparison_sheet));
        sheet.push(self.formula_examples_block());
        sheet
    }

    fn overview_block(&self) -> ReportBlock {
        let (prev, curr) = (self.previous_label(), self.current_label());
        let mut block = ReportBlock::new(
            Some("Snapshot Overview"),
            &["Metric", "Value", "Formula", "Description"],
        );
        for snapshot in [self.previous, self.current] {
            block.push_row(email_rows_row(snapshot));
        }
        block.push_row(plain_row(
            &format!("Unique emails in {}", prev),
            self.outcome.previous_unique as f64,
            "Distinct trimmed, lower-cased emails",
        ));
        block.push_row(plain_row(
            &format!("Unique emails in {}", curr),
            self.outcome.current_unique as f64,
            "Distinct trimmed, lower-cased emails",
        ));
        block.push_row(plain_row(
            "Existing users",
            self.outcome.len() as f64,
            &format!("Emails present in both {} and {}", prev, curr),
        ));
        block.push_row(plain_row(
            "Duplicate rows ignored",
            (self.outcome.previous_duplicates + self.outcome.current_duplicates) as f64,
            "Later rows repeating an email; the first occurrence is used",
        ));
        block.push_row(plain_row(
            "Malformed numeric values",
            (self.previous.malformed_values + self.current.malformed_values) as f64,
            "Non-numeric entries in numeric columns, treated as missing",
        ));
        block
    }

    fn statistics_block(&self, table_sheet: &str) -> ReportBlock {
        let (prev, curr) = (self.previous_label(), self.current_label());
        let mut block = ReportBlock::new(
            Some("Activity Comparison (existing users)"),
            &["Metric", "Value", "Formula", "Description"],
        );
        let rows = self.outcome.len() as u32;

        for (index, report) in self.metrics.iter().enumerate() {
            let base = metric_base_column(index);
            let label = report.metric.label();
            let range = |offset: u32| {
                (rows > 0).then(|| {
                    format!(
                        "{}!{}",
                        quote_sheet(table_sheet),
                        local_range(base + offset, 1, rows)
                    )
                })
            };
            let summary = &report.summary;
            let reason = report
                .unavailable
                .clone()
                .unwrap_or_else(|| "no existing users with values".to_string());
            let available = report.unavailable.is_none();
            let stat = |value: Option<f64>| value.filter(|_| available);

            let lines: Vec<(String, Option<f64>, Option<String>, String)> = vec![
                (
                    format!("Average {} {}", prev, label),
                    stat(summary.previous.map(|d| d.mean)),
                    range(0).map(|r| format!("AVERAGE({})", r)),
                    format!("Mean {} value over existing users", prev),
                ),
                (
                    format!("Average {} {}", curr, label),
                    stat(summary.current.map(|d| d.mean)),
                    range(1).map(|r| format!("AVERAGE({})", r)),
                    format!("Mean {} value over existing users", curr),
                ),
                (
                    format!("Average {} Change", label),
                    stat(summary.delta.map(|d| d.mean)),
                    range(2).map(|r| format!("AVERAGE({})", r)),
                    format!("{} minus {}, averaged", curr, prev),
                ),
                (
                    format!("Median {} Change", label),
                    stat(summary.delta.map(|d| d.median)),
                    range(2).map(|r| format!("MEDIAN({})", r)),
                    "Middle change value".to_string(),
                ),
                (
                    format!("Max {} Change", label),
                    stat(summary.delta.map(|d| d.max)),
                    range(2).map(|r| format!("MAX({})", r)),
                    "Largest increase".to_string(),
                ),
                (
                    format!("Min {} Change", label),
                    stat(summary.delta.map(|d| d.min)),
                    range(2).map(|r| format!("MIN({})", r)),
                    "Largest decrease".to_string(),
                ),
                (
                    format!("Users with Increased {}", label),
                    stat(Some(summary.directions.increased as f64)),
                    range(2).map(|r| format!("COUNTIF({},\">0\")", r)),
                    format!("Higher in {} than in {}", curr, prev),
                ),
                (
                    format!("Users with Decreased {}", label),
                    stat(Some(summary.directions.decreased as f64)),
                    range(2).map(|r| format!("COUNTIF({},\"<0\")", r)),
                    format!("Lower in {} than in {}", curr, prev),
                ),
                (
                    format!("Users with Unchanged {}", label),
                    stat(Some(summary.directions.unchanged as f64)),
                    range(2).map(|r| format!("COUNTIF({},0)", r)),
                    "Same value in both periods".to_string(),
                ),
                (
                    format!("Users with {} Data", label),
                    stat(Some(summary.directions.with_data() as f64)),
                    range(2).map(|r| format!("COUNT({})", r)),
                    "Existing users with a value in both periods".to_string(),
                ),
            ];

            for (metric, value, formula, description) in lines {
                block.push_row(formula_row(&metric, value, formula, &description, &reason));
            }
        }
        block
    }

    fn formula_examples_block(&self) -> ReportBlock {
        let (prev, curr) = (self.previous_label(), self.current_label());
        let mut block = ReportBlock::new(
            Some("Formula Examples for Manual Calculation"),
            &["Calculation", "Formula", "Example", "Result"],
        );
        let letters = |offset: u32| {
            let base = crate::report::col_to_letter(metric_base_column(0) + offset);
            format!("{}2", base)
        };
        block.push_row(vec![
            "Change".into(),
            format!("={} value - {} value", curr, prev).into(),
            format!("={} - {}", letters(1), letters(0)).into(),
            "Positive = increased activity".into(),
        ]);
        block.push_row(vec![
            "Percentage Change".into(),
            format!("=({} value - {} value) / {} value * 100", curr, prev, prev).into(),
            format!("=({}-{})/{}*100", letters(1), letters(0), letters(0)).into(),
            format!("0 when the {} value is 0", prev).into(),
        ]);
        let change_range = local_range(
            metric_base_column(0) + 2,
            1,
            (self.outcome.len() as u32).max(1),
        );
        block.push_row(vec![
            "Users Increased".into(),
            "=COUNTIF(change range, \">0\")".into(),
            format!("=COUNTIF({},\">0\")", change_range).into(),
            "Text entries such as N/A are ignored".into(),
        ]);
        block
    }
}

fn text_cell(
    snapshot: &Snapshot,
    pair: &ExistingUserPair<'_>,
    field: Field,
    previous: bool,
) -> ReportCell {
    if !snapshot.has(field) {
        return ReportCell::Unavailable(format!(
            "no {} column in {}",
            field.label(),
            snapshot.sheet_name.trim()
        ));
    }
    let record = if previous { pair.previous } else { pair.current };
    record
        .text(field)
        .map(ReportCell::text)
        .unwrap_or(ReportCell::Empty)
}

fn plain_row(metric: &str, value: f64, description: &str) -> Vec<ReportCell> {
    vec![
        metric.into(),
        value.into(),
        ReportCell::Empty,
        description.into(),
    ]
}

/// `COUNTA` over the source email column, referencing the copied source sheet
fn email_rows_row(snapshot: &Snapshot) -> Vec<ReportCell> {
    let label = format!("Rows with an email in {}", snapshot.sheet_name.trim());
    let count = snapshot.records.iter().filter(|r| r.email.is_some()).count() as f64;
    let formula = snapshot
        .column(Field::Email)
        .zip(snapshot.data_rows)
        .map(|(binding, (first, last))| {
            format!(
                "COUNTA({})",
                column_range(&snapshot.sheet_name, binding.index, first, last)
            )
        });
    match formula {
        Some(formula) => vec![
            label.into(),
            ReportCell::source_formula(formula.as_str(), count),
            format!("={}", formula).into(),
            "Non-blank email cells in the source sheet".into(),
        ],
        None => plain_row(&label, count, "Non-blank email cells in the source sheet"),
    }
}

fn formula_row(
    metric: &str,
    value: Option<f64>,
    formula: Option<String>,
    description: &str,
    reason: &str,
) -> Vec<ReportCell> {
    match (value, formula) {
        (Some(value), Some(formula)) => vec![
            metric.into(),
            ReportCell::formula(formula.as_str(), value),
            format!("={}", formula).into(),
            description.into(),
        ],
        (Some(value), None) => vec![
            metric.into(),
            value.into(),
            ReportCell::Empty,
            description.into(),
        ],
        (None, _) => vec![
            metric.into(),
            ReportCell::Unavailable(reason.to_string()),
            ReportCell::Empty,
            format!("{} ({})", description, reason).into(),
        ],
    }
}
