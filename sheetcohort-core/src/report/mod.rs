//! Renderer-neutral report tables and the xlsx writer

pub mod cell_ref;
mod xlsx_writer;

pub use cell_ref::{CellReference, col_to_letter, column_range, local_range, quote_sheet};
pub use xlsx_writer::{WriteOptions, write_report};

use crate::metrics::{Breakdown, CrossTab};
use crate::reader::workbook::format_number;
use serde::Serialize;

/// Text shown for unavailable values
pub const UNAVAILABLE: &str = "N/A";

/// One cell of a report table
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ReportCell {
    Empty,
    Text(String),
    Number(f64),
    /// A formula and the value already computed for it
    Formula {
        formula: String,
        result: f64,
        /// Whether the formula reads copied source sheets
        needs_sources: bool,
    },
    /// A value that could not be computed, with the reason
    Unavailable(String),
}

impl ReportCell {
    pub fn text(value: impl Into<String>) -> Self {
        ReportCell::Text(value.into())
    }

    /// A number, or `N/A` with a reason when missing
    pub fn number_or(value: Option<f64>, reason: &str) -> Self {
        match value {
            Some(v) => ReportCell::Number(v),
            None => ReportCell::Unavailable(reason.to_string()),
        }
    }

    pub fn formula(formula: impl Into<String>, result: f64) -> Self {
        ReportCell::Formula {
            formula: formula.into(),
            result,
            needs_sources: false,
        }
    }

    pub fn source_formula(formula: impl Into<String>, result: f64) -> Self {
        ReportCell::Formula {
            formula: formula.into(),
            result,
            needs_sources: true,
        }
    }

    /// Plain-text rendering, as used for console output and column widths
    pub fn display(&self) -> String {
        match self {
            ReportCell::Empty => String::new(),
            ReportCell::Text(s) => s.clone(),
            ReportCell::Number(n) => display_number(*n),
            ReportCell::Formula { formula, .. } => formula.clone(),
            ReportCell::Unavailable(_) => UNAVAILABLE.to_string(),
        }
    }

    /// Numeric value, including the cached result of a formula
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ReportCell::Number(n) => Some(*n),
            ReportCell::Formula { result, .. } => Some(*result),
            _ => None,
        }
    }
}

/// Integral numbers without decimals, everything else to two places
pub fn display_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format_number(n)
    } else {
        format!("{:.2}", n)
    }
}

impl From<&str> for ReportCell {
    fn from(value: &str) -> Self {
        ReportCell::Text(value.to_string())
    }
}

impl From<String> for ReportCell {
    fn from(value: String) -> Self {
        ReportCell::Text(value)
    }
}

impl From<f64> for ReportCell {
    fn from(value: f64) -> Self {
        ReportCell::Number(value)
    }
}

impl From<usize> for ReportCell {
    fn from(value: usize) -> Self {
        ReportCell::Number(value as f64)
    }
}

/// A heading spanning consecutive columns above the header row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderGroup {
    pub label: String,
    pub span: u16,
}

/// A titled table inside a report sheet
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportBlock {
    pub title: Option<String>,
    pub header_groups: Vec<HeaderGroup>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<ReportCell>>,
    /// Render the last row as a totals row
    pub emphasize_last_row: bool,
}

impl ReportBlock {
    pub fn new(title: Option<&str>, headers: &[&str]) -> Self {
        Self {
            title: title.map(str::to_string),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn push_row(&mut self, row: Vec<ReportCell>) {
        self.rows.push(row);
    }

    /// Columns spanned by the block
    pub fn width(&self) -> usize {
        let row_width = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        let group_width: usize = self.header_groups.iter().map(|g| g.span as usize).sum();
        self.headers.len().max(row_width).max(group_width)
    }

    /// Rows occupied before the first data row
    pub fn preamble_rows(&self) -> u32 {
        let title = u32::from(self.title.is_some());
        let groups = u32::from(!self.header_groups.is_empty());
        title + groups + 1
    }

    /// Category / Count / Percentage table with a total row
    pub fn from_breakdown(breakdown: &Breakdown) -> Self {
        let mut block = Self::new(Some(&breakdown.title), &["Category", "Count", "Percentage"]);
        for bucket in &breakdown.buckets {
            block.push_row(vec![
                bucket.label.as_str().into(),
                bucket.count.into(),
                format!("{:.2}%", breakdown.percent(bucket)).into(),
            ]);
        }
        block.push_row(vec![
            "Total".into(),
            breakdown.total.into(),
            if breakdown.total > 0 { "100.00%" } else { "0.00%" }.into(),
        ]);
        block.emphasize_last_row = true;
        block
    }

    /// Cross-tab with a row-total column and a grand-total row.
    ///
    /// Totals are `SUM` formulas over the block's own cells, so `top_row`
    /// must be the 0-based sheet row where the block starts.
    pub fn from_crosstab(table: &CrossTab, corner: &str, top_row: u32) -> Self {
        let mut headers: Vec<&str> = vec![corner];
        headers.extend(table.columns.iter().map(|c| c.label.as_str()));
        headers.push("Grand Total");
        let mut block = Self::new(Some(&table.title), &headers);

        if table.is_grouped() {
            block.header_groups.push(HeaderGroup {
                label: String::new(),
                span: 1,
            });
            for column in &table.columns {
                let label = column.group.clone().unwrap_or_default();
                let continues = block.header_groups.len() > 1;
                match block.header_groups.last_mut() {
                    Some(last) if continues && last.label == label => last.span += 1,
                    _ => block.header_groups.push(HeaderGroup { label, span: 1 }),
                }
            }
        }

        let first_row = top_row + block.preamble_rows();
        let value_columns = table.columns.len() as u32;
        let total_column = value_columns + 1;
        let last_row = (first_row + table.rows.len() as u32).saturating_sub(1);
        let has_rows = !table.rows.is_empty();

        for (r, row_label) in table.rows.iter().enumerate() {
            let sheet_row = first_row + r as u32;
            let mut row: Vec<ReportCell> = vec![row_label.as_str().into()];
            row.extend((0..table.columns.len()).map(|c| ReportCell::Number(table.get(r, c))));
            let total = table.row_total(r);
            row.push(if value_columns > 0 {
                let range = format!(
                    "{}:{}",
                    CellReference::new(sheet_row, 1),
                    CellReference::new(sheet_row, value_columns)
                );
                ReportCell::formula(format!("SUM({})", range), total)
            } else {
                ReportCell::Number(total)
            });
            block.push_row(row);
        }

        let sum_column = |col: u32, result: f64| {
            if has_rows {
                ReportCell::formula(
                    format!("SUM({})", local_range(col, first_row, last_row)),
                    result,
                )
            } else {
                ReportCell::Number(result)
            }
        };
        let mut totals: Vec<ReportCell> = vec!["Grand Total".into()];
        totals.extend(
            (0..table.columns.len()).map(|c| sum_column(c as u32 + 1, table.column_total(c))),
        );
        totals.push(sum_column(total_column, table.grand_total()));
        block.push_row(totals);
        block.emphasize_last_row = true;
        block
    }
}

/// A named output sheet made of blocks separated by a blank row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSheet {
    pub name: String,
    pub blocks: Vec<ReportBlock>,
}

impl ReportSheet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            blocks: Vec::new(),
        }
    }

    pub fn push(&mut self, block: ReportBlock) {
        self.blocks.push(block);
    }

    /// 0-based row of each block's first data row
    pub fn data_origins(&self) -> Vec<u32> {
        let mut row = 0;
        self.blocks
            .iter()
            .map(|block| {
                let origin = row + block.preamble_rows();
                row = origin + block.rows.len() as u32 + 1;
                origin
            })
            .collect()
    }
}
