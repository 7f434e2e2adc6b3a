//! sheetcohort-core: Core library for student-activity spreadsheet analysis
//!
//! Loads monthly snapshot sheets, normalizes free-text categories, matches
//! existing users across two snapshots, computes deltas, statistics,
//! breakdowns and cross-tabs, and writes the results as xlsx sheets with
//! optional formulas that reproduce the aggregates.

pub mod analysis;
pub mod config;
pub mod error;
pub mod logging;
pub mod matcher;
pub mod metrics;
pub mod normalize;
pub mod reader;
pub mod report;

use std::path::Path;
use tracing::info;

pub use analysis::{ComparisonSummary, SnapshotSummary};
pub use config::CohortConfig;
pub use error::{CohortError, Result};
pub use metrics::CrossTab;
pub use reader::{Workbook, read_workbook};
pub use report::{ReportSheet, WriteOptions};

/// Which pivot tables to build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotSelection {
    Industry,
    Sessions,
    All,
}

/// Pivot tables computed for one snapshot
#[derive(Debug, Clone, serde::Serialize)]
pub struct PivotTables {
    pub sheet_name: String,
    pub industry: Option<CrossTab>,
    pub sessions: Option<CrossTab>,
}

/// Main pipeline interface
pub struct Pipeline {
    config: CohortConfig,
}

impl Pipeline {
    /// Create a pipeline with default configuration
    pub fn new() -> Self {
        Self::with_config(CohortConfig::default())
    }

    /// Create a pipeline with custom configuration
    pub fn with_config(config: CohortConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CohortConfig {
        &self.config
    }

    /// Read every sheet of the input file
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Workbook> {
        let path = path.as_ref();
        info!(path = %path.display(), "reading workbook");
        read_workbook(path)
    }

    /// Compare the previous and current snapshots.
    ///
    /// Returns the overview plus the per-user table and the summary sheet.
    pub fn compare(&self, workbook: &Workbook) -> Result<(ComparisonSummary, Vec<ReportSheet>)> {
        let sheets = &self.config.sheets;
        let previous = reader::load_snapshot(workbook, &sheets.previous, &self.config.columns)?;
        let current = reader::load_snapshot(workbook, &sheets.current, &self.config.columns)?;

        let comparison = analysis::compare(&previous, &current);
        let output = &self.config.output;
        let report = vec![
            comparison.user_table(&output.comparison_sheet),
            comparison.summary_sheet(output),
        ];
        Ok((comparison.summary(), report))
    }

    /// Summarize the current snapshot on its own
    pub fn summarize(&self, workbook: &Workbook) -> Result<(SnapshotSummary, Vec<ReportSheet>)> {
        let snapshot = reader::load_snapshot(
            workbook,
            &self.config.sheets.current,
            &self.config.columns,
        )?;
        let summary =
            analysis::summarize(&snapshot, &self.config.summary, &self.config.vocabulary);
        let sheet = summary.to_sheet(&snapshot, &self.config);
        Ok((summary, vec![sheet]))
    }

    /// Build the selected pivot tables over the current snapshot
    pub fn pivot(
        &self,
        workbook: &Workbook,
        selection: PivotSelection,
    ) -> Result<(PivotTables, Vec<ReportSheet>)> {
        let config = &self.config;
        let snapshot = reader::load_snapshot(workbook, &config.sheets.current, &config.columns)?;
        let mut tables = PivotTables {
            sheet_name: snapshot.sheet_name.trim().to_string(),
            industry: None,
            sessions: None,
        };
        let mut sheets = Vec::new();

        if matches!(selection, PivotSelection::Industry | PivotSelection::All) {
            let catalog = reader::load_catalog(workbook, &config.sheets.catalog)?;
            let table = analysis::industry_preferences(
                &snapshot,
                &catalog,
                &config.pivot,
                &config.vocabulary,
            );
            sheets.push(analysis::industry_sheet(&table, &config.output.industry_sheet));
            tables.industry = Some(table);
        }
        if matches!(selection, PivotSelection::Sessions | PivotSelection::All) {
            let table = analysis::sessions_by_status(&snapshot, &config.vocabulary);
            sheets.push(analysis::sessions_sheet(
                &table,
                &config.output.sessions_pivot_sheet,
            ));
            tables.sessions = Some(table);
        }

        Ok((tables, sheets))
    }

    /// Write report sheets, copying the source sheets when requested
    pub fn write<P: AsRef<Path>>(
        &self,
        output: P,
        source: &Workbook,
        sheets: &[ReportSheet],
        formulas: bool,
        copy_sources: bool,
    ) -> Result<()> {
        let options = WriteOptions {
            formulas,
            copy_sources,
            max_column_width: self.config.output.max_column_width,
        };
        report::write_report(output, Some(source), sheets, &options)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
