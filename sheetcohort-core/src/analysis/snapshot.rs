//! Single-snapshot summary: totals, averages and categorical breakdowns

use crate::config::{CohortConfig, SummaryConfig, Vocabularies};
use crate::metrics::{Breakdown, Descriptive, describe};
use crate::normalize::split_multi;
use crate::reader::{Field, Snapshot};
use crate::report::{ReportBlock, ReportCell, ReportSheet, column_range};
use serde::Serialize;
use std::collections::HashSet;
use tracing::info;

/// Aggregates of one snapshot
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotSummary {
    pub sheet_name: String,
    pub total_students: usize,
    pub unique_users: usize,
    pub malformed_values: usize,
    pub sessions: Option<Descriptive>,
    pub avg_duration: Option<Descriptive>,
    pub vwe: Option<Descriptive>,
    /// Industry tokens per student with industry data
    pub industry_modules: Option<Descriptive>,
    /// Engagement tags per session for students with sessions and tags
    pub engagement_per_session: Option<Descriptive>,
    pub vwe_levels: Breakdown,
    pub industry_module_ranges: Breakdown,
    pub engagement_ranges: Breakdown,
    pub faculty: Breakdown,
    pub year: Breakdown,
    pub international: Breakdown,
    /// Fields with no column in the sheet
    pub missing_fields: Vec<Field>,
}

fn industry_module_counts(snapshot: &Snapshot) -> Vec<Option<f64>> {
    snapshot
        .records
        .iter()
        .map(|r| {
            let count = split_multi(r.industries.as_deref()).len();
            (count > 0).then_some(count as f64)
        })
        .collect()
}

fn engagement_per_session(snapshot: &Snapshot) -> Vec<Option<f64>> {
    snapshot
        .records
        .iter()
        .map(|r| {
            let sessions = r.sessions.filter(|s| *s > 0.0)?;
            let tags = split_multi(r.engagement_tags.as_deref());
            (!tags.is_empty()).then(|| tags.len() as f64 / sessions)
        })
        .collect()
}

/// Summarize one snapshot with the configured buckets and vocabularies
pub fn summarize(
    snapshot: &Snapshot,
    buckets: &SummaryConfig,
    vocabulary: &Vocabularies,
) -> SnapshotSummary {
    let records = &snapshot.records;
    let unique_users = records
        .iter()
        .filter_map(|r| r.email_key())
        .collect::<HashSet<_>>()
        .len();

    let industry_counts = industry_module_counts(snapshot);
    let engagement = engagement_per_session(snapshot);

    let summary = SnapshotSummary {
        sheet_name: snapshot.sheet_name.trim().to_string(),
        total_students: records.len(),
        unique_users,
        malformed_values: snapshot.malformed_values,
        sessions: describe(records.iter().map(|r| r.sessions)),
        avg_duration: describe(records.iter().map(|r| r.avg_duration)),
        vwe: describe(records.iter().map(|r| r.vwe)),
        industry_modules: describe(industry_counts.iter().copied()),
        engagement_per_session: describe(engagement.iter().copied()),
        vwe_levels: Breakdown::exact_values(
            "VWE Modules Breakdown",
            &buckets.vwe_levels,
            records.iter().map(|r| r.vwe),
        ),
        industry_module_ranges: Breakdown::ranges(
            "Industry Modules Breakdown",
            &buckets.industry_module_ranges,
            industry_counts.iter().copied(),
        ),
        engagement_ranges: Breakdown::ranges(
            "Engagement per Session Breakdown",
            &buckets.engagement_ranges,
            engagement.iter().copied(),
        ),
        faculty: Breakdown::categories(
            "Faculty Breakdown",
            &vocabulary.faculty,
            records.iter().map(|r| r.faculty.as_deref()),
        ),
        year: Breakdown::categories(
            "Year Breakdown",
            &vocabulary.year,
            records.iter().map(|r| r.year.as_deref()),
        ),
        international: Breakdown::categories(
            "International Status Breakdown",
            &vocabulary.international,
            records.iter().map(|r| r.international.as_deref()),
        ),
        missing_fields: snapshot.missing_fields(),
    };

    info!(
        sheet = %summary.sheet_name,
        students = summary.total_students,
        "snapshot summarized"
    );
    summary
}

impl SnapshotSummary {
    fn reason(&self, field: Field) -> String {
        format!("no {} column in {}", field.label(), self.sheet_name)
    }

    /// Breakdowns of the fields present in the sheet, in report order
    pub fn breakdowns(&self) -> Vec<&Breakdown> {
        let mut out = Vec::new();
        let present = |f: Field| !self.missing_fields.contains(&f);
        if present(Field::Vwe) {
            out.push(&self.vwe_levels);
        }
        if present(Field::Industries) {
            out.push(&self.industry_module_ranges);
        }
        if present(Field::Sessions) && present(Field::EngagementTags) {
            out.push(&self.engagement_ranges);
        }
        if present(Field::Faculty) {
            out.push(&self.faculty);
        }
        if present(Field::Year) {
            out.push(&self.year);
        }
        if present(Field::International) {
            out.push(&self.international);
        }
        out
    }

    /// Metrics block, breakdown blocks and notes
    pub fn to_sheet(&self, snapshot: &Snapshot, config: &CohortConfig) -> ReportSheet {
        let mut sheet = ReportSheet::new(&config.output.snapshot_summary_sheet);
        sheet.push(self.metrics_block(snapshot));
        for breakdown in self.breakdowns() {
            sheet.push(ReportBlock::from_breakdown(breakdown));
        }
        sheet.push(self.notes_block(snapshot));
        sheet
    }

    fn metrics_block(&self, snapshot: &Snapshot) -> ReportBlock {
        let title = format!("{} Metrics Summary", self.sheet_name);
        let mut block = ReportBlock::new(Some(&title), &["Metric", "Value", "Formula", "Description"]);
        let name = &self.sheet_name;

        block.push_row(vec![
            format!("Total Students in {}", name).into(),
            self.total_students.into(),
            ReportCell::Empty,
            "Rows with data below the header".into(),
        ]);
        block.push_row(vec![
            "Unique Users".into(),
            self.unique_users.into(),
            ReportCell::Empty,
            "Distinct trimmed, lower-cased emails".into(),
        ]);

        let source = |field: Field, function: &str, value: Option<f64>| -> [ReportCell; 2] {
            let Some(value) = value else {
                let reason = self.unavailable_text(field, "no values");
                return [ReportCell::Unavailable(reason), ReportCell::Empty];
            };
            match (snapshot.column(field), snapshot.data_rows) {
                (Some(binding), Some((first, last))) => {
                    let formula = format!(
                        "{}({})",
                        function,
                        column_range(&snapshot.sheet_name, binding.index, first, last)
                    );
                    [
                        ReportCell::source_formula(formula.as_str(), value),
                        format!("={}", formula).into(),
                    ]
                }
                _ => [ReportCell::Number(value), ReportCell::Empty],
            }
        };

        let rows: [(&str, Field, &str, Option<f64>, &str); 4] = [
            (
                "Total Web Sessions",
                Field::Sessions,
                "SUM",
                self.sessions.map(|d| d.sum),
                "Sum of session counts",
            ),
            (
                "Average Session Duration (seconds)",
                Field::AvgDuration,
                "AVERAGE",
                self.avg_duration.map(|d| d.mean),
                "Mean of the average login time",
            ),
            (
                "Average VWE modules commenced per student",
                Field::Vwe,
                "AVERAGE",
                self.vwe.map(|d| d.mean),
                "Mean over students with a VWE value",
            ),
            (
                "Students with VWE data",
                Field::Vwe,
                "COUNT",
                self.vwe.map(|d| d.count as f64),
                "Numeric VWE entries",
            ),
        ];
        for (metric, field, function, value, description) in rows {
            let [value_cell, formula_cell] = source(field, function, value);
            block.push_row(vec![metric.into(), value_cell, formula_cell, description.into()]);
        }

        block.push_row(vec![
            "Average Session Duration (minutes)".into(),
            ReportCell::number_or(
                self.avg_duration.map(|d| d.mean / 60.0),
                &self.reason(Field::AvgDuration),
            ),
            ReportCell::Empty,
            "Seconds divided by 60".into(),
        ]);
        block.push_row(vec![
            "Average industry-based modules per student".into(),
            ReportCell::number_or(
                self.industry_modules.map(|d| d.mean),
                &self.unavailable_text(Field::Industries, "no industry data"),
            ),
            ReportCell::Empty,
            "Selections per student with industry data".into(),
        ]);
        block.push_row(vec![
            "Average modules engaged with per session".into(),
            ReportCell::number_or(
                self.engagement_per_session.map(|d| d.mean),
                &self.unavailable_text(Field::EngagementTags, "no session and tag data"),
            ),
            ReportCell::Empty,
            "Engagement tags divided by sessions, per student".into(),
        ]);
        block.push_row(vec![
            "Malformed numeric values".into(),
            self.malformed_values.into(),
            ReportCell::Empty,
            "Non-numeric entries in numeric columns, treated as missing".into(),
        ]);
        block
    }

    fn unavailable_text(&self, field: Field, fallback: &str) -> String {
        if self.missing_fields.contains(&field) {
            self.reason(field)
        } else {
            fallback.to_string()
        }
    }

    fn notes_block(&self, snapshot: &Snapshot) -> ReportBlock {
        let mut block = ReportBlock::new(
            Some("Notes & Definitions"),
            &["Term", "Definition", "Data Source", "Calculation Method"],
        );
        let source = |field: Field| match snapshot.column(field) {
            Some(binding) => format!("'{}' column in {}", binding.header, self.sheet_name),
            None => self.reason(field),
        };
        block.push_row(vec![
            "VWE".into(),
            "Virtual Work Experience modules".into(),
            source(Field::Vwe).into(),
            "Direct average of numeric values".into(),
        ]);
        block.push_row(vec![
            "Industry Modules".into(),
            "Industry preference selections".into(),
            source(Field::Industries).into(),
            "Count of pipe- or comma-separated values".into(),
        ]);
        block.push_row(vec![
            "Modules per Session".into(),
            "Engagement types per web session".into(),
            format!("{} + {}", source(Field::EngagementTags), source(Field::Sessions)).into(),
            "Engagement count divided by session count".into(),
        ]);
        block.push_row(vec![
            "(blank)".into(),
            "No value entered".into(),
            "Faculty, year and status columns".into(),
            "Kept apart from unrecognized values".into(),
        ]);
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{ColumnBinding, StudentRecord};
    use std::collections::BTreeMap;

    fn snapshot(records: Vec<StudentRecord>, fields: &[Field]) -> Snapshot {
        let columns: BTreeMap<Field, ColumnBinding> = fields
            .iter()
            .enumerate()
            .map(|(i, f)| {
                (
                    *f,
                    ColumnBinding {
                        index: i as u32,
                        header: format!("{:?}", f),
                    },
                )
            })
            .collect();
        let data_rows = Some((1, records.len() as u32));
        Snapshot {
            sheet_name: "August".into(),
            records,
            columns,
            data_rows,
            malformed_values: 0,
        }
    }

    fn all_fields() -> Vec<Field> {
        Field::ALL.to_vec()
    }

    #[test]
    fn test_fractional_engagement_lands_in_declared_range() {
        let records = vec![StudentRecord {
            email: Some("a@x.com".into()),
            sessions: Some(2.0),
            engagement_tags: Some("Events, Mentoring, Panels, Workshops, Fairs".into()),
            ..Default::default()
        }];
        let snapshot = snapshot(records, &all_fields());
        let config = CohortConfig::default();
        let summary = summarize(&snapshot, &config.summary, &config.vocabulary);

        assert_eq!(summary.engagement_per_session.map(|d| d.mean), Some(2.5));
        assert_eq!(summary.engagement_ranges.count("0-2 Modules"), Some(1));
        assert_eq!(summary.engagement_ranges.count(crate::metrics::OTHER_LABEL), None);
    }

    #[test]
    fn test_summary_values() {
        let records = vec![
            StudentRecord {
                email: Some("a@x.com".into()),
                sessions: Some(2.0),
                avg_duration: Some(120.0),
                vwe: Some(1.0),
                industries: Some("|14|15|".into()),
                engagement_tags: Some("Events, Mentoring".into()),
                faculty: Some("Faculty of Engineering".into()),
                year: Some("1".into()),
                ..Default::default()
            },
            StudentRecord {
                email: Some("A@x.com".into()),
                sessions: Some(0.0),
                avg_duration: Some(60.0),
                vwe: Some(2.0),
                engagement_tags: Some("Events".into()),
                faculty: Some("Faculty of Science".into()),
                ..Default::default()
            },
        ];
        let snapshot = snapshot(records, &all_fields());
        let config = CohortConfig::default();
        let summary = summarize(&snapshot, &config.summary, &config.vocabulary);

        assert_eq!(summary.total_students, 2);
        assert_eq!(summary.unique_users, 1);
        assert_eq!(summary.sessions.unwrap().sum, 2.0);
        assert_eq!(summary.avg_duration.unwrap().mean, 90.0);
        assert_eq!(summary.industry_modules.unwrap().count, 1);
        assert_eq!(summary.industry_modules.unwrap().mean, 2.0);
        assert_eq!(summary.engagement_per_session.unwrap().count, 1);
        assert_eq!(summary.engagement_per_session.unwrap().mean, 1.0);
        assert_eq!(summary.vwe_levels.count("1"), Some(1));
        assert_eq!(summary.vwe_levels.count("3"), Some(0));
        assert_eq!(summary.faculty.count("Other"), Some(1));
        assert_eq!(summary.year.count("(blank)"), Some(1));
        assert_eq!(summary.breakdowns().len(), 6);
    }

    #[test]
    fn test_sheet_marks_missing_columns() {
        let records = vec![StudentRecord {
            email: Some("a@x.com".into()),
            sessions: Some(3.0),
            ..Default::default()
        }];
        let snapshot = snapshot(records, &[Field::Email, Field::Sessions]);
        let config = CohortConfig::default();
        let summary = summarize(&snapshot, &config.summary, &config.vocabulary);
        let sheet = summary.to_sheet(&snapshot, &config);

        assert_eq!(sheet.name, "August_Summary");
        // metrics + notes only
        assert_eq!(sheet.blocks.len(), 2);
        let metrics = &sheet.blocks[0];
        let total_sessions = &metrics.rows[2];
        assert_eq!(
            total_sessions[1],
            ReportCell::source_formula("SUM(August!B2:B2)", 3.0)
        );
        let vwe = &metrics.rows[4];
        assert_eq!(
            vwe[1],
            ReportCell::Unavailable("no virtual work experience column in August".into())
        );
    }
}
