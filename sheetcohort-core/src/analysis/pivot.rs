//! Pivot tables over one snapshot

use crate::config::{PivotConfig, Vocabularies};
use crate::metrics::{ColumnKey, CrossTab};
use crate::normalize::resolve_industries;
use crate::reader::{Field, IndustryCatalog, Snapshot};
use crate::report::{ReportBlock, ReportSheet};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Count of (student, industry) selections by faculty and year.
///
/// Only students whose canonical faculty is one of the focus faculties are
/// counted. An industry selected twice by the same student counts once.
pub fn industry_preferences(
    snapshot: &Snapshot,
    catalog: &IndustryCatalog,
    pivot: &PivotConfig,
    vocabulary: &Vocabularies,
) -> CrossTab {
    let years = vocabulary.year.all_labels();
    let columns: Vec<ColumnKey> = pivot
        .focus_faculties
        .iter()
        .flat_map(|faculty| years.iter().map(move |year| ColumnKey::grouped(faculty, year)))
        .collect();
    let rows: Vec<String> = catalog.names().map(str::to_string).collect();
    let mut table = CrossTab::new(
        "Industry Preferences by Faculty and Year",
        rows.clone(),
        columns,
    );

    if !snapshot.has(Field::Industries) {
        warn!(sheet = %snapshot.sheet_name, "no industries column; industry table is empty");
    }

    let mut counted = 0;
    for record in &snapshot.records {
        let faculty = vocabulary.faculty.canonical(record.faculty.as_deref());
        if !pivot.focus_faculties.iter().any(|f| f == faculty) {
            continue;
        }
        let year = vocabulary.year.canonical(record.year.as_deref());
        let column = ColumnKey::grouped(faculty, year);

        let mut seen = HashSet::new();
        for industry in resolve_industries(record.industries.as_deref(), catalog) {
            if seen.insert(industry) && table.add(industry, &column, 1.0) {
                counted += 1;
            }
        }
    }

    table.prune_undeclared(&rows, &vocabulary.year.labels());
    info!(selections = counted, industries = table.rows.len(), "industry table built");
    table
}

/// Sum of sessions by international status and year.
///
/// A missing session value contributes 0 to its row.
pub fn sessions_by_status(snapshot: &Snapshot, vocabulary: &Vocabularies) -> CrossTab {
    let rows = vocabulary.international.all_labels();
    let columns: Vec<ColumnKey> = vocabulary
        .year
        .all_labels()
        .iter()
        .map(|year| ColumnKey::new(year))
        .collect();
    let mut table = CrossTab::new("Sum of Web Sessions", rows, columns);

    if !snapshot.has(Field::Sessions) {
        warn!(sheet = %snapshot.sheet_name, "no sessions column; session sums are 0");
    }

    // catch-all buckets stay when a record lands in them, even with 0 sessions
    let mut used_rows = vocabulary.international.labels();
    let mut used_columns = vocabulary.year.labels();
    for record in &snapshot.records {
        let status = vocabulary.international.canonical(record.international.as_deref());
        let year = vocabulary.year.canonical(record.year.as_deref());
        let sessions = record.sessions.unwrap_or(0.0);
        if !table.add(status, &ColumnKey::new(year), sessions) {
            debug!(row = record.row, "record outside the pivot");
            continue;
        }
        if !used_rows.iter().any(|r| r == status) {
            used_rows.push(status.to_string());
        }
        if !used_columns.iter().any(|c| c == year) {
            used_columns.push(year.to_string());
        }
    }

    table.prune_undeclared(&used_rows, &used_columns);
    info!(total = table.grand_total(), "sessions pivot built");
    table
}

/// Note attached to the industry table about how selections are counted
pub const INDUSTRY_COUNT_NOTE: &str =
    "Each student counts once per industry, even when the industry is listed more than once";

/// Industry table as a report sheet, followed by a counting note
pub fn industry_sheet(table: &CrossTab, sheet_name: &str) -> ReportSheet {
    let mut sheet = ReportSheet::new(sheet_name);
    sheet.push(ReportBlock::from_crosstab(table, "Industry", 0));
    let mut notes = ReportBlock::new(Some("Notes"), &["Note"]);
    notes.push_row(vec![INDUSTRY_COUNT_NOTE.into()]);
    sheet.push(notes);
    sheet
}

/// Sessions pivot as a report sheet
pub fn sessions_sheet(table: &CrossTab, sheet_name: &str) -> ReportSheet {
    let mut sheet = ReportSheet::new(sheet_name);
    sheet.push(ReportBlock::from_crosstab(table, "International Status", 0));
    sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::BLANK_LABEL;
    use crate::reader::{ColumnBinding, StudentRecord};
    use std::collections::BTreeMap;

    fn snapshot(records: Vec<StudentRecord>) -> Snapshot {
        let columns: BTreeMap<Field, ColumnBinding> = Field::ALL
            .iter()
            .enumerate()
            .map(|(i, f)| {
                (
                    *f,
                    ColumnBinding {
                        index: i as u32,
                        header: String::new(),
                    },
                )
            })
            .collect();
        Snapshot {
            sheet_name: "August".into(),
            records,
            columns,
            data_rows: None,
            malformed_values: 0,
        }
    }

    fn student(faculty: &str, year: &str, industries: &str) -> StudentRecord {
        StudentRecord {
            email: Some("s@x.com".into()),
            faculty: Some(faculty.into()),
            year: Some(year.into()),
            industries: Some(industries.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_industry_preferences() {
        let catalog = IndustryCatalog::from_entries([
            (14, "Engineering"),
            (28, "Technology"),
            (3, "Law"),
        ]);
        let snapshot = snapshot(vec![
            student("|Faculty of Engineering|", "1st Year", "|14|28|14|"),
            student("Faculty of Engineering", "2", "|28|99|"),
            student("Faculty of Arts and Social Sciences", "Masters", "|3|"),
            student("Sydney Law School", "1", "|3|"),
        ]);
        let config = crate::config::CohortConfig::default();
        let table = industry_preferences(&snapshot, &catalog, &config.pivot, &config.vocabulary);

        assert_eq!(table.rows, vec!["Engineering", "Technology", "Law"]);
        // two focus faculties, five declared years, one non-empty "Unknown"
        assert_eq!(table.columns.len(), 11);
        let eng_first = table
            .columns
            .iter()
            .position(|c| *c == ColumnKey::grouped("Faculty of Engineering", "1st Year"))
            .unwrap();
        assert_eq!(table.get(0, eng_first), 1.0);
        assert_eq!(table.get(1, eng_first), 1.0);
        assert_eq!(table.row_total(1), 2.0);
        assert_eq!(table.row_total(2), 1.0);
        assert_eq!(table.grand_total(), 4.0);
    }

    #[test]
    fn test_unpicked_industries_stay_with_zero() {
        let catalog = IndustryCatalog::from_entries([
            (1, "Accounting"),
            (14, "Engineering"),
            (28, "Technology"),
        ]);
        let snapshot = snapshot(vec![student("Faculty of Engineering", "1st Year", "|14|")]);
        let config = crate::config::CohortConfig::default();
        let table = industry_preferences(&snapshot, &catalog, &config.pivot, &config.vocabulary);

        assert_eq!(table.rows, vec!["Accounting", "Engineering", "Technology"]);
        assert_eq!(table.row_total(0), 0.0);
        assert_eq!(table.row_total(1), 1.0);
        assert_eq!(table.row_total(2), 0.0);

        let sheet = industry_sheet(&table, "Industry Preferences Table");
        assert_eq!(sheet.blocks[0].rows.len(), 4);
        assert_eq!(
            sheet.blocks[1].rows[0],
            vec![crate::report::ReportCell::text(INDUSTRY_COUNT_NOTE)]
        );
    }

    #[test]
    fn test_sessions_by_status() {
        let records = vec![
            StudentRecord {
                international: Some("Domestic".into()),
                year: Some("1st Year".into()),
                sessions: Some(4.0),
                ..Default::default()
            },
            StudentRecord {
                international: Some("Domestic".into()),
                year: Some("1".into()),
                sessions: Some(3.0),
                ..Default::default()
            },
            StudentRecord {
                international: None,
                year: Some("3rd Year".into()),
                sessions: None,
                ..Default::default()
            },
            StudentRecord {
                international: Some("International".into()),
                year: None,
                sessions: Some(5.0),
                ..Default::default()
            },
        ];
        let vocabulary = Vocabularies::default();
        let table = sessions_by_status(&snapshot(records), &vocabulary);

        assert_eq!(table.rows, vec!["Domestic", "International", BLANK_LABEL]);
        assert_eq!(table.get(0, 0), 7.0);
        assert_eq!(table.columns.last().unwrap().label, BLANK_LABEL);
        assert_eq!(table.row_total(1), 5.0);
        assert_eq!(table.grand_total(), 12.0);

        let sheet = sessions_sheet(&table, "Pivot Table");
        let block = &sheet.blocks[0];
        assert_eq!(block.headers.last().unwrap(), "Grand Total");
        assert_eq!(block.rows.len(), 4);
    }
}
