//! Student records loaded from one monthly snapshot sheet

use super::workbook::{Sheet, Workbook};
use crate::config::ColumnAliases;
use crate::error::{CohortError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Logical columns of a snapshot row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Field {
    Email,
    DisplayName,
    Faculty,
    Year,
    International,
    Sessions,
    AvgDuration,
    Vwe,
    Industries,
    EngagementTags,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::Email,
        Field::DisplayName,
        Field::Faculty,
        Field::Year,
        Field::International,
        Field::Sessions,
        Field::AvgDuration,
        Field::Vwe,
        Field::Industries,
        Field::EngagementTags,
    ];

    /// Human-readable name used in messages
    pub fn label(&self) -> &'static str {
        match self {
            Field::Email => "email",
            Field::DisplayName => "display name",
            Field::Faculty => "faculty",
            Field::Year => "year of study",
            Field::International => "international status",
            Field::Sessions => "session count",
            Field::AvgDuration => "average session duration",
            Field::Vwe => "virtual work experience",
            Field::Industries => "industry preferences",
            Field::EngagementTags => "engagement tags",
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(self, Field::Sessions | Field::AvgDuration | Field::Vwe)
    }
}

/// Where a field was found in the sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnBinding {
    /// 0-based column index
    pub index: u32,
    /// Header text as written in the sheet
    pub header: String,
}

/// One student in one snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentRecord {
    /// 0-based sheet row the record came from
    pub row: u32,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub faculty: Option<String>,
    pub year: Option<String>,
    pub international: Option<String>,
    pub sessions: Option<f64>,
    /// Average session duration in seconds
    pub avg_duration: Option<f64>,
    pub vwe: Option<f64>,
    pub industries: Option<String>,
    pub engagement_tags: Option<String>,
}

impl StudentRecord {
    /// Join key: trimmed, lower-cased email; `None` when blank
    pub fn email_key(&self) -> Option<String> {
        self.email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
    }

    /// Numeric value of a field, `None` for text fields and missing values
    pub fn number(&self, field: Field) -> Option<f64> {
        match field {
            Field::Sessions => self.sessions,
            Field::AvgDuration => self.avg_duration,
            Field::Vwe => self.vwe,
            _ => None,
        }
    }

    /// Raw text of a field, `None` for numeric fields and missing values
    pub fn text(&self, field: Field) -> Option<&str> {
        match field {
            Field::Email => self.email.as_deref(),
            Field::DisplayName => self.display_name.as_deref(),
            Field::Faculty => self.faculty.as_deref(),
            Field::Year => self.year.as_deref(),
            Field::International => self.international.as_deref(),
            Field::Industries => self.industries.as_deref(),
            Field::EngagementTags => self.engagement_tags.as_deref(),
            _ => None,
        }
    }

    fn set_text(&mut self, field: Field, value: Option<String>) {
        match field {
            Field::Email => self.email = value,
            Field::DisplayName => self.display_name = value,
            Field::Faculty => self.faculty = value,
            Field::Year => self.year = value,
            Field::International => self.international = value,
            Field::Industries => self.industries = value,
            Field::EngagementTags => self.engagement_tags = value,
            _ => {}
        }
    }

    fn set_number(&mut self, field: Field, value: Option<f64>) {
        match field {
            Field::Sessions => self.sessions = value,
            Field::AvgDuration => self.avg_duration = value,
            Field::Vwe => self.vwe = value,
            _ => {}
        }
    }
}

/// All records of one snapshot sheet
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub sheet_name: String,
    pub records: Vec<StudentRecord>,
    pub columns: BTreeMap<Field, ColumnBinding>,
    /// First and last 0-based data rows (below the header)
    pub data_rows: Option<(u32, u32)>,
    /// Non-blank cells in numeric columns that did not parse as numbers
    pub malformed_values: usize,
}

impl Snapshot {
    /// Whether the sheet carries a column for this field
    pub fn has(&self, field: Field) -> bool {
        self.columns.contains_key(&field)
    }

    pub fn column(&self, field: Field) -> Option<&ColumnBinding> {
        self.columns.get(&field)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Fields with no column in this sheet
    pub fn missing_fields(&self) -> Vec<Field> {
        Field::ALL
            .iter()
            .copied()
            .filter(|f| !self.has(*f))
            .collect()
    }
}

/// Load a snapshot from the named sheet.
///
/// The header is the first non-blank row. The email column is required;
/// every other field degrades to unavailable when its column is absent.
/// Rows with no value in any bound column are skipped.
pub fn load_snapshot(
    workbook: &Workbook,
    sheet_name: &str,
    aliases: &ColumnAliases,
) -> Result<Snapshot> {
    let sheet = workbook.require_sheet(sheet_name)?;
    let snapshot = snapshot_from_sheet(sheet, aliases)?;

    info!(
        sheet = %snapshot.sheet_name,
        records = snapshot.len(),
        "snapshot loaded"
    );
    for field in snapshot.missing_fields() {
        warn!(
            sheet = %snapshot.sheet_name,
            "no {} column; dependent metrics will be unavailable",
            field.label()
        );
    }
    if snapshot.malformed_values > 0 {
        warn!(
            sheet = %snapshot.sheet_name,
            count = snapshot.malformed_values,
            "non-numeric values in numeric columns were treated as missing"
        );
    }

    Ok(snapshot)
}

/// Build a snapshot from an already loaded sheet
pub fn snapshot_from_sheet(sheet: &Sheet, aliases: &ColumnAliases) -> Result<Snapshot> {
    let header_row = sheet.first_data_row().unwrap_or(0);
    let columns = bind_columns(sheet, header_row, aliases);

    if !columns.contains_key(&Field::Email) {
        return Err(CohortError::MissingColumn {
            sheet: sheet.name.clone(),
            column: aliases.for_field(Field::Email).join(" / "),
        });
    }

    let last_row = sheet.last_data_cell().map(|(row, _)| row).unwrap_or(0);
    let mut records = Vec::new();
    let mut malformed_values = 0;
    let mut first_data = None;
    let mut last_data = None;

    for row in (header_row + 1)..=last_row {
        let mut record = StudentRecord {
            row,
            ..Default::default()
        };
        let mut has_value = false;

        for (field, binding) in &columns {
            let Some(value) = sheet.value(row, binding.index) else {
                continue;
            };
            has_value = true;
            if field.is_numeric() {
                let number = value.as_number();
                if number.is_none() {
                    malformed_values += 1;
                }
                record.set_number(*field, number);
            } else {
                record.set_text(*field, value.as_text());
            }
        }

        if has_value {
            first_data.get_or_insert(row);
            last_data = Some(row);
            records.push(record);
        }
    }

    Ok(Snapshot {
        sheet_name: sheet.name.clone(),
        records,
        columns,
        data_rows: first_data.zip(last_data),
        malformed_values,
    })
}

fn bind_columns(
    sheet: &Sheet,
    header_row: u32,
    aliases: &ColumnAliases,
) -> BTreeMap<Field, ColumnBinding> {
    let headers: Vec<(u32, String)> = sheet
        .cells_in_row(header_row)
        .filter_map(|cell| cell.value.as_text().map(|text| (cell.col, text)))
        .collect();

    let mut columns = BTreeMap::new();
    for field in Field::ALL {
        let binding = aliases.for_field(field).iter().find_map(|alias| {
            headers
                .iter()
                .filter(|(_, header)| header.trim().eq_ignore_ascii_case(alias.trim()))
                .min_by_key(|(col, _)| *col)
                .map(|(col, header)| ColumnBinding {
                    index: *col,
                    header: header.clone(),
                })
        });
        if let Some(binding) = binding {
            columns.insert(field, binding);
        }
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::CellValue;

    fn sheet_from_rows(name: &str, rows: &[&[CellValue]]) -> Sheet {
        let mut sheet = Sheet::new(name);
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    sheet.set_value(r as u32, c as u32, value.clone());
                }
            }
        }
        sheet
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_binds_aliases_case_insensitively() {
        let sheet = sheet_from_rows(
            "July ",
            &[
                &[text(" email "), text("Login Count"), text("Avg Login Time")],
                &[text("a@x.com"), CellValue::Number(5.0), CellValue::Number(100.0)],
            ],
        );
        let snapshot = snapshot_from_sheet(&sheet, &ColumnAliases::default()).unwrap();
        assert_eq!(snapshot.column(Field::Email).unwrap().index, 0);
        assert_eq!(snapshot.column(Field::Sessions).unwrap().header, "Login Count");
        assert_eq!(snapshot.records[0].sessions, Some(5.0));
        assert_eq!(snapshot.records[0].avg_duration, Some(100.0));
        assert!(!snapshot.has(Field::Vwe));
        assert!(snapshot.missing_fields().contains(&Field::Vwe));
    }

    #[test]
    fn test_first_alias_wins() {
        let sheet = sheet_from_rows(
            "August",
            &[
                &[text("Email"), text("Login Count"), text("Web sessions")],
                &[text("a@x.com"), CellValue::Number(1.0), CellValue::Number(9.0)],
            ],
        );
        let snapshot = snapshot_from_sheet(&sheet, &ColumnAliases::default()).unwrap();
        assert_eq!(snapshot.column(Field::Sessions).unwrap().header, "Web sessions");
        assert_eq!(snapshot.records[0].sessions, Some(9.0));
    }

    #[test]
    fn test_missing_email_column_is_fatal() {
        let sheet = sheet_from_rows("August", &[&[text("Name")], &[text("Ann")]]);
        let err = snapshot_from_sheet(&sheet, &ColumnAliases::default()).unwrap_err();
        assert!(matches!(err, CohortError::MissingColumn { .. }));
    }

    #[test]
    fn test_malformed_numbers_become_missing() {
        let sheet = sheet_from_rows(
            "August",
            &[
                &[text("Email"), text("Virtual Work Experience")],
                &[text("a@x.com"), text("two")],
                &[text("b@x.com"), text("3")],
                &[CellValue::Empty, CellValue::Empty],
                &[text("c@x.com"), CellValue::Empty],
            ],
        );
        let snapshot = snapshot_from_sheet(&sheet, &ColumnAliases::default()).unwrap();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.records[0].vwe, None);
        assert_eq!(snapshot.records[1].vwe, Some(3.0));
        assert_eq!(snapshot.records[2].vwe, None);
        assert_eq!(snapshot.malformed_values, 1);
        assert_eq!(snapshot.data_rows, Some((1, 4)));
    }

    #[test]
    fn test_email_key_normalization() {
        let record = StudentRecord {
            email: Some("  A@X.com ".into()),
            ..Default::default()
        };
        assert_eq!(record.email_key().as_deref(), Some("a@x.com"));
        let blank = StudentRecord {
            email: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(blank.email_key(), None);
    }
}
