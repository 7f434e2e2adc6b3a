//! Excel/ODS file reader using calamine

use crate::error::{CohortError, Result};
use calamine::{Data, Range, Reader, Sheets, open_workbook_auto};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

pub mod catalog;
pub mod records;
pub mod workbook;

pub use catalog::{IndustryCatalog, load_catalog};
pub use records::{ColumnBinding, Field, Snapshot, StudentRecord, load_snapshot};
pub use workbook::{Cell, CellValue, Sheet, Workbook};

/// Read a workbook from a file path
pub fn read_workbook<P: AsRef<Path>>(path: P) -> Result<Workbook> {
    let path = path.as_ref();
    // Open workbook with calamine
    let mut excel: Sheets<_> =
        open_workbook_auto(path).map_err(|source| CohortError::WorkbookOpen {
            path: path.to_path_buf(),
            source,
        })?;

    let sheet_names = excel.sheet_names();
    let mut sheets = Vec::with_capacity(sheet_names.len());

    for sheet_name in &sheet_names {
        let range = excel
            .worksheet_range(sheet_name)
            .map_err(|source| CohortError::SheetRead {
                sheet: sheet_name.clone(),
                source,
            })?;
        let sheet = parse_sheet(sheet_name, &range);
        debug!(sheet = %sheet_name, cells = sheet.cells.len(), "sheet loaded");
        sheets.push(sheet);
    }

    Ok(Workbook {
        path: path.to_path_buf(),
        sheets,
    })
}

fn parse_sheet(name: &str, range: &Range<Data>) -> Sheet {
    let mut cells = HashMap::new();

    let Some(start) = range.start() else {
        return Sheet::new(name);
    };
    let (rows, cols) = range.get_size();

    for rel_row in 0..rows {
        for rel_col in 0..cols {
            if let Some(cell_data) = range.get((rel_row, rel_col)) {
                if matches!(cell_data, Data::Empty) {
                    continue;
                }
                let row = start.0 + rel_row as u32;
                let col = start.1 + rel_col as u32;
                cells.insert(
                    (row, col),
                    Cell {
                        row,
                        col,
                        value: parse_cell_value(cell_data),
                    },
                );
            }
        }
    }

    let used_range = if rows > 0 && cols > 0 {
        Some((start.0 + rows as u32, start.1 + cols as u32))
    } else {
        None
    };

    Sheet {
        name: name.to_string(),
        cells,
        used_range,
    }
}

fn parse_cell_value(data: &Data) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Boolean(*b),
        Data::Error(e) => CellValue::Error(format!("{:?}", e)),
        Data::Empty => CellValue::Empty,
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_open_error() {
        let err = read_workbook("does-not-exist.xlsx").unwrap_err();
        assert!(matches!(err, CohortError::WorkbookOpen { .. }));
        assert!(err.to_string().contains("does-not-exist.xlsx"));
    }

    #[test]
    fn test_parse_cell_value() {
        assert_eq!(parse_cell_value(&Data::Int(3)), CellValue::Number(3.0));
        assert_eq!(
            parse_cell_value(&Data::String("x".into())),
            CellValue::Text("x".into())
        );
        assert_eq!(parse_cell_value(&Data::Empty), CellValue::Empty);
    }

    #[test]
    fn test_parse_sheet_offsets_range_start() {
        let mut range: Range<Data> = Range::new((2, 1), (3, 2));
        range.set_value((2, 1), Data::String("Email".into()));
        range.set_value((3, 2), Data::Float(4.0));
        let sheet = parse_sheet("S", &range);
        assert_eq!(
            sheet.get_cell(2, 1).map(|c| &c.value),
            Some(&CellValue::Text("Email".into()))
        );
        assert_eq!(sheet.value(3, 2), Some(&CellValue::Number(4.0)));
        assert_eq!(sheet.cells.len(), 2);
        assert_eq!(sheet.used_range, Some((4, 3)));
    }
}
