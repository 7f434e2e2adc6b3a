//! Workbook data structures

use crate::error::{CohortError, Result};
use std::collections::HashMap;
use std::path::PathBuf;

/// Represents a complete workbook
#[derive(Debug, Clone)]
pub struct Workbook {
    pub path: PathBuf,
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// Get a sheet by name.
    ///
    /// Exact matches win; otherwise names are compared with surrounding
    /// whitespace removed, so `"July"` finds a sheet exported as `"July "`.
    pub fn get_sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .or_else(|| self.sheets.iter().find(|s| s.name.trim() == name.trim()))
    }

    /// Get a sheet by name or fail with the list of available sheets
    pub fn require_sheet(&self, name: &str) -> Result<&Sheet> {
        self.get_sheet(name)
            .ok_or_else(|| CohortError::SheetNotFound {
                sheet: name.to_string(),
                available: self
                    .sheet_names()
                    .iter()
                    .map(|n| format!("'{}'", n))
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    /// Get all sheet names
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Represents a worksheet
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub cells: HashMap<(u32, u32), Cell>,
    pub used_range: Option<(u32, u32)>, // (rows, cols)
}

impl Sheet {
    /// Create an empty sheet
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: HashMap::new(),
            used_range: None,
        }
    }

    /// Get a cell at the given position
    pub fn get_cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    /// Get the value at the given position, if the cell holds one
    pub fn value(&self, row: u32, col: u32) -> Option<&CellValue> {
        self.get_cell(row, col)
            .map(|c| &c.value)
            .filter(|v| !v.is_blank())
    }

    /// Get all cells with values
    pub fn all_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    /// Get cells in a specific row
    pub fn cells_in_row(&self, row: u32) -> impl Iterator<Item = &Cell> {
        self.cells.values().filter(move |c| c.row == row)
    }

    /// First row holding a non-blank cell
    pub fn first_data_row(&self) -> Option<u32> {
        self.cells
            .values()
            .filter(|c| !c.value.is_blank())
            .map(|c| c.row)
            .min()
    }

    /// Get the last cell with actual data (bottom-right corner of data range)
    pub fn last_data_cell(&self) -> Option<(u32, u32)> {
        let non_empty_cells: Vec<_> = self
            .cells
            .values()
            .filter(|c| !c.value.is_blank())
            .collect();

        if non_empty_cells.is_empty() {
            return None;
        }

        // Find the maximum row and maximum column independently
        let max_row = non_empty_cells.iter().map(|c| c.row).max()?;
        let max_col = non_empty_cells.iter().map(|c| c.col).max()?;

        Some((max_row, max_col))
    }

    /// Insert a value, keeping `used_range` in step
    pub fn set_value(&mut self, row: u32, col: u32, value: CellValue) {
        let (rows, cols) = self.used_range.unwrap_or((0, 0));
        self.used_range = Some((rows.max(row + 1), cols.max(col + 1)));
        self.cells.insert((row, col), Cell { row, col, value });
    }
}

/// Represents a single cell
#[derive(Debug, Clone)]
pub struct Cell {
    pub row: u32,
    pub col: u32,
    pub value: CellValue,
}

/// Cell value types
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(String),
}

impl CellValue {
    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Empty, or text made only of whitespace
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Check if the cell contains an error
    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error(_))
    }

    /// Numeric reading of the cell.
    ///
    /// Text is accepted when it parses as a number after trimming; error
    /// cells, booleans and free text yield `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if n.is_finite() => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Textual reading of the cell, `None` when blank.
    ///
    /// Integral numbers render without a fractional part so that a year
    /// stored as `1.0` reads as `"1"`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) if s.trim().is_empty() => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) => Some(format_number(*n)),
            CellValue::Boolean(b) => Some(b.to_string()),
            CellValue::Error(e) => Some(e.clone()),
        }
    }
}

/// Render a number the way a spreadsheet shows it in a general cell
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workbook_with(names: &[&str]) -> Workbook {
        Workbook {
            path: PathBuf::from("test.xlsx"),
            sheets: names.iter().map(|n| Sheet::new(*n)).collect(),
        }
    }

    #[test]
    fn test_get_sheet_trims_names() {
        let workbook = workbook_with(&["July ", "August"]);
        assert_eq!(workbook.get_sheet("July").unwrap().name, "July ");
        assert_eq!(workbook.get_sheet("August").unwrap().name, "August");
        assert!(workbook.get_sheet("September").is_none());
    }

    #[test]
    fn test_get_sheet_prefers_exact_match() {
        let workbook = workbook_with(&["Data ", "Data"]);
        assert_eq!(workbook.get_sheet("Data").unwrap().name, "Data");
    }

    #[test]
    fn test_require_sheet_reports_available() {
        let workbook = workbook_with(&["July ", "August"]);
        let err = workbook.require_sheet("Sheet7").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Sheet7"));
        assert!(msg.contains("'July ', 'August'"));
    }

    #[test]
    fn test_cell_value_readings() {
        assert_eq!(CellValue::Number(5.0).as_number(), Some(5.0));
        assert_eq!(CellValue::Text(" 12 ".into()).as_number(), Some(12.0));
        assert_eq!(CellValue::Text("two".into()).as_number(), None);
        assert_eq!(CellValue::Boolean(true).as_number(), None);
        assert_eq!(CellValue::Number(1.0).as_text().as_deref(), Some("1"));
        assert_eq!(CellValue::Number(1.5).as_text().as_deref(), Some("1.5"));
        assert_eq!(CellValue::Text("   ".into()).as_text(), None);
        assert!(CellValue::Text("  ".into()).is_blank());
    }

    #[test]
    fn test_data_bounds() {
        let mut sheet = Sheet::new("S");
        assert_eq!(sheet.last_data_cell(), None);
        sheet.set_value(2, 1, CellValue::Text("header".into()));
        sheet.set_value(5, 3, CellValue::Number(1.0));
        sheet.set_value(7, 0, CellValue::Text(" ".into()));
        assert_eq!(sheet.first_data_row(), Some(2));
        assert_eq!(sheet.last_data_cell(), Some((5, 3)));
        assert_eq!(sheet.used_range, Some((8, 4)));
        assert!(sheet.value(7, 0).is_none());
    }
}
