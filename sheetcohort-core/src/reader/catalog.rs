//! Industry code reference table

use super::workbook::{Sheet, Workbook};
use crate::config::CatalogLayout;
use crate::error::Result;
use std::collections::HashMap;
use tracing::{debug, info};

/// Integer code to canonical industry name, in reference-sheet order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndustryCatalog {
    entries: Vec<(u32, String)>,
    index: HashMap<u32, usize>,
}

impl IndustryCatalog {
    /// Build a catalog from `(code, name)` pairs; a repeated code renames
    /// the existing entry in place
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (u32, S)>,
        S: Into<String>,
    {
        let mut catalog = Self::default();
        for (code, name) in entries {
            catalog.insert(code, name.into());
        }
        catalog
    }

    /// Read the catalog from a reference sheet.
    ///
    /// Rows before `layout.skip_rows` are headers. Rows whose code is not a
    /// non-negative integer or whose name is blank are skipped.
    pub fn from_sheet(sheet: &Sheet, layout: &CatalogLayout) -> Self {
        let mut catalog = Self::default();
        let Some((last_row, _)) = sheet.last_data_cell() else {
            return catalog;
        };

        for row in layout.skip_rows..=last_row {
            let code = sheet
                .value(row, layout.code_column)
                .and_then(|v| v.as_number())
                .filter(|n| *n >= 0.0 && n.fract() == 0.0 && *n <= u32::MAX as f64);
            let name = sheet
                .value(row, layout.name_column)
                .and_then(|v| v.as_text())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());

            match (code, name) {
                (Some(code), Some(name)) => catalog.insert(code as u32, name),
                _ => debug!(sheet = %sheet.name, row, "skipping catalog row"),
            }
        }

        catalog
    }

    fn insert(&mut self, code: u32, name: String) {
        match self.index.get(&code) {
            Some(&i) => self.entries[i].1 = name,
            None => {
                self.index.insert(code, self.entries.len());
                self.entries.push((code, name));
            }
        }
    }

    /// Name for a code, if the catalog knows it
    pub fn name(&self, code: u32) -> Option<&str> {
        self.index.get(&code).map(|&i| self.entries[i].1.as_str())
    }

    pub fn contains(&self, code: u32) -> bool {
        self.index.contains_key(&code)
    }

    /// Names in declared order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, name)| name.as_str())
    }

    pub fn entries(&self) -> &[(u32, String)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Load the industry catalog from the configured reference sheet
pub fn load_catalog(workbook: &Workbook, layout: &CatalogLayout) -> Result<IndustryCatalog> {
    let sheet = workbook.require_sheet(&layout.sheet)?;
    let catalog = IndustryCatalog::from_sheet(sheet, layout);
    info!(sheet = %sheet.name, industries = catalog.len(), "industry catalog loaded");
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::CellValue;

    fn reference_sheet() -> Sheet {
        let mut sheet = Sheet::new("Sheet7");
        sheet.set_value(0, 1, CellValue::Text("Industry list".into()));
        sheet.set_value(1, 1, CellValue::Text("Number".into()));
        sheet.set_value(1, 2, CellValue::Text("Industry".into()));
        sheet.set_value(2, 1, CellValue::Number(1.0));
        sheet.set_value(2, 2, CellValue::Text("Accounting ".into()));
        sheet.set_value(3, 1, CellValue::Text("14".into()));
        sheet.set_value(3, 2, CellValue::Text("Engineering".into()));
        sheet.set_value(4, 1, CellValue::Number(15.0));
        sheet.set_value(5, 2, CellValue::Text("No code".into()));
        sheet.set_value(6, 1, CellValue::Number(2.5));
        sheet.set_value(6, 2, CellValue::Text("Fractional".into()));
        sheet
    }

    #[test]
    fn test_from_sheet_skips_headers_and_incomplete_rows() {
        let catalog = IndustryCatalog::from_sheet(&reference_sheet(), &CatalogLayout::default());
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.name(1), Some("Accounting"));
        assert_eq!(catalog.name(14), Some("Engineering"));
        assert!(!catalog.contains(15));
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["Accounting", "Engineering"]);
    }

    #[test]
    fn test_repeated_code_renames_in_place() {
        let catalog = IndustryCatalog::from_entries([(3, "Law"), (1, "Art"), (3, "Legal")]);
        assert_eq!(catalog.entries(), &[(3, "Legal".to_string()), (1, "Art".to_string())]);
    }

    #[test]
    fn test_load_catalog_requires_sheet() {
        let workbook = Workbook {
            path: "test.xlsx".into(),
            sheets: vec![Sheet::new("August")],
        };
        assert!(load_catalog(&workbook, &CatalogLayout::default()).is_err());
    }
}
