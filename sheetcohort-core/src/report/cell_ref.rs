//! A1-style references for formulas

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Cell reference (e.g., A1, B2), 0-based internally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellReference {
    pub row: u32,
    pub col: u32,
}

impl CellReference {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Convert to Excel-style reference (e.g., "A1")
    pub fn to_excel_ref(&self) -> String {
        format!("{}{}", col_to_letter(self.col), self.row + 1)
    }
}

impl fmt::Display for CellReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_excel_ref())
    }
}

/// Convert column number to letter (0 -> A, 1 -> B, etc.)
pub fn col_to_letter(mut col: u32) -> String {
    let mut result = String::new();
    loop {
        result.insert(0, (b'A' + (col % 26) as u8) as char);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    result
}

/// Sheet name as it must appear before `!` in a formula.
///
/// Plain identifiers stay bare. Names with other characters, a leading
/// digit, or that read as an A1 or R1C1 reference (`A1`, `XFD10`, `R2C3`)
/// are quoted.
pub fn quote_sheet(name: &str) -> String {
    static REFERENCE_LIKE: OnceLock<Regex> = OnceLock::new();
    let re = REFERENCE_LIKE
        .get_or_init(|| Regex::new(r"(?i)^([a-z]{1,3}\d+|r\d*c\d*|r|c)$").unwrap());

    let plain = name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    let leading_digit = name.starts_with(|c: char| c.is_ascii_digit());
    if plain && !name.is_empty() && !leading_digit && !re.is_match(name) {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

/// Column range on another sheet, e.g. `'July '!K2:K10`
pub fn column_range(sheet: &str, col: u32, first_row: u32, last_row: u32) -> String {
    format!(
        "{}!{}:{}",
        quote_sheet(sheet),
        CellReference::new(first_row, col),
        CellReference::new(last_row, col)
    )
}

/// Column range on the same sheet, e.g. `F2:F10`
pub fn local_range(col: u32, first_row: u32, last_row: u32) -> String {
    format!(
        "{}:{}",
        CellReference::new(first_row, col),
        CellReference::new(last_row, col)
    )
}
