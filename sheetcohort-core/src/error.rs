//! Error type shared by the loader, configuration and report writer

use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a run.
///
/// Missing optional columns and malformed values are not errors: they
/// degrade to "unavailable" markers in the computed tables.
#[derive(Error, Debug)]
pub enum CohortError {
    /// The input spreadsheet could not be opened.
    #[error("Failed to open workbook {path}: {source}")]
    WorkbookOpen {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    /// A sheet exists but its cells could not be decoded.
    #[error("Failed to read sheet '{sheet}': {source}")]
    SheetRead {
        sheet: String,
        #[source]
        source: calamine::Error,
    },

    /// A required sheet is absent from the workbook.
    #[error("Sheet '{sheet}' not found (available: {available})")]
    SheetNotFound { sheet: String, available: String },

    /// A column the pipeline cannot run without is absent.
    #[error("Sheet '{sheet}' has no '{column}' column")]
    MissingColumn { sheet: String, column: String },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The configuration file is not valid TOML for this schema.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The output workbook could not be produced.
    #[error("Failed to write workbook {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    /// A sheet could not be laid out in the output workbook.
    #[error("Failed to render sheet '{sheet}': {source}")]
    Render {
        sheet: String,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, CohortError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_not_found_lists_available() {
        let err = CohortError::SheetNotFound {
            sheet: "July".to_string(),
            available: "August, Sheet7".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Sheet 'July' not found (available: August, Sheet7)"
        );
    }

    #[test]
    fn test_missing_column_message() {
        let err = CohortError::MissingColumn {
            sheet: "August".to_string(),
            column: "Email".to_string(),
        };
        assert_eq!(err.to_string(), "Sheet 'August' has no 'Email' column");
    }

    #[test]
    fn test_config_parse_from_toml() {
        let toml_err = toml::from_str::<toml::Value>("sheets = [").unwrap_err();
        let err: CohortError = toml_err.into();
        assert!(err.to_string().starts_with("Failed to parse configuration"));
    }
}
