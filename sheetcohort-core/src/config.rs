//! Configuration system for sheet names, column aliases and vocabularies

use crate::error::{CohortError, Result};
use crate::metrics::breakdown::RangeBucket;
use crate::normalize::Vocabulary;
use crate::reader::Field;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// File picked up from the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "sheetcohort.toml";

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CohortConfig {
    #[serde(default)]
    pub sheets: SheetNames,
    #[serde(default)]
    pub columns: ColumnAliases,
    #[serde(default)]
    pub vocabulary: Vocabularies,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub pivot: PivotConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl CohortConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: CohortConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Resolve the configuration for a run.
    ///
    /// An explicit path must exist. Without one, `sheetcohort.toml` in the
    /// working directory is used when present, otherwise the defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => {
                info!(path = %path.display(), "loading configuration");
                Self::from_file(path)?
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    info!(path = %default_path.display(), "loading configuration");
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        for (key, name) in [
            ("sheets.previous", &self.sheets.previous),
            ("sheets.current", &self.sheets.current),
            ("sheets.catalog.sheet", &self.sheets.catalog.sheet),
            ("output.comparison_sheet", &self.output.comparison_sheet),
            ("output.comparison_summary_sheet", &self.output.comparison_summary_sheet),
            ("output.snapshot_summary_sheet", &self.output.snapshot_summary_sheet),
            ("output.industry_sheet", &self.output.industry_sheet),
            ("output.sessions_pivot_sheet", &self.output.sessions_pivot_sheet),
        ] {
            if name.trim().is_empty() {
                return Err(CohortError::Config(format!("'{}' must not be empty", key)));
            }
        }

        for field in Field::ALL {
            if self.columns.for_field(field).is_empty() {
                return Err(CohortError::Config(format!(
                    "no column aliases for the {} field",
                    field.label()
                )));
            }
        }

        for (key, vocabulary) in [
            ("faculty", &self.vocabulary.faculty),
            ("year", &self.vocabulary.year),
            ("international", &self.vocabulary.international),
        ] {
            validate_vocabulary(key, vocabulary)?;
        }

        for (key, buckets) in [
            ("summary.industry_module_ranges", &self.summary.industry_module_ranges),
            ("summary.engagement_ranges", &self.summary.engagement_ranges),
        ] {
            if buckets.is_empty() {
                return Err(CohortError::Config(format!("'{}' must not be empty", key)));
            }
            for bucket in buckets {
                if bucket.max.is_some_and(|max| max < bucket.min) {
                    return Err(CohortError::Config(format!(
                        "bucket '{}' in '{}' has max below min",
                        bucket.label, key
                    )));
                }
            }
        }

        let faculties: HashSet<String> = self.vocabulary.faculty.all_labels().into_iter().collect();
        for focus in &self.pivot.focus_faculties {
            if !faculties.contains(focus) {
                return Err(CohortError::Config(format!(
                    "focus faculty '{}' is not a faculty vocabulary label",
                    focus
                )));
            }
        }

        if self.output.max_column_width <= 0.0 {
            return Err(CohortError::Config(
                "'output.max_column_width' must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

fn validate_vocabulary(key: &str, vocabulary: &Vocabulary) -> Result<()> {
    if vocabulary.entries.is_empty() {
        return Err(CohortError::Config(format!(
            "vocabulary '{}' has no entries",
            key
        )));
    }
    let mut seen = HashSet::new();
    for label in vocabulary.all_labels() {
        if !seen.insert(label.clone()) {
            return Err(CohortError::Config(format!(
                "vocabulary '{}' repeats the label '{}'",
                key, label
            )));
        }
    }
    for entry in &vocabulary.entries {
        if entry.contains.is_empty() && entry.exact.is_empty() {
            return Err(CohortError::Config(format!(
                "vocabulary '{}' entry '{}' has no patterns",
                key, entry.label
            )));
        }
    }
    Ok(())
}

/// Names of the input sheets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetNames {
    /// Earlier snapshot of a comparison
    pub previous: String,
    /// Later snapshot of a comparison, and the sheet summarized on its own
    pub current: String,
    pub catalog: CatalogLayout,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            previous: "July".to_string(),
            current: "August".to_string(),
            catalog: CatalogLayout::default(),
        }
    }
}

/// Position of the industry reference table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogLayout {
    pub sheet: String,
    /// Header rows above the first code
    pub skip_rows: u32,
    /// 0-based column holding the integer code
    pub code_column: u32,
    /// 0-based column holding the industry name
    pub name_column: u32,
}

impl Default for CatalogLayout {
    fn default() -> Self {
        Self {
            sheet: "Sheet7".to_string(),
            skip_rows: 2,
            code_column: 1,
            name_column: 2,
        }
    }
}

/// Header aliases per field, tried in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnAliases {
    pub email: Vec<String>,
    pub display_name: Vec<String>,
    pub faculty: Vec<String>,
    pub year: Vec<String>,
    pub international: Vec<String>,
    pub sessions: Vec<String>,
    pub avg_duration: Vec<String>,
    pub vwe: Vec<String>,
    pub industries: Vec<String>,
    pub engagement_tags: Vec<String>,
}

impl ColumnAliases {
    pub fn for_field(&self, field: Field) -> &[String] {
        match field {
            Field::Email => &self.email,
            Field::DisplayName => &self.display_name,
            Field::Faculty => &self.faculty,
            Field::Year => &self.year,
            Field::International => &self.international,
            Field::Sessions => &self.sessions,
            Field::AvgDuration => &self.avg_duration,
            Field::Vwe => &self.vwe,
            Field::Industries => &self.industries,
            Field::EngagementTags => &self.engagement_tags,
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

impl Default for ColumnAliases {
    fn default() -> Self {
        Self {
            email: strings(&["Email"]),
            display_name: strings(&["First name", "Name"]),
            faculty: strings(&["Faculty"]),
            year: strings(&["Course Year", "Year"]),
            international: strings(&["International Status"]),
            sessions: strings(&["Web sessions", "Login Count"]),
            avg_duration: strings(&["Avg Login Time"]),
            vwe: strings(&["Virtual Work Experience"]),
            industries: strings(&["Industries"]),
            engagement_tags: strings(&["Person tag"]),
        }
    }
}

/// Canonical token sets for categorical fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabularies {
    pub faculty: Vocabulary,
    pub year: Vocabulary,
    pub international: Vocabulary,
}

impl Default for Vocabularies {
    fn default() -> Self {
        Self {
            faculty: Vocabulary::faculties(),
            year: Vocabulary::years(),
            international: Vocabulary::international_status(),
        }
    }
}

/// Bucket definitions for the single-snapshot summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Exact VWE module counts reported as their own bucket
    pub vwe_levels: Vec<u32>,
    pub industry_module_ranges: Vec<RangeBucket>,
    pub engagement_ranges: Vec<RangeBucket>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            vwe_levels: vec![1, 2, 3, 4],
            industry_module_ranges: vec![
                RangeBucket::new("1-3 Modules", 1.0, Some(3.0)),
                RangeBucket::new("4-6 Modules", 4.0, Some(6.0)),
                RangeBucket::new("7+ Modules", 7.0, None),
            ],
            engagement_ranges: vec![
                RangeBucket::new("0-2 Modules", 0.0, Some(2.0)),
                RangeBucket::new("3-5 Modules", 3.0, Some(5.0)),
                RangeBucket::new("6+ Modules", 6.0, None),
            ],
        }
    }
}

/// Pivot table settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PivotConfig {
    /// Faculties shown as column groups of the industry table
    pub focus_faculties: Vec<String>,
}

impl Default for PivotConfig {
    fn default() -> Self {
        Self {
            focus_faculties: strings(&[
                "Faculty of Engineering",
                "Faculty of Arts and Social Sciences",
            ]),
        }
    }
}

/// Output sheet names and layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub comparison_sheet: String,
    pub comparison_summary_sheet: String,
    pub snapshot_summary_sheet: String,
    pub industry_sheet: String,
    pub sessions_pivot_sheet: String,
    /// Upper bound for auto-sized column widths, in characters
    pub max_column_width: f64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            comparison_sheet: "July_August_Comparison".to_string(),
            comparison_summary_sheet: "Summary_With_Formulas".to_string(),
            snapshot_summary_sheet: "August_Summary".to_string(),
            industry_sheet: "Industry Preferences Table".to_string(),
            sessions_pivot_sheet: "Pivot Table".to_string(),
            max_column_width: 50.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: CohortConfig = toml::from_str("").unwrap();
        assert_eq!(config, CohortConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_override() {
        let config: CohortConfig = toml::from_str(
            r#"
            [sheets]
            previous = "June"

            [columns]
            sessions = ["Sessions"]

            [output]
            max_column_width = 25.0
            "#,
        )
        .unwrap();
        assert_eq!(config.sheets.previous, "June");
        assert_eq!(config.sheets.current, "August");
        assert_eq!(config.sheets.catalog.skip_rows, 2);
        assert_eq!(config.columns.for_field(Field::Sessions), ["Sessions"]);
        assert_eq!(config.columns.for_field(Field::Email), ["Email"]);
        assert_eq!(config.output.max_column_width, 25.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_custom_vocabulary() {
        let config: CohortConfig = toml::from_str(
            r#"
            [vocabulary.international]
            unrecognized_label = "Unlisted"

            [[vocabulary.international.entries]]
            label = "Local"
            exact = ["Domestic", "Local"]
            "#,
        )
        .unwrap();
        let vocabulary = &config.vocabulary.international;
        assert_eq!(vocabulary.canonical(Some("Local")), "Local");
        assert_eq!(vocabulary.canonical(Some("International")), "Unlisted");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let config = CohortConfig::default();
        assert!(config.validate().is_ok());

        let mut bad = config.clone();
        bad.sheets.previous = "  ".to_string();
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.columns.email.clear();
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.vocabulary.year.unrecognized_label = "1st Year".to_string();
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.pivot.focus_faculties.push("Faculty of Magic".to_string());
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.summary.engagement_ranges = vec![RangeBucket::new("bad", 5.0, Some(1.0))];
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_discover_explicit_missing_file() {
        let err = CohortConfig::discover(Some(Path::new("no-such-config.toml"))).unwrap_err();
        assert!(matches!(err, CohortError::Io(_)));
    }
}
