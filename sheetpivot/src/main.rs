use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::*;
use serde::Serialize;
use sheetcohort_core::logging::init_logging;
use sheetcohort_core::{CohortConfig, CrossTab, Pipeline, PivotSelection, PivotTables};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sheetpivot")]
#[command(about = "Industry and sessions pivot tables for one activity snapshot", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the Excel/ODS export
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Output workbook; when omitted the tables are only printed
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Which pivot tables to build
    #[arg(short, long, value_enum, default_value = "all")]
    table: TableChoice,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,

    /// Log level (debug, info, warning, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Write total cells as values instead of SUM formulas
    #[arg(long)]
    no_formulas: bool,

    /// Write only the pivot sheets, without copying the source sheets
    #[arg(long)]
    report_only: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum TableChoice {
    /// Industry preferences by faculty and year
    Industry,
    /// Sum of sessions by international status and year
    Sessions,
    /// Both tables
    All,
}

impl From<TableChoice> for PivotSelection {
    fn from(choice: TableChoice) -> Self {
        match choice {
            TableChoice::Industry => PivotSelection::Industry,
            TableChoice::Sessions => PivotSelection::Sessions,
            TableChoice::All => PivotSelection::All,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    file: String,
    output: Option<String>,
    tables: &'a PivotTables,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level).context("Failed to initialise logging")?;

    let config = CohortConfig::discover(cli.config.as_deref()).context("Invalid configuration")?;
    let pipeline = Pipeline::with_config(config);

    let workbook = pipeline
        .load(&cli.file)
        .with_context(|| format!("Failed to read file: {}", cli.file.display()))?;

    let (tables, sheets) = pipeline
        .pivot(&workbook, cli.table.into())
        .with_context(|| format!("Failed to build pivot tables for {}", cli.file.display()))?;

    if let Some(output) = &cli.output {
        pipeline
            .write(output, &workbook, &sheets, !cli.no_formulas, !cli.report_only)
            .with_context(|| format!("Failed to write report: {}", output.display()))?;
    }

    match cli.format {
        OutputFormat::Human => print_human(&cli.file, cli.output.as_deref(), &tables),
        OutputFormat::Json => {
            let report = JsonReport {
                file: cli.file.display().to_string(),
                output: cli.output.as_ref().map(|p| p.display().to_string()),
                tables: &tables,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn column_label(table: &CrossTab, index: usize) -> String {
    let column = &table.columns[index];
    match &column.group {
        Some(group) => format!("{} / {}", group, column.label),
        None => column.label.clone(),
    }
}

/// Print a table as one line per non-zero cell, grouped by row
fn print_table(table: &CrossTab) {
    println!("{}", table.title.bold().underline());
    for (r, row) in table.rows.iter().enumerate() {
        let total = table.row_total(r);
        println!("  {} {}", row.cyan().bold(), format!("({})", total).bright_black());
        for c in 0..table.columns.len() {
            let value = table.get(r, c);
            if value != 0.0 {
                println!("    {}: {}", column_label(table, c), value);
            }
        }
    }
    println!("  {} {}", "Grand Total:".bold(), table.grand_total());
    println!();
}

fn print_human(file_path: &Path, output: Option<&Path>, tables: &PivotTables) {
    println!(
        "{}",
        format!("Pivot: {} ({})", file_path.display(), tables.sheet_name).bold()
    );
    println!();

    for table in [&tables.industry, &tables.sessions].into_iter().flatten() {
        print_table(table);
    }

    match output {
        Some(path) => println!("{} {}", "✓ Report written:".green().bold(), path.display()),
        None => println!("{}", "No output file given; nothing written".bright_black()),
    }
}
