use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use sheetcohort_core::logging::init_logging;
use sheetcohort_core::{CohortConfig, Pipeline};
use std::path::PathBuf;

mod formatter;

#[derive(Parser)]
#[command(name = "sheetcompare")]
#[command(about = "Compare existing users between two monthly activity snapshots", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the Excel/ODS export holding both snapshots
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Output workbook; when omitted the comparison is only printed
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,

    /// Log level (debug, info, warning, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Write computed values instead of formulas
    #[arg(long)]
    no_formulas: bool,

    /// Write only the report sheets, without copying the source sheets
    #[arg(long)]
    report_only: bool,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON output
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level).context("Failed to initialise logging")?;

    let config = CohortConfig::discover(cli.config.as_deref()).context("Invalid configuration")?;
    let pipeline = Pipeline::with_config(config);

    let workbook = pipeline
        .load(&cli.file)
        .with_context(|| format!("Failed to read file: {}", cli.file.display()))?;

    let (summary, sheets) = pipeline
        .compare(&workbook)
        .with_context(|| format!("Failed to compare snapshots in {}", cli.file.display()))?;

    if let Some(output) = &cli.output {
        pipeline
            .write(output, &workbook, &sheets, !cli.no_formulas, !cli.report_only)
            .with_context(|| format!("Failed to write report: {}", output.display()))?;
    }

    match cli.format {
        OutputFormat::Human => formatter::print_human(&cli.file, cli.output.as_deref(), &summary),
        OutputFormat::Json => formatter::print_json(&cli.file, cli.output.as_deref(), &summary)?,
    }

    Ok(())
}
