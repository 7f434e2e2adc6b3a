use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::*;
use serde::Serialize;
use sheetcohort_core::logging::init_logging;
use sheetcohort_core::metrics::{Breakdown, Descriptive};
use sheetcohort_core::{CohortConfig, Pipeline, SnapshotSummary};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sheetsummary")]
#[command(about = "Summary statistics and breakdowns for one activity snapshot")]
#[command(version)]
struct Cli {
    /// Path to the Excel/ODS export
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Output workbook; when omitted the summary is only printed
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

    /// Write only the summary sheet, without copying the source sheets
    #[arg(long)]
    report_only: bool,
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
    summary: &'a SnapshotSummary,
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
        .summarize(&workbook)
        .with_context(|| format!("Failed to summarize {}", cli.file.display()))?;

    if let Some(output) = &cli.output {
        pipeline
            .write(output, &workbook, &sheets, !cli.no_formulas, !cli.report_only)
            .with_context(|| format!("Failed to write report: {}", output.display()))?;
    }

    match cli.format {
        OutputFormat::Human => print_human(&cli.file, cli.output.as_deref(), &summary),
        OutputFormat::Json => print_json(&cli.file, cli.output.as_deref(), &summary)?,
    }

    Ok(())
}

fn average(stats: Option<&Descriptive>) -> String {
    stats
        .map(|d| format!("{:.2}", d.mean))
        .unwrap_or_else(|| "N/A".yellow().to_string())
}

fn print_breakdown(breakdown: &Breakdown) {
    println!("{}", breakdown.title.bold().underline());
    for bucket in &breakdown.buckets {
        println!(
            "  {:<40} {:>6} {:>8.2}%",
            bucket.label,
            bucket.count,
            breakdown.percent(bucket)
        );
    }
    println!("  {} {:>6}", format!("{:<40}", "Total").bold(), breakdown.total);
    println!();
}

fn print_human(file_path: &Path, output: Option<&Path>, summary: &SnapshotSummary) {
    println!(
        "{}",
        format!("Summary: {} ({})", file_path.display(), summary.sheet_name).bold()
    );
    println!();

    println!("{}", "Key Metrics:".bold().underline());
    println!("  Total students: {}", summary.total_students);
    println!("  Unique users: {}", summary.unique_users);
    match &summary.sessions {
        Some(sessions) => println!("  Total sessions: {}", sessions.sum),
        None => println!("  Total sessions: {}", "N/A".yellow()),
    }
    println!(
        "  Average session duration (s): {}",
        average(summary.avg_duration.as_ref())
    );
    println!(
        "  Average session duration (min): {}",
        summary
            .avg_duration
            .map(|d| format!("{:.2}", d.mean / 60.0))
            .unwrap_or_else(|| "N/A".yellow().to_string())
    );
    println!("  Average VWE modules: {}", average(summary.vwe.as_ref()));
    println!(
        "  Average industry modules: {}",
        average(summary.industry_modules.as_ref())
    );
    println!(
        "  Average engagement per session: {}",
        average(summary.engagement_per_session.as_ref())
    );
    if summary.malformed_values > 0 {
        println!(
            "  {} {}",
            "Malformed numeric values:".yellow().bold(),
            summary.malformed_values
        );
    }
    println!();

    for breakdown in summary.breakdowns() {
        print_breakdown(breakdown);
    }

    if !summary.missing_fields.is_empty() {
        println!("{}", "Missing columns:".yellow().bold());
        for field in &summary.missing_fields {
            println!("  - {}", field.label());
        }
        println!();
    }

    match output {
        Some(path) => println!("{} {}", "✓ Report written:".green().bold(), path.display()),
        None => println!("{}", "No output file given; nothing written".bright_black()),
    }
}

fn print_json(file_path: &Path, output: Option<&Path>, summary: &SnapshotSummary) -> Result<()> {
    let report = JsonReport {
        file: file_path.display().to_string(),
        output: output.map(|p| p.display().to_string()),
        summary,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
