//! Output formatters for comparison results

use anyhow::Result;
use colored::*;
use serde::Serialize;
use sheetcohort_core::ComparisonSummary;
use sheetcohort_core::analysis::MetricReport;
use sheetcohort_core::metrics::Descriptive;
use std::path::Path;

#[derive(Serialize)]
struct JsonReport<'a> {
    file: String,
    output: Option<String>,
    comparison: &'a ComparisonSummary,
}

/// Print the comparison overview and per-metric statistics
pub fn print_human(file_path: &Path, output: Option<&Path>, summary: &ComparisonSummary) {
    println!(
        "{}",
        format!(
            "Comparing: {} ({} → {})",
            file_path.display(),
            summary.previous_sheet,
            summary.current_sheet
        )
        .bold()
    );
    println!();

    println!("{}", "Overview:".bold().underline());
    println!(
        "  Unique emails in {}: {}",
        summary.previous_sheet, summary.previous_unique
    );
    println!(
        "  Unique emails in {}: {}",
        summary.current_sheet, summary.current_unique
    );
    println!(
        "  {} {}",
        "Existing users:".green().bold(),
        summary.existing_users
    );
    let duplicates = summary.previous_duplicates + summary.current_duplicates;
    if duplicates > 0 {
        println!("  {} {}", "Duplicate rows ignored:".yellow().bold(), duplicates);
    }
    if summary.malformed_values > 0 {
        println!(
            "  {} {}",
            "Malformed numeric values:".yellow().bold(),
            summary.malformed_values
        );
    }
    println!();

    for report in &summary.metrics {
        print_metric(report, &summary.previous_sheet, &summary.current_sheet);
    }

    match output {
        Some(path) => println!("{} {}", "✓ Report written:".green().bold(), path.display()),
        None => println!("{}", "No output file given; nothing written".bright_black()),
    }
}

fn print_metric(report: &MetricReport, previous: &str, current: &str) {
    println!("{} {}", "Metric:".bold(), report.metric.label().cyan().bold());
    if let Some(reason) = &report.unavailable {
        println!("  {} {}", "N/A".yellow().bold(), reason);
        println!();
        return;
    }

    let summary = &report.summary;
    println!("  Average {}: {}", previous, mean(summary.previous.as_ref()));
    println!("  Average {}: {}", current, mean(summary.current.as_ref()));
    match &summary.delta {
        Some(delta) => println!(
            "  Change: avg {:.2}, median {:.2}, min {:.2}, max {:.2}",
            delta.mean, delta.median, delta.min, delta.max
        ),
        None => println!("  Change: {}", "N/A".yellow()),
    }

    let directions = &summary.directions;
    println!(
        "  {} {}  {} {}  {} {}  {} {}",
        "↑".green().bold(),
        directions.increased,
        "↓".red().bold(),
        directions.decreased,
        "=".blue().bold(),
        directions.unchanged,
        "n/a".bright_black(),
        directions.unavailable
    );
    println!();
}

fn mean(stats: Option<&Descriptive>) -> String {
    stats
        .map(|d| format!("{:.2}", d.mean))
        .unwrap_or_else(|| "N/A".to_string())
}

/// Print the comparison summary in JSON format
pub fn print_json(
    file_path: &Path,
    output: Option<&Path>,
    summary: &ComparisonSummary,
) -> Result<()> {
    let report = JsonReport {
        file: file_path.display().to_string(),
        output: output.map(|p| p.display().to_string()),
        comparison: summary,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
