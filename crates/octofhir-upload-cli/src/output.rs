use anyhow::Result;
use colored::Colorize;
use octofhir_upload::Summary;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::OutputFormat;

pub fn print_summary(summary: &Summary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summary)?);
        }
        OutputFormat::Table => print_summary_table(summary),
    }
    Ok(())
}

/// Progress lines go to stderr when stdout carries the JSON summary.
pub fn print_progress(format: OutputFormat, msg: &str) {
    if progress_to_stderr(format) {
        eprintln!("{msg}");
    } else {
        println!("{msg}");
    }
}

fn progress_to_stderr(format: OutputFormat) -> bool {
    matches!(format, OutputFormat::Json)
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

fn print_summary_table(summary: &Summary) {
    println!();
    if summary.reports.is_empty() {
        println!("No terminology resources were uploaded.");
        return;
    }

    let mut builder = Builder::default();
    builder.push_record(["Resource", "Kind", "Outcome", "Attempts", "File"]);
    for report in &summary.reports {
        builder.push_record([
            report.label.clone(),
            report.kind.to_string(),
            report.outcome.to_string(),
            report.attempts.to_string(),
            report.source_path.display().to_string(),
        ]);
    }
    println!("{}", builder.build().with(Style::rounded()));

    println!(
        "{}: {}  {}: {}  {}: {}",
        "Succeeded".green(),
        summary.succeeded,
        "Ignored".yellow(),
        summary.ignored,
        "Failed".red(),
        summary.failed
    );

    let with_issues: Vec<_> = summary
        .reports
        .iter()
        .filter(|r| !r.issues.is_empty())
        .collect();
    if !with_issues.is_empty() {
        println!();
        println!("{}", "Server issues (last attempt):".yellow());
        for report in with_issues {
            println!("  {}", report.label.cyan());
            for issue in &report.issues {
                let marker = if issue.is_error() {
                    "-!".red()
                } else {
                    "- ".yellow()
                };
                println!("    {marker} {issue}");
            }
        }
    }

    if !summary.invalid_expansions.is_empty() {
        println!();
        println!("{}", "ValueSets with incomplete expansions:".yellow());
        for invalid in &summary.invalid_expansions {
            let missing: Vec<&str> = invalid
                .audit
                .missing_code_systems
                .iter()
                .map(String::as_str)
                .collect();
            println!(
                "  {} ({} concept(s)) {}",
                invalid.label.cyan(),
                invalid.audit.contained_concept_count,
                if missing.is_empty() {
                    String::new()
                } else {
                    format!("missing: {}", missing.join(", "))
                }
            );
        }
    }

    if !summary.patches.is_empty() {
        println!();
        println!("{}", "Patches written:".cyan());
        for patch in &summary.patches {
            println!(
                "  #{:03} {} -> {} ({}){}",
                patch.sequence_number,
                patch.original_path.display(),
                patch.patch_file_path.display(),
                patch.modified_file_path.display(),
                if patch.is_final { " final" } else { "" }
            );
        }
    }

    if summary.all_succeeded() {
        print_success("All resources uploaded");
    }
}
