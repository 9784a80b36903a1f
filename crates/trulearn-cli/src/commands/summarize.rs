//! The `trulearn summarize` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use trulearn_core::analysis::Verdict;
use trulearn_core::model::AttemptStatus;
use trulearn_core::report::AttemptReport;

use super::OutputFormat;

pub fn execute(report_path: PathBuf, format: OutputFormat) -> Result<()> {
    let report = AttemptReport::load_json(&report_path)?;
    print_report(&report, format)
}

/// Print an attempt report in the requested format.
pub(crate) fn print_report(report: &AttemptReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Markdown => println!("{}", report.to_markdown()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => print_text(report),
    }
    Ok(())
}

fn print_text(report: &AttemptReport) {
    let attempt = &report.attempt;
    println!(
        "Attempt {} (student {}, {} answered of {} questions)",
        attempt.id,
        attempt.student_id,
        attempt.outcomes.len(),
        attempt.total_questions
    );
    if attempt.status == AttemptStatus::Cancelled {
        println!("Submission was cancelled; showing the answers evaluated before it stopped.");
    }

    let Some(summary) = &report.summary else {
        println!("\nNo answers were evaluated.");
        return;
    };

    let label = match summary.verdict {
        Verdict::Success => "SUCCESS",
        Verdict::Warning => "WARNING",
        Verdict::Error => "ERROR",
    };
    println!("\n[{label}] {}", summary.message);

    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec![
        Cell::new("Multiple-choice accuracy"),
        Cell::new(format!(
            "{}% ({}/{})",
            summary.mc_accuracy_pct, summary.mc_correct, summary.mc_answered
        )),
    ]);
    table.add_row(vec![
        Cell::new("Understanding"),
        Cell::new(format!("{}%", summary.understanding_pct)),
    ]);
    table.add_row(vec![
        Cell::new("Memorization"),
        Cell::new(format!(
            "{}% ({}/{} written answers)",
            summary.memorization_pct, summary.memorized_count, summary.oe_answered
        )),
    ]);
    table.add_row(vec![
        Cell::new("Genuine / surface"),
        Cell::new(format!("{} / {}", summary.genuine_count, summary.surface_count)),
    ]);
    println!("\n{table}");

    let mut concepts = Table::new();
    concepts.set_header(vec!["Concept", "Correct", "Score", "Next difficulty"]);
    for perf in report.concepts.values() {
        concepts.add_row(vec![
            Cell::new(&perf.concept),
            Cell::new(format!("{}/{}", perf.correct_count, perf.total_questions)),
            Cell::new(format!("{}%", perf.correct_percentage)),
            Cell::new(perf.suggested_difficulty),
        ]);
    }
    println!("\n{concepts}");
}
