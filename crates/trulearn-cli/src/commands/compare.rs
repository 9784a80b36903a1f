//! The `trulearn compare` command.

use std::path::PathBuf;

use anyhow::Result;

use trulearn_core::report::AttemptReport;

use super::OutputFormat;

pub fn execute(
    baseline_path: PathBuf,
    current_path: PathBuf,
    threshold: u32,
    fail_on_regression: bool,
    format: OutputFormat,
) -> Result<()> {
    let baseline = AttemptReport::load_json(&baseline_path)?;
    let current = AttemptReport::load_json(&current_path)?;

    let report = current.compare(&baseline, threshold);

    match format {
        OutputFormat::Markdown => {
            println!("{}", report.to_markdown());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!(
                "Comparison: {} regressions, {} improvements, {} unchanged",
                report.regressions.len(),
                report.improvements.len(),
                report.unchanged
            );

            if !report.regressions.is_empty() {
                println!("\nRegressions:");
                for r in &report.regressions {
                    println!(
                        "  {} {}% -> {}% ({:+}), next difficulty {}",
                        r.concept, r.baseline_pct, r.current_pct, r.delta, r.current_difficulty
                    );
                }
            }

            if !report.improvements.is_empty() {
                println!("\nImprovements:");
                for i in &report.improvements {
                    println!(
                        "  {} {}% -> {}% ({:+}), next difficulty {}",
                        i.concept, i.baseline_pct, i.current_pct, i.delta, i.current_difficulty
                    );
                }
            }

            if !report.new_concepts.is_empty() {
                println!("\nNew concept(s): {}", report.new_concepts.join(", "));
            }
            if !report.dropped_concepts.is_empty() {
                println!("Not attempted: {}", report.dropped_concepts.join(", "));
            }
        }
    }

    if fail_on_regression && report.has_regressions() {
        std::process::exit(1);
    }

    Ok(())
}
