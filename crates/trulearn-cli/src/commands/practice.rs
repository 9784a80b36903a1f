//! The `trulearn practice` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use trulearn_client::{create_backend, load_config_from};
use trulearn_core::practice::{generate_practice_round, plan_practice, PracticeOptions};
use trulearn_core::report::AttemptReport;

pub async fn execute(
    report_path: PathBuf,
    below: Option<u32>,
    reference: Option<PathBuf>,
    generate: bool,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let report = AttemptReport::load_json(&report_path)?;

    let options = PracticeOptions {
        num_variations: Some(config.num_variations),
        below_percentage: below,
        reference_text: super::read_reference(reference.as_deref())?,
        filename: None,
    };
    let plan = plan_practice(&report.concepts, &options);

    if plan.is_empty() {
        println!("Nothing to practice: every concept is at or above the target.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Concept", "Last score", "Next difficulty", "Questions"]);
    for request in &plan {
        let score = report
            .concepts
            .get(&request.concept)
            .map(|p| format!("{}%", p.correct_percentage))
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(&request.concept),
            Cell::new(score),
            Cell::new(
                request
                    .difficulty
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
            ),
            Cell::new(request.num_variations.unwrap_or_default()),
        ]);
    }
    println!("Practice plan:\n{table}");

    if !generate {
        return Ok(());
    }

    let backend = create_backend(&config.service)?;
    let questions = generate_practice_round(backend.questions.as_ref(), &plan).await?;

    let path = output.unwrap_or_else(|| {
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");
        config.output_dir.join(format!("practice-{timestamp}.json"))
    });
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&questions)?;
    std::fs::write(&path, json)
        .with_context(|| format!("failed to write practice set to {}", path.display()))?;
    println!(
        "\nGenerated {} practice question(s): {}",
        questions.len(),
        path.display()
    );

    Ok(())
}
