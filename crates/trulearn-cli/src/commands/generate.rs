//! The `trulearn generate` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use trulearn_client::{create_backend, load_config_from};
use trulearn_core::model::Difficulty;
use trulearn_core::traits::GenerateQuestionsRequest;

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    concept: String,
    difficulty: Option<Difficulty>,
    num_variations: Option<u32>,
    reference: Option<PathBuf>,
    filename: Option<String>,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    anyhow::ensure!(!concept.trim().is_empty(), "concept must not be empty");

    let config = load_config_from(config_path.as_deref())?;
    let backend = create_backend(&config.service)?;

    let request = GenerateQuestionsRequest {
        concept,
        difficulty,
        num_variations: Some(num_variations.unwrap_or(config.num_variations)),
        reference_text: super::read_reference(reference.as_deref())?,
        filename,
    };

    let generated = backend
        .questions
        .generate(&request)
        .await
        .with_context(|| format!("failed to generate questions for '{}'", request.concept))?;

    eprintln!(
        "Generated {} question(s) for '{}' with {} ({:.1}s)",
        generated.questions.len(),
        request.concept,
        generated.model_used,
        generated.generation_time
    );

    let json = serde_json::to_string_pretty(&generated)?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, json)
                .with_context(|| format!("failed to write questions to {}", path.display()))?;
            eprintln!("Questions saved to: {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}
