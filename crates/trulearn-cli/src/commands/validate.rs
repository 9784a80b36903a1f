//! The `trulearn validate` command.

use std::path::PathBuf;

use anyhow::Result;

use trulearn_core::parser;

pub fn execute(questions_path: PathBuf) -> Result<()> {
    let questions = parser::parse_question_set(&questions_path)?;

    let mc = questions.iter().filter(|q| q.is_multiple_choice()).count();
    println!(
        "Question set: {} ({} questions, {} multiple-choice, {} open-ended)",
        questions_path.display(),
        questions.len(),
        mc,
        questions.len() - mc
    );

    let warnings = parser::validate_question_set(&questions);
    for w in &warnings {
        let prefix = w
            .question_id
            .map(|id| format!("  [Q{id}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("Question set valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
