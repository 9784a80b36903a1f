//! Question set and answer sheet loading.
//!
//! Question sets are JSON, either a bare array or a saved response from the
//! question service. Answer sheets are TOML and pair learner answers with
//! question ids.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{Question, QuestionKind};
use crate::session::AnswerSubmission;

#[derive(Deserialize)]
#[serde(untagged)]
enum QuestionFile {
    Bare(Vec<Question>),
    Wrapped { questions: Vec<Question> },
}

/// Parse a JSON question set file.
pub fn parse_question_set(path: &Path) -> Result<Vec<Question>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question set: {}", path.display()))?;

    parse_question_set_str(&content, path)
}

/// Parse question set JSON (useful for testing).
pub fn parse_question_set_str(content: &str, source_path: &Path) -> Result<Vec<Question>> {
    let parsed: QuestionFile = serde_json::from_str(content)
        .with_context(|| format!("failed to parse question set: {}", source_path.display()))?;
    Ok(match parsed {
        QuestionFile::Bare(questions) | QuestionFile::Wrapped { questions } => questions,
    })
}

/// A learner's answers to a question set.
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerSheet {
    #[serde(default)]
    pub student_id: Option<u64>,
    /// Uploaded reference file the answers should be compared against.
    #[serde(default)]
    pub reference_pdf: Option<String>,
    #[serde(default)]
    pub answers: Vec<SheetAnswer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetAnswer {
    pub question_id: u64,
    pub answer: String,
    #[serde(default)]
    pub response_time_secs: u64,
}

/// Parse a TOML answer sheet.
pub fn parse_answer_sheet(path: &Path) -> Result<AnswerSheet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read answer sheet: {}", path.display()))?;

    parse_answer_sheet_str(&content, path)
}

/// Parse answer sheet TOML (useful for testing).
pub fn parse_answer_sheet_str(content: &str, source_path: &Path) -> Result<AnswerSheet> {
    toml::from_str(content)
        .with_context(|| format!("failed to parse answer sheet: {}", source_path.display()))
}

/// Pair each answer with its question, in answer sheet order.
pub fn build_submissions(
    questions: &[Question],
    sheet: &AnswerSheet,
) -> Result<Vec<AnswerSubmission>> {
    let by_id: HashMap<u64, &Question> = questions.iter().map(|q| (q.id, q)).collect();
    let mut seen = HashSet::new();

    sheet
        .answers
        .iter()
        .map(|answer| -> Result<AnswerSubmission> {
            let question = by_id
                .get(&answer.question_id)
                .with_context(|| {
                    format!("answer refers to unknown question {}", answer.question_id)
                })?;
            anyhow::ensure!(
                seen.insert(answer.question_id),
                "question {} is answered more than once",
                answer.question_id
            );
            Ok(AnswerSubmission {
                question: (*question).clone(),
                answer_text: answer.answer.clone(),
                response_time_secs: answer.response_time_secs,
            })
        })
        .collect()
}

/// A validation warning for a question set.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub question_id: Option<u64>,
    pub message: String,
}

/// Validate a question set and return any warnings.
pub fn validate_question_set(questions: &[Question]) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if questions.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "question set has no questions".into(),
        });
    }

    let mut seen_ids = HashSet::new();
    for q in questions {
        if !seen_ids.insert(q.id) {
            warnings.push(ValidationWarning {
                question_id: Some(q.id),
                message: format!("duplicate question id: {}", q.id),
            });
        }

        if q.question_text.trim().is_empty() {
            warnings.push(ValidationWarning {
                question_id: Some(q.id),
                message: "question text is empty".into(),
            });
        }

        if q.concept.trim().is_empty() {
            warnings.push(ValidationWarning {
                question_id: Some(q.id),
                message: "concept is empty; the question will be grouped under \"\"".into(),
            });
        }

        if let QuestionKind::MultipleChoice {
            options,
            correct_answer,
        } = &q.kind
        {
            if options.len() < 2 {
                warnings.push(ValidationWarning {
                    question_id: Some(q.id),
                    message: format!("multiple-choice question has {} option(s)", options.len()),
                });
            }
            if !options.contains_key(correct_answer) {
                warnings.push(ValidationWarning {
                    question_id: Some(q.id),
                    message: format!("correct answer '{correct_answer}' is not one of the options"),
                });
            }
        }
    }

    warnings
}
