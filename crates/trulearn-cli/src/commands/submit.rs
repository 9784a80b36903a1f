//! The `trulearn submit` command.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use trulearn_client::{create_backend, load_config_from};
use trulearn_core::model::{Evaluation, QuestionOutcome};
use trulearn_core::parser;
use trulearn_core::report::AttemptReport;
use trulearn_core::session::{AssessmentSession, CancelToken, ProgressReporter, SessionConfig};

use super::OutputFormat;

/// Console progress reporter.
struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_batch_start(&self, total: usize) {
        eprintln!("Submitting {total} answer(s)...");
    }

    fn on_answer_complete(&self, outcome: &QuestionOutcome, completed: usize, total: usize) {
        let verdict = match outcome.evaluation() {
            Evaluation::MultipleChoice { is_correct: true } => "correct".to_string(),
            Evaluation::MultipleChoice { is_correct: false } => "incorrect".to_string(),
            Evaluation::OpenEnded { detection } => format!(
                "{} ({:.0}% similar)",
                detection.detection_type,
                detection.confidence_score * 100.0
            ),
        };
        eprintln!(
            "  [{completed}/{total}] Q{} ({}): {verdict}",
            outcome.question.id, outcome.question.concept
        );
    }

    fn on_answer_error(&self, question_id: u64, error: &str) {
        eprintln!("  ERROR: Q{question_id}: {error}");
    }

    fn on_batch_complete(&self, completed: usize, total: usize, elapsed: Duration) {
        eprintln!(
            "\nEvaluated {completed}/{total} answer(s) ({:.1}s)",
            elapsed.as_secs_f64()
        );
    }
}

pub async fn execute(
    questions_path: PathBuf,
    answers_path: PathBuf,
    parallelism: Option<usize>,
    output: Option<PathBuf>,
    format: OutputFormat,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let parallelism = parallelism.unwrap_or(config.parallelism);
    anyhow::ensure!(parallelism >= 1, "parallelism must be at least 1");

    let questions = parser::parse_question_set(&questions_path)?;
    for w in parser::validate_question_set(&questions) {
        let prefix = w
            .question_id
            .map(|id| format!("[Q{id}] "))
            .unwrap_or_default();
        eprintln!("Warning: {prefix}{}", w.message);
    }

    let sheet = parser::parse_answer_sheet(&answers_path)?;
    let submissions = parser::build_submissions(&questions, &sheet)?;

    let backend = create_backend(&config.service)?;
    let session = AssessmentSession::new(
        backend.detector.clone(),
        SessionConfig {
            student_id: sheet.student_id.unwrap_or(config.student_id),
            parallelism,
            reference_pdf: sheet.reference_pdf.clone(),
        },
    );

    let (handle, cancel) = CancelToken::pair();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling; keeping answers already evaluated");
            handle.cancel();
        }
    });

    let start = Instant::now();
    let result = session
        .submit(questions.len(), &submissions, &ConsoleReporter, &cancel)
        .await;
    ctrl_c.abort();
    let attempt = result.context("submission aborted, no results were saved")?;

    let report = AttemptReport::from_attempt(attempt, start.elapsed().as_millis() as u64);
    super::summarize::print_report(&report, format)?;

    let output = output.unwrap_or(config.output_dir);
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");
    let path = output.join(format!("attempt-{timestamp}.json"));
    report.save_json(&path)?;
    eprintln!("Results saved to: {}", path.display());

    Ok(())
}
