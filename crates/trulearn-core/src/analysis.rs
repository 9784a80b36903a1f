//! Answer aggregation and adaptive difficulty.
//!
//! Both operations are pure functions of an attempt's outcomes: they hold no
//! state and produce identical output for identical input.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{DetectionType, Difficulty, Evaluation, QuestionOutcome};

/// Surface-level answers below this similarity still count as adequate for
/// difficulty advancement.
pub const SURFACE_ADEQUATE_BELOW: f64 = 0.7;

/// `round(100 * part / whole)` with halves rounded up, or 0 when `whole` is 0.
pub fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((200 * part + whole) / (2 * whole)) as u32
}

/// Overall verdict severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Success,
    Warning,
    Error,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Success => write!(f, "success"),
            Verdict::Warning => write!(f, "warning"),
            Verdict::Error => write!(f, "error"),
        }
    }
}

/// Summary statistics and verdict for one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_answered: usize,
    pub total_questions: usize,
    pub mc_answered: usize,
    pub mc_correct: usize,
    pub mc_accuracy_pct: u32,
    pub oe_answered: usize,
    pub genuine_count: usize,
    pub surface_count: usize,
    pub memorized_count: usize,
    pub understanding_pct: u32,
    pub memorization_pct: u32,
    pub verdict: Verdict,
    pub message: String,
}

/// Summarize an attempt.
///
/// Returns `None` when nothing was answered. `total_questions` is the number
/// of questions presented and must be at least `outcomes.len()`.
pub fn summarize(outcomes: &[QuestionOutcome], total_questions: usize) -> Option<Summary> {
    debug_assert!(
        total_questions >= outcomes.len(),
        "attempt reports {total_questions} questions but {} outcomes",
        outcomes.len()
    );
    if outcomes.is_empty() {
        return None;
    }

    let mut mc_answered = 0;
    let mut mc_correct = 0;
    let mut oe_answered = 0;
    let mut genuine_count = 0;
    let mut surface_count = 0;
    let mut memorized_count = 0;

    for outcome in outcomes {
        match outcome.evaluation() {
            Evaluation::MultipleChoice { is_correct } => {
                mc_answered += 1;
                if *is_correct {
                    mc_correct += 1;
                }
            }
            Evaluation::OpenEnded { detection } => {
                oe_answered += 1;
                match detection.detection_type {
                    kind if kind.is_memorization() => memorized_count += 1,
                    DetectionType::Surface => surface_count += 1,
                    _ => genuine_count += 1,
                }
            }
        }
    }

    let mc_accuracy_pct = percentage(mc_correct, mc_answered);
    let understanding_pct = percentage(genuine_count, oe_answered);
    // Count of flagged answers, not a mean of similarity scores.
    let memorization_pct = percentage(memorized_count, oe_answered);

    let (verdict, message) = if oe_answered == 0 {
        multiple_choice_verdict(mc_accuracy_pct)
    } else if memorization_pct > 50 {
        (
            Verdict::Error,
            format!(
                "{memorization_pct}% of your written answers closely match the reference \
                 material. You are relying too heavily on memorization; try explaining each \
                 concept in your own words."
            ),
        )
    } else if genuine_count == oe_answered && (mc_answered == 0 || mc_accuracy_pct >= 80) {
        (
            Verdict::Success,
            "Your answers demonstrate genuine understanding of the material.".to_string(),
        )
    } else if surface_count > genuine_count {
        (
            Verdict::Warning,
            "Your answers show surface-level understanding. Go deeper into why each concept works, \
             not just what it is."
                .to_string(),
        )
    } else {
        (
            Verdict::Warning,
            "Good effort! Review the flagged questions to strengthen your understanding."
                .to_string(),
        )
    };

    Some(Summary {
        total_answered: outcomes.len(),
        total_questions,
        mc_answered,
        mc_correct,
        mc_accuracy_pct,
        oe_answered,
        genuine_count,
        surface_count,
        memorized_count,
        understanding_pct,
        memorization_pct,
        verdict,
        message,
    })
}

fn multiple_choice_verdict(accuracy: u32) -> (Verdict, String) {
    if accuracy >= 80 {
        (
            Verdict::Success,
            format!(
                "Excellent work! You answered {accuracy}% of the multiple-choice questions \
                 correctly."
            ),
        )
    } else if accuracy >= 60 {
        (
            Verdict::Warning,
            format!(
                "Good effort. You answered {accuracy}% correctly; review the concepts you missed."
            ),
        )
    } else {
        (
            Verdict::Error,
            format!(
                "You answered {accuracy}% correctly. Revisit the reference material before \
                 trying again."
            ),
        )
    }
}

/// Performance on one concept within an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptPerformance {
    pub concept: String,
    pub total_questions: usize,
    pub correct_count: usize,
    pub correct_percentage: u32,
    pub suggested_difficulty: Difficulty,
}

/// Whether an outcome counts toward advancing its concept's difficulty.
fn counts_as_correct(outcome: &QuestionOutcome) -> bool {
    match outcome.evaluation() {
        Evaluation::MultipleChoice { is_correct } => *is_correct,
        Evaluation::OpenEnded { detection } => match detection.detection_type {
            kind if kind.is_memorization() => false,
            DetectionType::Surface => detection.confidence_score < SURFACE_ADEQUATE_BELOW,
            _ => true,
        },
    }
}

/// Per-concept performance, keyed by concept name.
///
/// Every concept present in `outcomes` appears exactly once; concepts that
/// were never answered are absent.
pub fn analyze_by_concept(outcomes: &[QuestionOutcome]) -> BTreeMap<String, ConceptPerformance> {
    let mut tallies: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for outcome in outcomes {
        let (total, correct) = tallies.entry(outcome.concept()).or_default();
        *total += 1;
        if counts_as_correct(outcome) {
            *correct += 1;
        }
    }

    tallies
        .into_iter()
        .map(|(concept, (total, correct))| {
            let correct_percentage = percentage(correct, total);
            (
                concept.to_string(),
                ConceptPerformance {
                    concept: concept.to_string(),
                    total_questions: total,
                    correct_count: correct,
                    correct_percentage,
                    suggested_difficulty: Difficulty::from_percentage(correct_percentage),
                },
            )
        })
        .collect()
}
