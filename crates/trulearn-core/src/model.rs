//! Core data model types for TruLearn.
//!
//! Questions are a tagged variant (multiple-choice vs open-ended) so the
//! mutually exclusive fields of each kind can never be mixed, and an answered
//! question carries an evaluation whose kind is checked against the question.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::OutcomeError;

/// Question difficulty, also used as the suggested level for adaptive practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Difficulty for the next round given a concept's correct percentage.
    pub fn from_percentage(correct_percentage: u32) -> Self {
        if correct_percentage >= 80 {
            Difficulty::Hard
        } else if correct_percentage >= 50 {
            Difficulty::Medium
        } else {
            Difficulty::Easy
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// A generated question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Identifier assigned by the question service.
    pub id: u64,
    /// The question prompt shown to the learner.
    #[serde(alias = "question")]
    pub question_text: String,
    /// Concept the question exercises; the key for per-concept analysis.
    pub concept: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: Difficulty,
    /// Groups rephrasings of the same underlying question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation_group_id: Option<String>,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

fn default_difficulty() -> Difficulty {
    Difficulty::Medium
}

/// The two supported question shapes, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice {
        /// Option letter → option text.
        options: BTreeMap<String, String>,
        /// The letter of the correct option.
        correct_answer: String,
    },
    OpenEnded {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sample_answer: Option<String>,
    },
}

impl QuestionKind {
    /// Wire name of this kind.
    pub fn type_name(&self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice { .. } => "multiple_choice",
            QuestionKind::OpenEnded { .. } => "open_ended",
        }
    }
}

impl Question {
    pub fn is_multiple_choice(&self) -> bool {
        matches!(self.kind, QuestionKind::MultipleChoice { .. })
    }

    /// The stored correct option, for multiple-choice questions.
    pub fn correct_answer(&self) -> Option<&str> {
        match &self.kind {
            QuestionKind::MultipleChoice { correct_answer, .. } => Some(correct_answer),
            QuestionKind::OpenEnded { .. } => None,
        }
    }

    /// The reference answer, for open-ended questions.
    pub fn sample_answer(&self) -> Option<&str> {
        match &self.kind {
            QuestionKind::OpenEnded { sample_answer } => sample_answer.as_deref(),
            QuestionKind::MultipleChoice { .. } => None,
        }
    }
}

/// Classification of an open-ended answer relative to the reference material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionType {
    Genuine,
    Surface,
    Memorization,
    Behavioral,
}

impl DetectionType {
    /// `memorization` and `behavioral` both count as memorized answers.
    pub fn is_memorization(self) -> bool {
        matches!(self, DetectionType::Memorization | DetectionType::Behavioral)
    }
}

impl fmt::Display for DetectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionType::Genuine => write!(f, "genuine"),
            DetectionType::Surface => write!(f, "surface"),
            DetectionType::Memorization => write!(f, "memorization"),
            DetectionType::Behavioral => write!(f, "behavioral"),
        }
    }
}

impl FromStr for DetectionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "genuine" => Ok(DetectionType::Genuine),
            "surface" => Ok(DetectionType::Surface),
            "memorization" => Ok(DetectionType::Memorization),
            "behavioral" => Ok(DetectionType::Behavioral),
            other => Err(format!("unknown detection type: {other}")),
        }
    }
}

/// Result of the remote detection service for one open-ended answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub detection_type: DetectionType,
    /// Similarity to the reference material in `[0, 1]`; higher is more suspect.
    pub confidence_score: f64,
    #[serde(default)]
    pub reason: String,
}

/// How an answered question was evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evaluation {
    MultipleChoice { is_correct: bool },
    OpenEnded { detection: Detection },
}

impl Evaluation {
    fn type_name(&self) -> &'static str {
        match self {
            Evaluation::MultipleChoice { .. } => "multiple_choice",
            Evaluation::OpenEnded { .. } => "open_ended",
        }
    }
}

/// One answered question within an attempt.
///
/// The evaluation always matches the question's kind: construct through
/// [`QuestionOutcome::graded`] / [`QuestionOutcome::detected`], or deserialize,
/// which runs the same check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawOutcome")]
pub struct QuestionOutcome {
    pub question: Question,
    pub answer_text: String,
    pub response_time_secs: u64,
    evaluation: Evaluation,
}

#[derive(Deserialize)]
struct RawOutcome {
    question: Question,
    answer_text: String,
    #[serde(default)]
    response_time_secs: u64,
    evaluation: Evaluation,
}

impl TryFrom<RawOutcome> for QuestionOutcome {
    type Error = OutcomeError;

    fn try_from(raw: RawOutcome) -> Result<Self, Self::Error> {
        QuestionOutcome::new(
            raw.question,
            raw.answer_text,
            raw.response_time_secs,
            raw.evaluation,
        )
    }
}

impl QuestionOutcome {
    /// Build an outcome, checking that the evaluation matches the question kind
    /// and that any detection confidence lies in `[0, 1]`.
    pub fn new(
        question: Question,
        answer_text: String,
        response_time_secs: u64,
        evaluation: Evaluation,
    ) -> Result<Self, OutcomeError> {
        if question.kind.type_name() != evaluation.type_name() {
            return Err(OutcomeError::KindMismatch {
                question_id: question.id,
                expected: question.kind.type_name(),
                found: evaluation.type_name(),
            });
        }
        if let Evaluation::OpenEnded { detection } = &evaluation {
            if !(0.0..=1.0).contains(&detection.confidence_score) {
                return Err(OutcomeError::ConfidenceOutOfRange {
                    question_id: question.id,
                    score: detection.confidence_score,
                });
            }
        }
        Ok(Self {
            question,
            answer_text,
            response_time_secs,
            evaluation,
        })
    }

    /// Grade a multiple-choice answer by exact match against the correct option.
    pub fn graded(
        question: Question,
        answer_text: String,
        response_time_secs: u64,
    ) -> Result<Self, OutcomeError> {
        let is_correct = match question.correct_answer() {
            Some(correct) => answer_text == correct,
            None => {
                return Err(OutcomeError::KindMismatch {
                    question_id: question.id,
                    expected: question.kind.type_name(),
                    found: "multiple_choice",
                })
            }
        };
        Self::new(
            question,
            answer_text,
            response_time_secs,
            Evaluation::MultipleChoice { is_correct },
        )
    }

    /// Attach a remote detection to an open-ended answer.
    pub fn detected(
        question: Question,
        answer_text: String,
        response_time_secs: u64,
        detection: Detection,
    ) -> Result<Self, OutcomeError> {
        Self::new(
            question,
            answer_text,
            response_time_secs,
            Evaluation::OpenEnded { detection },
        )
    }

    pub fn evaluation(&self) -> &Evaluation {
        &self.evaluation
    }

    pub fn concept(&self) -> &str {
        &self.question.concept
    }

    /// Correctness of a multiple-choice answer; `None` for open-ended outcomes.
    pub fn is_correct(&self) -> Option<bool> {
        match &self.evaluation {
            Evaluation::MultipleChoice { is_correct } => Some(*is_correct),
            Evaluation::OpenEnded { .. } => None,
        }
    }

    /// Detection of an open-ended answer; `None` for multiple-choice outcomes.
    pub fn detection(&self) -> Option<&Detection> {
        match &self.evaluation {
            Evaluation::OpenEnded { detection } => Some(detection),
            Evaluation::MultipleChoice { .. } => None,
        }
    }
}

/// Whether the submission loop ran to the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    Complete,
    /// Stopped early; the outcomes collected so far are still valid.
    Cancelled,
}

/// One completed round of answering a batch of generated questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    pub id: Uuid,
    pub student_id: u64,
    pub started_at: DateTime<Utc>,
    /// Number of questions presented, answered or not.
    pub total_questions: usize,
    pub status: AttemptStatus,
    pub outcomes: Vec<QuestionOutcome>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mc_question(id: u64) -> Question {
        Question {
            id,
            question_text: "Which pigment absorbs light?".into(),
            concept: "Photosynthesis".into(),
            difficulty: Difficulty::Easy,
            variation_group_id: None,
            kind: QuestionKind::MultipleChoice {
                options: BTreeMap::from([
                    ("A".to_string(), "Chlorophyll".to_string()),
                    ("B".to_string(), "Keratin".to_string()),
                ]),
                correct_answer: "A".into(),
            },
        }
    }

    #[test]
    fn difficulty_display_and_parse() {
        assert_eq!(Difficulty::Hard.to_string(), "hard");
        assert_eq!("Medium".parse::<Difficulty>().unwrap(), Difficulty::Medium);
        assert_eq!(" easy ".parse::<Difficulty>().unwrap(), Difficulty::Easy);
        assert!("extreme".parse::<Difficulty>().is_err());
    }

    #[test]
    fn difficulty_thresholds() {
        assert_eq!(Difficulty::from_percentage(45), Difficulty::Easy);
        assert_eq!(Difficulty::from_percentage(49), Difficulty::Easy);
        assert_eq!(Difficulty::from_percentage(50), Difficulty::Medium);
        assert_eq!(Difficulty::from_percentage(79), Difficulty::Medium);
        assert_eq!(Difficulty::from_percentage(80), Difficulty::Hard);
        assert_eq!(Difficulty::from_percentage(100), Difficulty::Hard);
    }

    #[test]
    fn memorization_equivalent_types() {
        assert!(DetectionType::Memorization.is_memorization());
        assert!(DetectionType::Behavioral.is_memorization());
        assert!(!DetectionType::Surface.is_memorization());
        assert!(!DetectionType::Genuine.is_memorization());
    }

    #[test]
    fn parses_backend_question_shapes() {
        let json = serde_json::json!([
            {
                "id": 1,
                "type": "multiple_choice",
                "question": "Where does photosynthesis happen?",
                "concept": "Photosynthesis",
                "difficulty": "easy",
                "options": {
                    "A": "Mitochondria",
                    "B": "Chloroplast",
                    "C": "Nucleus",
                    "D": "Ribosome"
                },
                "correct_answer": "B"
            },
            {
                "id": 6,
                "type": "open_ended",
                "question_text": "Explain the light-dependent reactions.",
                "concept": "Photosynthesis",
                "sample_answer": "Light splits water and produces ATP and NADPH."
            }
        ]);
        let questions: Vec<Question> = serde_json::from_value(json).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].correct_answer(), Some("B"));
        assert!(questions[0].is_multiple_choice());
        assert_eq!(questions[1].difficulty, Difficulty::Medium);
        assert!(questions[1].sample_answer().unwrap().contains("ATP"));
    }

    #[test]
    fn graded_uses_exact_match() {
        let right = QuestionOutcome::graded(mc_question(1), "A".into(), 5).unwrap();
        assert_eq!(right.is_correct(), Some(true));
        assert!(right.detection().is_none());

        let lower = QuestionOutcome::graded(mc_question(1), "a".into(), 5).unwrap();
        assert_eq!(lower.is_correct(), Some(false));
    }

    #[test]
    fn detection_on_multiple_choice_is_rejected() {
        let err = QuestionOutcome::detected(
            mc_question(3),
            "A".into(),
            1,
            Detection {
                detection_type: DetectionType::Genuine,
                confidence_score: 0.1,
                reason: String::new(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, OutcomeError::KindMismatch { question_id: 3, .. }));
    }

    #[test]
    fn deserializing_mismatched_outcome_fails() {
        let json = serde_json::json!({
            "question": serde_json::to_value(mc_question(9)).unwrap(),
            "answer_text": "A",
            "evaluation": {
                "kind": "open_ended",
                "detection": {"detection_type": "genuine", "confidence_score": 0.2}
            }
        });
        let err = serde_json::from_value::<QuestionOutcome>(json).unwrap_err();
        assert!(err.to_string().contains("question 9"));
    }

    #[test]
    fn confidence_outside_unit_range_is_rejected() {
        let question = Question {
            id: 5,
            question_text: "Explain".into(),
            concept: "Energy".into(),
            difficulty: Difficulty::Medium,
            variation_group_id: None,
            kind: QuestionKind::OpenEnded {
                sample_answer: None,
            },
        };
        let json = serde_json::json!({
            "question": serde_json::to_value(&question).unwrap(),
            "answer_text": "It is stored in bonds",
            "evaluation": {
                "kind": "open_ended",
                "detection": {"detection_type": "surface", "confidence_score": -3.0}
            }
        });
        let err = serde_json::from_value::<QuestionOutcome>(json).unwrap_err();
        assert!(err.to_string().contains("outside [0, 1]"));

        let err = QuestionOutcome::detected(
            question,
            "It is stored in bonds".into(),
            4,
            Detection {
                detection_type: DetectionType::Genuine,
                confidence_score: 1.5,
                reason: String::new(),
            },
        )
        .unwrap_err();
        assert_eq!(
            err,
            OutcomeError::ConfidenceOutOfRange {
                question_id: 5,
                score: 1.5
            }
        );
    }
}
