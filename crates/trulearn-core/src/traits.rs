//! Trait definitions for the remote question and detection services.
//!
//! These async traits are implemented by the `trulearn-client` crate. Callers
//! never retry or cache them: a failure surfaces directly to whoever asked.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{Detection, Difficulty, Question};

// ---------------------------------------------------------------------------
// Question source
// ---------------------------------------------------------------------------

/// Backend that generates questions for a concept.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Human-readable backend name (e.g. "http").
    fn name(&self) -> &str;

    /// Generate an ordered list of questions.
    async fn generate(&self, request: &GenerateQuestionsRequest)
        -> anyhow::Result<GeneratedQuestions>;
}

/// Body of `POST /api/questions/generate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateQuestionsRequest {
    pub concept: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_variations: Option<u32>,
    /// Extracted text of the uploaded reference material.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_text: Option<String>,
    /// Name of the uploaded reference file, so the service can look up its stored summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl GenerateQuestionsRequest {
    pub fn new(concept: impl Into<String>) -> Self {
        Self {
            concept: concept.into(),
            difficulty: None,
            num_variations: None,
            reference_text: None,
            filename: None,
        }
    }
}

/// Response of `POST /api/questions/generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedQuestions {
    pub questions: Vec<Question>,
    /// Seconds the service spent generating.
    #[serde(default)]
    pub generation_time: f64,
    #[serde(default)]
    pub model_used: String,
}

// ---------------------------------------------------------------------------
// Detection service
// ---------------------------------------------------------------------------

/// Backend that classifies an open-ended answer against the reference material.
#[async_trait]
pub trait DetectionService: Send + Sync {
    /// Human-readable backend name.
    fn name(&self) -> &str;

    /// Classify one answer. Each open-ended answer incurs exactly one call.
    async fn detect(&self, request: &DetectionRequest) -> anyhow::Result<Detection>;
}

/// Answer payload sent to `POST /api/answers` and `POST /api/answers/{id}/detect`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRequest {
    pub question_id: u64,
    pub student_id: u64,
    pub answer_text: String,
    pub response_time_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_pdf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept: Option<String>,
}

impl DetectionRequest {
    /// Build the payload for an answer to `question`.
    pub fn for_answer(
        question: &Question,
        student_id: u64,
        answer_text: &str,
        response_time_seconds: u64,
        reference_pdf: Option<String>,
    ) -> Self {
        Self {
            question_id: question.id,
            student_id,
            answer_text: answer_text.to_string(),
            response_time_seconds,
            reference_pdf,
            sample_answer: question.sample_answer().map(str::to_string),
            correct_answer: question.correct_answer().map(str::to_string),
            question_type: Some(question.kind.type_name().to_string()),
            concept: Some(question.concept.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Reference material
// ---------------------------------------------------------------------------

/// Backend that stores reference material for later generation and detection.
///
/// The returned `filename` is the key that `GenerateQuestionsRequest::filename`
/// and `DetectionRequest::reference_pdf` refer to.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    fn name(&self) -> &str;

    /// Upload a reference document from disk.
    async fn upload_reference(&self, path: &Path) -> anyhow::Result<ReferenceUpload>;
}

/// Response of `POST /api/upload-reference`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceUpload {
    /// Leading excerpt of the extracted text.
    #[serde(default)]
    pub text: String,
    /// Concept the service inferred from the document.
    #[serde(default)]
    pub concept: String,
    pub filename: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionKind;

    #[test]
    fn generate_request_omits_unset_fields() {
        let request = GenerateQuestionsRequest::new("Photosynthesis");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({"concept": "Photosynthesis"}));
    }

    #[test]
    fn detection_request_carries_question_context() {
        let question = Question {
            id: 7,
            question_text: "Why do leaves look green?".into(),
            concept: "Light absorption".into(),
            difficulty: Difficulty::Medium,
            variation_group_id: None,
            kind: QuestionKind::OpenEnded {
                sample_answer: Some("Chlorophyll reflects green light.".into()),
            },
        };
        let request =
            DetectionRequest::for_answer(&question, 1, "They reflect green", 42, None);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["question_id"], 7);
        assert_eq!(json["question_type"], "open_ended");
        assert_eq!(json["concept"], "Light absorption");
        assert_eq!(json["response_time_seconds"], 42);
        assert!(json.get("correct_answer").is_none());
        assert!(json.get("reference_pdf").is_none());
    }
}
