//! Mock backend for offline use and testing.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use trulearn_core::model::{Detection, DetectionType, Difficulty, Question, QuestionKind};
use trulearn_core::traits::{
    DetectionRequest, DetectionService, GenerateQuestionsRequest, GeneratedQuestions,
    QuestionSource, ReferenceStore, ReferenceUpload,
};

const DEFAULT_VARIATIONS: u32 = 3;
/// Characters of extracted text returned from an upload.
const UPLOAD_EXCERPT_CHARS: usize = 1000;

/// Classifies answers containing `contains` (case-insensitive) as `detection_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockRule {
    pub contains: String,
    pub detection_type: DetectionType,
    #[serde(default = "default_rule_confidence")]
    pub confidence_score: f64,
    #[serde(default)]
    pub reason: String,
}

fn default_rule_confidence() -> f64 {
    0.9
}

/// A deterministic stand-in for the TruLearn API.
///
/// Detection applies the first matching rule and otherwise reports a genuine
/// answer with low similarity. Generation returns a canned set alternating
/// multiple-choice and open-ended questions.
pub struct MockBackend {
    rules: Vec<MockRule>,
    generate_calls: AtomicU32,
    detect_calls: AtomicU32,
    last_generate: Mutex<Option<GenerateQuestionsRequest>>,
    last_detect: Mutex<Option<DetectionRequest>>,
}

impl MockBackend {
    pub fn new(rules: Vec<MockRule>) -> Self {
        Self {
            rules,
            generate_calls: AtomicU32::new(0),
            detect_calls: AtomicU32::new(0),
            last_generate: Mutex::new(None),
            last_detect: Mutex::new(None),
        }
    }

    /// Number of detection calls made.
    pub fn detect_count(&self) -> u32 {
        self.detect_calls.load(Ordering::Relaxed)
    }

    /// Number of generation calls made.
    pub fn generate_count(&self) -> u32 {
        self.generate_calls.load(Ordering::Relaxed)
    }

    pub fn last_detect_request(&self) -> Option<DetectionRequest> {
        self.last_detect
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn last_generate_request(&self) -> Option<GenerateQuestionsRequest> {
        self.last_generate
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn classify(&self, answer_text: &str) -> Detection {
        let answer = answer_text.to_lowercase();
        self.rules
            .iter()
            .find(|rule| answer.contains(&rule.contains.to_lowercase()))
            .map(|rule| Detection {
                detection_type: rule.detection_type,
                confidence_score: rule.confidence_score.clamp(0.0, 1.0),
                reason: rule.reason.clone(),
            })
            .unwrap_or_else(|| Detection {
                detection_type: DetectionType::Genuine,
                confidence_score: 0.2,
                reason: "Answer demonstrates genuine understanding".into(),
            })
    }
}

fn canned_question(id: u64, concept: &str, difficulty: Difficulty) -> Question {
    let group = format!("{}-{difficulty}", concept.to_lowercase().replace(' ', "-"));
    let kind = if id % 2 == 1 {
        QuestionKind::MultipleChoice {
            options: BTreeMap::from([
                ("A".to_string(), format!("The core idea behind {concept}")),
                ("B".to_string(), "An unrelated process".to_string()),
                ("C".to_string(), "A common misconception".to_string()),
                ("D".to_string(), "None of the above".to_string()),
            ]),
            correct_answer: "A".into(),
        }
    } else {
        QuestionKind::OpenEnded {
            sample_answer: Some(format!(
                "{concept} is best explained by relating its parts to the whole."
            )),
        }
    };
    let question_text = match kind {
        QuestionKind::MultipleChoice { .. } => {
            format!("Which statement best describes {concept}? (variation {id})")
        }
        QuestionKind::OpenEnded { .. } => {
            format!("Explain {concept} in your own words. (variation {id})")
        }
    };
    Question {
        id,
        question_text,
        concept: concept.to_string(),
        difficulty,
        variation_group_id: Some(group),
        kind,
    }
}

#[async_trait]
impl QuestionSource for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        request: &GenerateQuestionsRequest,
    ) -> anyhow::Result<GeneratedQuestions> {
        self.generate_calls.fetch_add(1, Ordering::Relaxed);
        *self.last_generate.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());

        let difficulty = request.difficulty.unwrap_or(Difficulty::Medium);
        let count = request.num_variations.unwrap_or(DEFAULT_VARIATIONS) as u64;
        let questions = (1..=count)
            .map(|id| canned_question(id, &request.concept, difficulty))
            .collect();

        Ok(GeneratedQuestions {
            questions,
            generation_time: 0.0,
            model_used: "mock".into(),
        })
    }
}

#[async_trait]
impl DetectionService for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn detect(&self, request: &DetectionRequest) -> anyhow::Result<Detection> {
        self.detect_calls.fetch_add(1, Ordering::Relaxed);
        *self.last_detect.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());
        Ok(self.classify(&request.answer_text))
    }
}

#[async_trait]
impl ReferenceStore for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    /// Treat the file as text and name the concept after the file stem.
    async fn upload_reference(&self, path: &Path) -> anyhow::Result<ReferenceUpload> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("{} has no usable file name", path.display()))?
            .to_string();
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read reference file {}", path.display()))?;

        let concept = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .replace(['_', '-'], " ");
        let text = String::from_utf8_lossy(&bytes)
            .chars()
            .take(UPLOAD_EXCERPT_CHARS)
            .collect();

        Ok(ReferenceUpload {
            text,
            concept,
            filename,
        })
    }
}
