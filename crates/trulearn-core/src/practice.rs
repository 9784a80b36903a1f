//! Adaptive practice: choose the next round's difficulty per concept.

use std::collections::BTreeMap;

use anyhow::{Context, Result};

use crate::analysis::ConceptPerformance;
use crate::model::Question;
use crate::traits::{GenerateQuestionsRequest, QuestionSource};

/// Options for planning a practice round.
#[derive(Debug, Clone, Default)]
pub struct PracticeOptions {
    /// Questions to request per concept.
    pub num_variations: Option<u32>,
    /// Only plan concepts whose correct percentage is below this value.
    pub below_percentage: Option<u32>,
    pub reference_text: Option<String>,
    pub filename: Option<String>,
}

/// One generation request per concept, at that concept's suggested difficulty.
pub fn plan_practice(
    performance: &BTreeMap<String, ConceptPerformance>,
    options: &PracticeOptions,
) -> Vec<GenerateQuestionsRequest> {
    performance
        .values()
        .filter(|p| {
            options
                .below_percentage
                .map_or(true, |limit| p.correct_percentage < limit)
        })
        .map(|p| GenerateQuestionsRequest {
            concept: p.concept.clone(),
            difficulty: Some(p.suggested_difficulty),
            num_variations: options.num_variations,
            reference_text: options.reference_text.clone(),
            filename: options.filename.clone(),
        })
        .collect()
}

/// Generate every planned request in order. The first failure is returned as is.
///
/// Questions are renumbered from 1 across the whole round so ids stay unique
/// when several concepts are combined into one question set.
pub async fn generate_practice_round(
    source: &dyn QuestionSource,
    plan: &[GenerateQuestionsRequest],
) -> Result<Vec<Question>> {
    let mut questions = Vec::new();
    for request in plan {
        tracing::info!(
            concept = %request.concept,
            difficulty = ?request.difficulty,
            source = source.name(),
            "generating practice questions"
        );
        let generated = source.generate(request).await.with_context(|| {
            format!("failed to generate practice questions for '{}'", request.concept)
        })?;
        tracing::debug!(
            concept = %request.concept,
            count = generated.questions.len(),
            model = %generated.model_used,
            "practice questions generated"
        );
        questions.extend(generated.questions);
    }
    for (index, question) in questions.iter_mut().enumerate() {
        question.id = index as u64 + 1;
    }
    Ok(questions)
}
