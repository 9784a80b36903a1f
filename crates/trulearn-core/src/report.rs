//! Attempt reports with JSON persistence and per-concept progress tracking.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::{analyze_by_concept, summarize, ConceptPerformance, Summary};
use crate::model::{Attempt, AttemptStatus, Evaluation};

/// A saved attempt together with its derived analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    pub attempt: Attempt,
    /// `None` when nothing was answered.
    pub summary: Option<Summary>,
    pub concepts: BTreeMap<String, ConceptPerformance>,
    /// Wall-clock duration of the submission in milliseconds.
    pub duration_ms: u64,
}

impl AttemptReport {
    /// Build a report, deriving the summary and concept map from the attempt.
    pub fn from_attempt(attempt: Attempt, duration_ms: u64) -> Self {
        let mut report = Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            attempt,
            summary: None,
            concepts: BTreeMap::new(),
            duration_ms,
        };
        report.refresh();
        report
    }

    /// Recompute the derived fields from the attempt's outcomes.
    pub fn refresh(&mut self) {
        self.summary = summarize(&self.attempt.outcomes, self.attempt.total_questions);
        self.concepts = analyze_by_concept(&self.attempt.outcomes);
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file. Derived fields are recomputed, never
    /// taken from the file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let mut report: AttemptReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        ensure!(
            report.attempt.total_questions >= report.attempt.outcomes.len(),
            "report {} records {} outcome(s) for {} question(s)",
            path.display(),
            report.attempt.outcomes.len(),
            report.attempt.total_questions
        );
        report.refresh();
        Ok(report)
    }

    /// Compare per-concept performance against an earlier attempt.
    ///
    /// `threshold` is in percentage points; smaller changes count as unchanged.
    pub fn compare(&self, baseline: &AttemptReport, threshold: u32) -> ProgressReport {
        let mut improvements = Vec::new();
        let mut regressions = Vec::new();
        let mut unchanged = 0usize;
        let mut new_concepts = Vec::new();

        for (concept, current) in &self.concepts {
            let Some(before) = baseline.concepts.get(concept) else {
                new_concepts.push(concept.clone());
                continue;
            };
            let delta = current.correct_percentage as i64 - before.correct_percentage as i64;
            let change = ConceptChange {
                concept: concept.clone(),
                baseline_pct: before.correct_percentage,
                current_pct: current.correct_percentage,
                delta,
                baseline_difficulty: before.suggested_difficulty,
                current_difficulty: current.suggested_difficulty,
            };
            if delta > threshold as i64 {
                improvements.push(change);
            } else if delta < -(threshold as i64) {
                regressions.push(change);
            } else {
                unchanged += 1;
            }
        }

        let dropped_concepts = baseline
            .concepts
            .keys()
            .filter(|c| !self.concepts.contains_key(*c))
            .cloned()
            .collect();

        ProgressReport {
            improvements,
            regressions,
            unchanged,
            new_concepts,
            dropped_concepts,
        }
    }

    /// Render the report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        let _ = writeln!(md, "# Assessment results\n");
        let _ = writeln!(
            md,
            "Attempt `{}` for student {} ({})\n",
            self.attempt.id,
            self.attempt.student_id,
            self.attempt.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        if self.attempt.status == AttemptStatus::Cancelled {
            let _ = writeln!(
                md,
                "> Submission was cancelled; results cover answered questions only.\n"
            );
        }

        match &self.summary {
            None => {
                let _ = writeln!(md, "No summary available: no questions were answered.");
                return md;
            }
            Some(s) => {
                let _ = writeln!(md, "**{}**: {}\n", s.verdict, s.message);
                let _ = writeln!(md, "| Metric | Value |");
                let _ = writeln!(md, "|--------|-------|");
                let _ = writeln!(md, "| Answered | {}/{} |", s.total_answered, s.total_questions);
                let _ = writeln!(
                    md,
                    "| Multiple-choice accuracy | {}% ({}/{}) |",
                    s.mc_accuracy_pct, s.mc_correct, s.mc_answered
                );
                let _ = writeln!(md, "| Understanding | {}% |", s.understanding_pct);
                let _ = writeln!(
                    md,
                    "| Memorization | {}% ({} of {} flagged) |",
                    s.memorization_pct, s.memorized_count, s.oe_answered
                );
                let _ = writeln!(md, "| Surface-level | {} |\n", s.surface_count);
            }
        }

        let _ = writeln!(md, "## Concepts\n");
        let _ = writeln!(md, "| Concept | Correct | % | Next difficulty |");
        let _ = writeln!(md, "|---------|---------|---|-----------------|");
        for perf in self.concepts.values() {
            let _ = writeln!(
                md,
                "| {} | {}/{} | {}% | {} |",
                perf.concept,
                perf.correct_count,
                perf.total_questions,
                perf.correct_percentage,
                perf.suggested_difficulty
            );
        }

        let _ = writeln!(md, "\n## Answers\n");
        for outcome in &self.attempt.outcomes {
            let verdict = match outcome.evaluation() {
                Evaluation::MultipleChoice { is_correct: true } => "correct".to_string(),
                Evaluation::MultipleChoice { is_correct: false } => "incorrect".to_string(),
                Evaluation::OpenEnded { detection } => format!(
                    "{} (similarity {:.0}%)",
                    detection.detection_type,
                    detection.confidence_score * 100.0
                ),
            };
            let _ = writeln!(
                md,
                "- Q{} [{}]: {}",
                outcome.question.id, outcome.question.concept, verdict
            );
        }
        md
    }
}

/// Change in one concept between two attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptChange {
    pub concept: String,
    pub baseline_pct: u32,
    pub current_pct: u32,
    /// Percentage points gained (negative when lost).
    pub delta: i64,
    pub baseline_difficulty: crate::model::Difficulty,
    pub current_difficulty: crate::model::Difficulty,
}

/// Per-concept comparison of two attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressReport {
    pub improvements: Vec<ConceptChange>,
    pub regressions: Vec<ConceptChange>,
    pub unchanged: usize,
    /// Concepts only present in the current attempt.
    pub new_concepts: Vec<String>,
    /// Concepts only present in the baseline.
    pub dropped_concepts: Vec<String>,
}

impl ProgressReport {
    pub fn has_regressions(&self) -> bool {
        !self.regressions.is_empty()
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        let _ = writeln!(md, "## Progress by concept\n");
        let _ = writeln!(
            md,
            "{} improved, {} regressed, {} unchanged\n",
            self.improvements.len(),
            self.regressions.len(),
            self.unchanged
        );

        if !self.regressions.is_empty() || !self.improvements.is_empty() {
            let _ = writeln!(md, "| Concept | Before | After | Delta | Difficulty |");
            let _ = writeln!(md, "|---------|--------|-------|-------|------------|");
            for c in self.regressions.iter().chain(&self.improvements) {
                let _ = writeln!(
                    md,
                    "| {} | {}% | {}% | {:+} | {} → {} |",
                    c.concept,
                    c.baseline_pct,
                    c.current_pct,
                    c.delta,
                    c.baseline_difficulty,
                    c.current_difficulty
                );
            }
        }
        if !self.new_concepts.is_empty() {
            let _ = writeln!(md, "\nNew concepts: {}", self.new_concepts.join(", "));
        }
        if !self.dropped_concepts.is_empty() {
            let _ = writeln!(md, "\nNot practiced this time: {}", self.dropped_concepts.join(", "));
        }
        md
    }
}
