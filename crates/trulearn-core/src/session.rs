//! Assessment session: turns a batch of answers into an [`Attempt`].
//!
//! Multiple-choice answers are graded locally. Every open-ended answer makes
//! exactly one call to the detection service. By default answers are
//! processed strictly in order; a parallelism above one allows that many
//! detection calls in flight while outcomes keep their answer order.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::SubmitError;
use crate::model::{Attempt, AttemptStatus, Question, QuestionKind, QuestionOutcome};
use crate::traits::{DetectionRequest, DetectionService};

/// Configuration for an assessment session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Learner the answers belong to.
    pub student_id: u64,
    /// Maximum concurrent detection calls. 1 means strictly sequential.
    pub parallelism: usize,
    /// Uploaded reference file the service compares answers against.
    pub reference_pdf: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            student_id: 1,
            parallelism: 1,
            reference_pdf: None,
        }
    }
}

/// One learner answer awaiting evaluation.
#[derive(Debug, Clone)]
pub struct AnswerSubmission {
    pub question: Question,
    pub answer_text: String,
    pub response_time_secs: u64,
}

/// Progress reporting trait.
pub trait ProgressReporter: Send + Sync {
    fn on_batch_start(&self, total: usize);
    fn on_answer_complete(&self, outcome: &QuestionOutcome, completed: usize, total: usize);
    fn on_answer_error(&self, question_id: u64, error: &str);
    fn on_batch_complete(&self, completed: usize, total: usize, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_batch_start(&self, _: usize) {}
    fn on_answer_complete(&self, _: &QuestionOutcome, _: usize, _: usize) {}
    fn on_answer_error(&self, _: u64, _: &str) {}
    fn on_batch_complete(&self, _: usize, _: usize, _: Duration) {}
}

/// Requests cancellation of a running batch.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Observed by a running batch; resolves once cancellation is requested.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Create a linked handle/token pair.
    pub fn pair() -> (CancelHandle, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelToken { rx })
    }

    /// A token that is never cancelled.
    pub fn never() -> CancelToken {
        let (_, token) = Self::pair();
        token
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until cancellation is requested. Never resolves if the handle is
    /// dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Drives answer submission for one learner.
pub struct AssessmentSession {
    detector: Arc<dyn DetectionService>,
    config: SessionConfig,
}

impl AssessmentSession {
    pub fn new(detector: Arc<dyn DetectionService>, config: SessionConfig) -> Self {
        Self { detector, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Evaluate a batch of answers.
    ///
    /// `total_questions` is the number of questions presented in the attempt,
    /// which may exceed the number answered. The first failed detection call
    /// aborts the rest of the batch and nothing is committed; `answers` stays
    /// with the caller for resubmission. On cancellation the outcomes already
    /// evaluated are returned as a [`AttemptStatus::Cancelled`] attempt.
    pub async fn submit(
        &self,
        total_questions: usize,
        answers: &[AnswerSubmission],
        progress: &dyn ProgressReporter,
        cancel: &CancelToken,
    ) -> Result<Attempt, SubmitError> {
        validate_batch(answers)?;

        let start = Instant::now();
        let started_at = chrono::Utc::now();
        let attempt_id = Uuid::new_v4();
        let total = answers.len();
        let parallelism = self.config.parallelism.max(1);

        tracing::info!(
            %attempt_id,
            answers = total,
            parallelism,
            detector = self.detector.name(),
            "submitting answer batch"
        );
        progress.on_batch_start(total);

        let mut evaluations = stream::iter(answers.iter().enumerate())
            .map(|(index, submission)| async move { (index, self.evaluate(submission).await) })
            .buffer_unordered(parallelism);

        let mut collected: Vec<(usize, QuestionOutcome)> = Vec::with_capacity(total);
        let mut status = AttemptStatus::Complete;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::warn!(
                        %attempt_id,
                        completed = collected.len(),
                        total,
                        "answer batch cancelled"
                    );
                    status = AttemptStatus::Cancelled;
                    break;
                }
                next = evaluations.next() => match next {
                    Some((index, Ok(outcome))) => {
                        tracing::debug!(
                            question_id = outcome.question.id,
                            concept = %outcome.question.concept,
                            "answer evaluated"
                        );
                        progress.on_answer_complete(&outcome, collected.len() + 1, total);
                        collected.push((index, outcome));
                    }
                    Some((_, Err(e))) => {
                        tracing::error!(
                            %attempt_id,
                            question_id = e.question_id(),
                            "answer batch aborted: {e:#}"
                        );
                        progress.on_answer_error(e.question_id(), &e.to_string());
                        return Err(e);
                    }
                    None => break,
                },
            }
        }
        // Dropping the stream abandons any detection calls still in flight.
        drop(evaluations);

        collected.sort_by_key(|(index, _)| *index);
        let outcomes: Vec<QuestionOutcome> = collected.into_iter().map(|(_, o)| o).collect();

        let elapsed = start.elapsed();
        progress.on_batch_complete(outcomes.len(), total, elapsed);
        tracing::info!(
            %attempt_id,
            completed = outcomes.len(),
            total,
            elapsed_ms = elapsed.as_millis() as u64,
            "answer batch finished"
        );

        Ok(Attempt {
            id: attempt_id,
            student_id: self.config.student_id,
            started_at,
            total_questions: total_questions.max(outcomes.len()),
            status,
            outcomes,
        })
    }

    async fn evaluate(
        &self,
        submission: &AnswerSubmission,
    ) -> Result<QuestionOutcome, SubmitError> {
        let question = &submission.question;
        let outcome = match &question.kind {
            QuestionKind::MultipleChoice { .. } => QuestionOutcome::graded(
                question.clone(),
                submission.answer_text.clone(),
                submission.response_time_secs,
            ),
            QuestionKind::OpenEnded { .. } => {
                let request = DetectionRequest::for_answer(
                    question,
                    self.config.student_id,
                    &submission.answer_text,
                    submission.response_time_secs,
                    self.config.reference_pdf.clone(),
                );
                let detection = self.detector.detect(&request).await.map_err(|source| {
                    SubmitError::Detection {
                        question_id: question.id,
                        source,
                    }
                })?;
                QuestionOutcome::detected(
                    question.clone(),
                    submission.answer_text.clone(),
                    submission.response_time_secs,
                    detection,
                )
            }
        };
        outcome.map_err(|e| SubmitError::InvalidSubmission {
            question_id: question.id,
            reason: e.to_string(),
        })
    }
}

/// Reject batches that would never produce a well-formed attempt.
fn validate_batch(answers: &[AnswerSubmission]) -> Result<(), SubmitError> {
    let mut seen = HashSet::new();
    for answer in answers {
        let question_id = answer.question.id;
        if !seen.insert(question_id) {
            return Err(SubmitError::InvalidSubmission {
                question_id,
                reason: "question answered more than once".into(),
            });
        }
        if answer.answer_text.trim().is_empty() {
            return Err(SubmitError::InvalidSubmission {
                question_id,
                reason: "answer is blank".into(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::ServiceError;
    use crate::model::{Detection, DetectionType, Difficulty};

    /// Detector keyed on answer text: "copied" → memorization, "fail" → error,
    /// "hang" → never returns, anything else → genuine.
    struct ScriptedDetector {
        calls: AtomicUsize,
        seen: Mutex<Vec<u64>>,
    }

    impl ScriptedDetector {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DetectionService for ScriptedDetector {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn detect(&self, request: &DetectionRequest) -> anyhow::Result<Detection> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.question_id);
            match request.answer_text.as_str() {
                "fail" => Err(ServiceError::ApiError {
                    status: 500,
                    message: "boom".into(),
                }
                .into()),
                "hang" => std::future::pending::<anyhow::Result<Detection>>().await,
                text => Ok(Detection {
                    detection_type: if text == "copied" {
                        DetectionType::Memorization
                    } else {
                        DetectionType::Genuine
                    },
                    confidence_score: if text == "copied" { 0.95 } else { 0.2 },
                    reason: String::new(),
                }),
            }
        }
    }

    fn open(id: u64, answer: &str) -> AnswerSubmission {
        AnswerSubmission {
            question: Question {
                id,
                question_text: format!("Explain #{id}"),
                concept: "Photosynthesis".into(),
                difficulty: Difficulty::Medium,
                variation_group_id: None,
                kind: QuestionKind::OpenEnded {
                    sample_answer: Some("reference".into()),
                },
            },
            answer_text: answer.into(),
            response_time_secs: 20,
        }
    }

    fn choice(id: u64, answer: &str) -> AnswerSubmission {
        AnswerSubmission {
            question: Question {
                id,
                question_text: format!("Pick #{id}"),
                concept: "Cells".into(),
                difficulty: Difficulty::Easy,
                variation_group_id: None,
                kind: QuestionKind::MultipleChoice {
                    options: BTreeMap::from([
                        ("A".to_string(), "right".to_string()),
                        ("B".to_string(), "wrong".to_string()),
                    ]),
                    correct_answer: "A".into(),
                },
            },
            answer_text: answer.into(),
            response_time_secs: 5,
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        progress: Mutex<Vec<(usize, usize)>>,
        errors: Mutex<Vec<u64>>,
        cancel_after: Option<(usize, CancelHandle)>,
    }

    impl ProgressReporter for RecordingReporter {
        fn on_batch_start(&self, _: usize) {}

        fn on_answer_complete(&self, _: &QuestionOutcome, completed: usize, total: usize) {
            self.progress.lock().unwrap().push((completed, total));
            if let Some((after, handle)) = &self.cancel_after {
                if completed >= *after {
                    handle.cancel();
                }
            }
        }

        fn on_answer_error(&self, question_id: u64, _: &str) {
            self.errors.lock().unwrap().push(question_id);
        }

        fn on_batch_complete(&self, _: usize, _: usize, _: Duration) {}
    }

    fn session(detector: Arc<ScriptedDetector>, parallelism: usize) -> AssessmentSession {
        AssessmentSession::new(
            detector,
            SessionConfig {
                student_id: 42,
                parallelism,
                reference_pdf: Some("notes.pdf".into()),
            },
        )
    }

    #[tokio::test]
    async fn sequential_batch_keeps_order_and_reports_progress() {
        let detector = Arc::new(ScriptedDetector::new());
        let session = session(Arc::clone(&detector), 1);
        let answers = vec![choice(1, "A"), open(2, "mine"), choice(3, "B"), open(4, "copied")];
        let reporter = RecordingReporter::default();

        let attempt = session
            .submit(10, &answers, &reporter, &CancelToken::never())
            .await
            .unwrap();

        assert_eq!(attempt.status, AttemptStatus::Complete);
        assert_eq!(attempt.student_id, 42);
        assert_eq!(attempt.total_questions, 10);
        let ids: Vec<u64> = attempt.outcomes.iter().map(|o| o.question.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(attempt.outcomes[0].is_correct(), Some(true));
        assert_eq!(attempt.outcomes[2].is_correct(), Some(false));
        assert_eq!(
            attempt.outcomes[3].detection().unwrap().detection_type,
            DetectionType::Memorization
        );

        // Only open-ended answers reach the detector, in order.
        assert_eq!(detector.calls.load(Ordering::SeqCst), 2);
        assert_eq!(*detector.seen.lock().unwrap(), vec![2, 4]);
        assert_eq!(
            *reporter.progress.lock().unwrap(),
            vec![(1, 4), (2, 4), (3, 4), (4, 4)]
        );
    }

    #[tokio::test]
    async fn failed_detection_aborts_batch() {
        let detector = Arc::new(ScriptedDetector::new());
        let session = session(Arc::clone(&detector), 1);
        let answers = vec![open(1, "mine"), open(2, "fail"), open(3, "mine")];
        let reporter = RecordingReporter::default();

        let err = session
            .submit(3, &answers, &reporter, &CancelToken::never())
            .await
            .unwrap_err();

        assert_eq!(err.question_id(), 2);
        assert!(matches!(
            err.service_error(),
            Some(ServiceError::ApiError { status: 500, .. })
        ));
        assert_eq!(*reporter.errors.lock().unwrap(), vec![2]);
        // The third answer was never sent.
        assert_eq!(detector.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cancellation_keeps_completed_outcomes() {
        let detector = Arc::new(ScriptedDetector::new());
        let session = session(Arc::clone(&detector), 1);
        let answers = vec![open(1, "mine"), open(2, "hang"), open(3, "mine")];
        let (handle, token) = CancelToken::pair();
        let reporter = RecordingReporter {
            cancel_after: Some((1, handle)),
            ..Default::default()
        };

        let attempt = session.submit(3, &answers, &reporter, &token).await.unwrap();

        assert_eq!(attempt.status, AttemptStatus::Cancelled);
        assert_eq!(attempt.outcomes.len(), 1);
        assert_eq!(attempt.outcomes[0].question.id, 1);
        assert_eq!(attempt.total_questions, 3);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn parallel_batch_preserves_answer_order() {
        let detector = Arc::new(ScriptedDetector::new());
        let session = session(Arc::clone(&detector), 4);
        let answers: Vec<_> = (1..=8).map(|id| open(id, "mine")).collect();

        let attempt = session
            .submit(8, &answers, &NoopReporter, &CancelToken::never())
            .await
            .unwrap();

        let ids: Vec<u64> = attempt.outcomes.iter().map(|o| o.question.id).collect();
        assert_eq!(ids, (1..=8).collect::<Vec<_>>());
        assert_eq!(detector.calls.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn parallel_failure_names_the_failing_answer() {
        let detector = Arc::new(ScriptedDetector::new());
        let session = session(Arc::clone(&detector), 4);
        let answers = vec![open(1, "hang"), open(2, "fail"), open(3, "hang"), open(4, "mine")];
        let reporter = RecordingReporter::default();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            session.submit(4, &answers, &reporter, &CancelToken::never()),
        )
        .await
        .expect("a failed answer must not wait for answers still in flight");

        let err = result.unwrap_err();
        assert_eq!(err.question_id(), 2);
        assert!(matches!(
            err.service_error(),
            Some(ServiceError::ApiError { status: 500, .. })
        ));
        assert_eq!(*reporter.errors.lock().unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn parallel_cancellation_keeps_completed_outcomes_in_order() {
        let detector = Arc::new(ScriptedDetector::new());
        let session = session(Arc::clone(&detector), 4);
        let answers: Vec<_> = (1..=8)
            .map(|id| open(id, if id % 2 == 0 { "hang" } else { "mine" }))
            .collect();
        let (handle, token) = CancelToken::pair();
        let reporter = RecordingReporter {
            cancel_after: Some((2, handle)),
            ..Default::default()
        };

        let attempt = session.submit(8, &answers, &reporter, &token).await.unwrap();

        assert_eq!(attempt.status, AttemptStatus::Cancelled);
        assert_eq!(attempt.total_questions, 8);
        assert_eq!(attempt.outcomes.len(), 2);
        let ids: Vec<u64> = attempt.outcomes.iter().map(|o| o.question.id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]), "outcomes out of order: {ids:?}");
        assert!(ids.iter().all(|id| id % 2 == 1));
    }

    #[tokio::test]
    async fn blank_and_duplicate_answers_are_rejected_up_front() {
        let detector = Arc::new(ScriptedDetector::new());
        let session = session(Arc::clone(&detector), 1);

        let blank = vec![open(1, "mine"), open(2, "   ")];
        let err = session
            .submit(2, &blank, &NoopReporter, &CancelToken::never())
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::InvalidSubmission { question_id: 2, .. }));

        let duplicate = vec![choice(1, "A"), choice(1, "B")];
        let err = session
            .submit(2, &duplicate, &NoopReporter, &CancelToken::never())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("more than once"));
        assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_batch_yields_empty_attempt() {
        let session = session(Arc::new(ScriptedDetector::new()), 1);
        let attempt = session
            .submit(5, &[], &NoopReporter, &CancelToken::never())
            .await
            .unwrap();
        assert!(attempt.outcomes.is_empty());
        assert_eq!(attempt.status, AttemptStatus::Complete);
    }
}
