//! Error types shared across the TruLearn crates.
//!
//! `ServiceError` lives here rather than in `trulearn-client` so the session
//! and the CLI can downcast remote failures without string matching.

use thiserror::Error;

/// Errors that can occur when talking to the remote question/detection service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The service rejected our credentials (HTTP 401/403).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The requested resource does not exist (HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// The service returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The response body did not match the expected contract.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Precondition violations when building a [`QuestionOutcome`](crate::model::QuestionOutcome).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OutcomeError {
    /// The evaluation does not match the question's type tag.
    #[error("question {question_id} is {expected} but the outcome carries a {found} evaluation")]
    KindMismatch {
        question_id: u64,
        expected: &'static str,
        found: &'static str,
    },
    #[error("question {question_id} has confidence score {score} outside [0, 1]")]
    ConfidenceOutOfRange { question_id: u64, score: f64 },
}

/// Errors from submitting a batch of answers.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The batch was rejected before any remote call was made.
    #[error("invalid submission for question {question_id}: {reason}")]
    InvalidSubmission { question_id: u64, reason: String },

    /// A detection call failed; the remaining batch was aborted.
    #[error("detection failed for question {question_id}: {source}")]
    Detection {
        question_id: u64,
        #[source]
        source: anyhow::Error,
    },
}

impl SubmitError {
    /// The question the failure is attributed to.
    pub fn question_id(&self) -> u64 {
        match self {
            SubmitError::InvalidSubmission { question_id, .. }
            | SubmitError::Detection { question_id, .. } => *question_id,
        }
    }

    /// Returns the underlying [`ServiceError`], if the failure came from the service.
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            SubmitError::Detection { source, .. } => source.downcast_ref::<ServiceError>(),
            SubmitError::InvalidSubmission { .. } => None,
        }
    }
}
