//! TruLearn HTTP API backend.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use trulearn_core::error::ServiceError;
use trulearn_core::model::{Detection, DetectionType};
use trulearn_core::traits::{
    DetectionRequest, DetectionService, GenerateQuestionsRequest, GeneratedQuestions,
    QuestionSource, ReferenceStore, ReferenceUpload,
};

use crate::config::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};

/// Client for the question generation and detection endpoints.
pub struct HttpBackend {
    base_url: String,
    timeout_secs: u64,
    api_token: Option<String>,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(
        base_url: &str,
        timeout_secs: u64,
        api_token: Option<String>,
    ) -> Result<Self, ServiceError> {
        let base = if base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            base_url
        };
        let timeout_secs = if timeout_secs == 0 {
            DEFAULT_TIMEOUT_SECS
        } else {
            timeout_secs
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ServiceError::NetworkError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base.trim_end_matches('/').to_string(),
            timeout_secs,
            api_token,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_error(&self, e: reqwest::Error) -> ServiceError {
        if e.is_timeout() {
            ServiceError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            ServiceError::NetworkError(format!(
                "TruLearn API not reachable at {}. Is the backend running?",
                self.base_url
            ))
        } else {
            ServiceError::NetworkError(e.to_string())
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        endpoint: &str,
    ) -> Result<T, ServiceError> {
        let request = match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await.map_err(|e| self.map_send_error(e))?;

        let status = response.status().as_u16();
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(endpoint, status, "request rejected");
            return Err(match status {
                401 | 403 => ServiceError::Unauthorized(body),
                404 => ServiceError::NotFound(format!("{endpoint}: {body}")),
                _ => ServiceError::ApiError {
                    status,
                    message: body,
                },
            });
        }

        let body = response.text().await.map_err(|e| self.map_send_error(e))?;
        serde_json::from_str(&body).map_err(|e| {
            ServiceError::InvalidResponse(format!("failed to parse {endpoint} response: {e}"))
        })
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ServiceError> {
        let request = self
            .client
            .post(format!("{}{}", self.base_url, endpoint))
            .json(body);
        self.send(request, endpoint).await
    }

    /// Check that the backend is up.
    pub async fn health(&self) -> anyhow::Result<HealthStatus> {
        let request = self.client.get(format!("{}/api/health", self.base_url));
        Ok(self.send(request, "/api/health").await?)
    }
}

/// Response of `GET /api/health`.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub service: String,
}

#[derive(Deserialize)]
struct SubmitAnswerResponse {
    answer_id: u64,
    #[serde(default)]
    status: String,
}

#[derive(Deserialize)]
struct DetectResponse {
    #[serde(default)]
    overfitting_detected: bool,
    confidence_score: f64,
    detection_type: DetectionType,
    #[serde(default)]
    evidence: Option<Evidence>,
}

#[derive(Deserialize)]
struct Evidence {
    #[serde(default)]
    reason: String,
}

#[async_trait]
impl QuestionSource for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, request), fields(concept = %request.concept))]
    async fn generate(
        &self,
        request: &GenerateQuestionsRequest,
    ) -> anyhow::Result<GeneratedQuestions> {
        let start = Instant::now();
        let generated: GeneratedQuestions =
            self.post_json("/api/questions/generate", request).await?;
        tracing::debug!(
            count = generated.questions.len(),
            model = %generated.model_used,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "questions generated"
        );
        Ok(generated)
    }
}

#[async_trait]
impl DetectionService for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, request), fields(question_id = request.question_id))]
    async fn detect(&self, request: &DetectionRequest) -> anyhow::Result<Detection> {
        let submitted: SubmitAnswerResponse = self.post_json("/api/answers", request).await?;
        tracing::debug!(
            answer_id = submitted.answer_id,
            status = %submitted.status,
            "answer submitted"
        );

        let endpoint = format!("/api/answers/{}/detect", submitted.answer_id);
        let response: DetectResponse = self.post_json(&endpoint, request).await?;

        if !(0.0..=1.0).contains(&response.confidence_score) {
            return Err(ServiceError::InvalidResponse(format!(
                "confidence score {} is outside [0, 1]",
                response.confidence_score
            ))
            .into());
        }

        tracing::debug!(
            answer_id = submitted.answer_id,
            detection_type = %response.detection_type,
            confidence = response.confidence_score,
            flagged = response.overfitting_detected,
            "detection complete"
        );

        Ok(Detection {
            detection_type: response.detection_type,
            confidence_score: response.confidence_score,
            reason: response.evidence.map(|e| e.reason).unwrap_or_default(),
        })
    }
}

#[async_trait]
impl ReferenceStore for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    /// Upload a PDF as the multipart field `pdf`. The service keeps the
    /// extracted text under the returned filename.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    async fn upload_reference(&self, path: &Path) -> anyhow::Result<ReferenceUpload> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("{} has no usable file name", path.display()))?
            .to_string();
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read reference file {}", path.display()))?;
        let size = bytes.len();

        let part = Part::bytes(bytes)
            .file_name(filename.clone())
            .mime_str("application/pdf")?;
        let form = Form::new().part("pdf", part);
        let request = self
            .client
            .post(format!("{}/api/upload-reference", self.base_url))
            .multipart(form);
        let upload: ReferenceUpload = self.send(request, "/api/upload-reference").await?;

        tracing::debug!(
            %filename,
            bytes = size,
            stored_as = %upload.filename,
            concept = %upload.concept,
            "reference uploaded"
        );
        Ok(upload)
    }
}
