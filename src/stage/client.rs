//! HTTP client for the stage collaborators.
//!
//! The orchestrator and readiness gate depend only on the [`StageBackend`]
//! trait; [`HttpStageBackend`] is the production implementation. Tests
//! substitute in-process backends.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::StageError;
use crate::stage::types::{
    AugmentRequest, AugmentationResult, EvaluateRequest, EvaluateResponse, LoadRequest,
    LoadResponse, StageEndpoints, StageKind, TrainRequest, TrainResponse,
};

/// Default per-request timeout for collaborator calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Transport seam between the pipeline and its four collaborators.
#[async_trait]
pub trait StageBackend: Send + Sync {
    /// Probe the stage's health endpoint. `true` means ready to serve.
    async fn check_health(&self, stage: StageKind) -> bool;

    /// Ask the loader to produce a processed dataset from a raw source.
    async fn load(&self, request: &LoadRequest) -> Result<LoadResponse, StageError>;

    /// Ask the augmenter to transform a dataset file.
    async fn augment(&self, request: &AugmentRequest) -> Result<AugmentationResult, StageError>;

    /// Ask the trainer to fit a model on a dataset file.
    async fn train(&self, request: &TrainRequest) -> Result<TrainResponse, StageError>;

    /// Ask the evaluator to score a model against a holdout dataset.
    async fn evaluate(&self, request: &EvaluateRequest) -> Result<EvaluateResponse, StageError>;
}

/// Error body shape the collaborators use for failures.
#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Production [`StageBackend`] speaking JSON over HTTP.
pub struct HttpStageBackend {
    endpoints: StageEndpoints,
    client: Client,
}

impl HttpStageBackend {
    /// Create a backend with the default request timeout.
    pub fn new(endpoints: StageEndpoints) -> Self {
        Self::with_timeout(endpoints, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a backend with an explicit request timeout.
    pub fn with_timeout(endpoints: StageEndpoints, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self { endpoints, client }
    }

    /// Configured endpoints.
    pub fn endpoints(&self) -> &StageEndpoints {
        &self.endpoints
    }

    async fn post_json<Req, Resp>(
        &self,
        stage: StageKind,
        route: &str,
        request: &Req,
    ) -> Result<Resp, StageError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{}", self.endpoints.url_for(stage), route);
        debug!(stage = %stage, url = %url, "posting stage request");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| StageError::RequestFailed {
                stage,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());

            // Collaborators report failures as {"status": "error", "message": ...}
            let message = serde_json::from_str::<ServiceErrorBody>(&body)
                .ok()
                .and_then(|parsed| parsed.message)
                .unwrap_or(body);

            return Err(StageError::Api {
                stage,
                code: status.as_u16(),
                message,
            });
        }

        response
            .json::<Resp>()
            .await
            .map_err(|e| StageError::ParseError {
                stage,
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl StageBackend for HttpStageBackend {
    async fn check_health(&self, stage: StageKind) -> bool {
        let url = format!("{}/health", self.endpoints.url_for(stage));
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                trace!(stage = %stage, error = %e, "health probe failed");
                false
            }
        }
    }

    async fn load(&self, request: &LoadRequest) -> Result<LoadResponse, StageError> {
        self.post_json(StageKind::Loader, "/load", request).await
    }

    async fn augment(&self, request: &AugmentRequest) -> Result<AugmentationResult, StageError> {
        self.post_json(StageKind::Augmenter, "/augment", request)
            .await
    }

    async fn train(&self, request: &TrainRequest) -> Result<TrainResponse, StageError> {
        self.post_json(StageKind::Trainer, "/train", request).await
    }

    async fn evaluate(&self, request: &EvaluateRequest) -> Result<EvaluateResponse, StageError> {
        self.post_json(StageKind::Evaluator, "/evaluate", request)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_backend() -> HttpStageBackend {
        let endpoints = StageEndpoints {
            loader: "http://127.0.0.1:65535".to_string(),
            augmenter: "http://127.0.0.1:65535".to_string(),
            trainer: "http://127.0.0.1:65535".to_string(),
            evaluator: "http://127.0.0.1:65535".to_string(),
        };
        HttpStageBackend::with_timeout(endpoints, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_load_connection_refused() {
        let backend = unreachable_backend();
        let result = backend
            .load(&LoadRequest {
                file_path: "/data/raw.csv".to_string(),
            })
            .await;

        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, StageError::RequestFailed { .. }));
        assert!(err.to_string().contains("loader"));
    }

    #[tokio::test]
    async fn test_health_probe_unreachable_is_not_ready() {
        let backend = unreachable_backend();
        assert!(!backend.check_health(StageKind::Trainer).await);
    }

    #[test]
    fn test_service_error_body_parsing() {
        let parsed: ServiceErrorBody =
            serde_json::from_str(r#"{"status": "error", "message": "boom"}"#).unwrap();
        assert_eq!(parsed.message.as_deref(), Some("boom"));

        let parsed: ServiceErrorBody = serde_json::from_str(r#"{"status": "error"}"#).unwrap();
        assert!(parsed.message.is_none());
    }
}
