//! Wire types shared with the stage collaborators.
//!
//! The four collaborators (loader, augmenter, trainer, evaluator) exchange
//! JSON over HTTP. These types are the request and response shapes; paths in
//! them refer to dataset files both sides can read.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Status value collaborators report on success.
pub const STATUS_SUCCESS: &str = "success";

/// Status value collaborators report on failure.
pub const STATUS_ERROR: &str = "error";

/// One of the four pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Loader,
    Augmenter,
    Trainer,
    Evaluator,
}

impl StageKind {
    /// All stages in execution order.
    pub const ALL: [StageKind; 4] = [
        StageKind::Loader,
        StageKind::Augmenter,
        StageKind::Trainer,
        StageKind::Evaluator,
    ];

    /// Stable lowercase name used in logs, run records and configuration.
    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Loader => "loader",
            StageKind::Augmenter => "augmenter",
            StageKind::Trainer => "trainer",
            StageKind::Evaluator => "evaluator",
        }
    }

    /// Field names this stage expects in its request payload.
    pub fn expected_inputs(&self) -> &'static [&'static str] {
        match self {
            StageKind::Loader => &["file_path"],
            StageKind::Augmenter => &["technique", "params", "input_path", "output_path"],
            StageKind::Trainer => &["data_path"],
            StageKind::Evaluator => &["data_path", "model_uri"],
        }
    }

    /// Field names this stage declares in a successful response.
    pub fn expected_outputs(&self) -> &'static [&'static str] {
        match self {
            StageKind::Loader => &["status", "path", "samples"],
            StageKind::Augmenter => &["status", "mix_ratio", "output_path", "output_samples"],
            StageKind::Trainer => &["status", "model_uri"],
            StageKind::Evaluator => &["status", "metrics"],
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Base URLs for the four stage collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageEndpoints {
    pub loader: String,
    pub augmenter: String,
    pub trainer: String,
    pub evaluator: String,
}

impl Default for StageEndpoints {
    fn default() -> Self {
        Self {
            loader: "http://localhost:5001".to_string(),
            augmenter: "http://localhost:5002".to_string(),
            trainer: "http://localhost:5003".to_string(),
            evaluator: "http://localhost:5004".to_string(),
        }
    }
}

impl StageEndpoints {
    /// Base URL for the given stage.
    pub fn url_for(&self, stage: StageKind) -> &str {
        match stage {
            StageKind::Loader => &self.loader,
            StageKind::Augmenter => &self.augmenter,
            StageKind::Trainer => &self.trainer,
            StageKind::Evaluator => &self.evaluator,
        }
    }

    /// Descriptors for all four stages in execution order.
    pub fn descriptors(&self) -> Vec<StageDescriptor> {
        StageKind::ALL
            .iter()
            .map(|&stage| StageDescriptor::new(stage, self.url_for(stage)))
            .collect()
    }
}

/// Static description of one collaborator endpoint.
///
/// Configuration, not runtime state: what the stage is called, where it
/// lives, and which fields it consumes and produces.
#[derive(Debug, Clone, Serialize)]
pub struct StageDescriptor {
    pub stage: StageKind,
    pub endpoint: String,
    pub expected_inputs: &'static [&'static str],
    pub expected_outputs: &'static [&'static str],
}

impl StageDescriptor {
    pub fn new(stage: StageKind, endpoint: impl Into<String>) -> Self {
        Self {
            stage,
            endpoint: endpoint.into(),
            expected_inputs: stage.expected_inputs(),
            expected_outputs: stage.expected_outputs(),
        }
    }
}

/// Request for the loader's `POST /load`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadRequest {
    pub file_path: String,
}

/// Loader response: where the processed dataset landed. Failure responses
/// carry status plus message only, so the other fields default when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadResponse {
    pub status: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub samples: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LoadResponse {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

/// Request for the augmenter's `POST /augment`.
///
/// The technique travels by name with a raw params object; the augmenter
/// resolves the name and rejects unknown ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AugmentRequest {
    pub technique: String,
    #[serde(default)]
    pub params: serde_json::Value,
    pub input_path: String,
    pub output_path: String,
}

/// Result record for one augmentation invocation, and the augmenter's
/// response body. Failure responses carry status plus message only, so the
/// numeric fields default when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AugmentationResult {
    pub status: String,
    #[serde(default)]
    pub mix_ratio: f64,
    #[serde(default)]
    pub output_path: String,
    #[serde(default)]
    pub output_samples: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AugmentationResult {
    pub fn success(mix_ratio: f64, output_path: impl Into<String>, output_samples: usize) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            mix_ratio,
            output_path: output_path.into(),
            output_samples,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            mix_ratio: 0.0,
            output_path: String::new(),
            output_samples: 0,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

/// Request for the trainer's `POST /train`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainRequest {
    pub data_path: String,
}

/// Trainer response: an opaque model reference plus optional diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainResponse {
    pub status: String,
    #[serde(default)]
    pub model_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TrainResponse {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

/// Request for the evaluator's `POST /evaluate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateRequest {
    pub data_path: String,
    pub model_uri: String,
}

/// Evaluator response: named metrics plus an optional artifacts reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateResponse {
    pub status: String,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl EvaluateResponse {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_kind_names() {
        assert_eq!(StageKind::Loader.name(), "loader");
        assert_eq!(StageKind::Augmenter.name(), "augmenter");
        assert_eq!(StageKind::Trainer.name(), "trainer");
        assert_eq!(StageKind::Evaluator.name(), "evaluator");
    }

    #[test]
    fn test_stage_kind_order() {
        let names: Vec<&str> = StageKind::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["loader", "augmenter", "trainer", "evaluator"]);
    }

    #[test]
    fn test_stage_kind_serde_snake_case() {
        let json = serde_json::to_string(&StageKind::Augmenter).unwrap();
        assert_eq!(json, "\"augmenter\"");

        let parsed: StageKind = serde_json::from_str("\"trainer\"").unwrap();
        assert_eq!(parsed, StageKind::Trainer);
    }

    #[test]
    fn test_default_endpoints() {
        let endpoints = StageEndpoints::default();
        assert_eq!(endpoints.url_for(StageKind::Loader), "http://localhost:5001");
        assert_eq!(
            endpoints.url_for(StageKind::Evaluator),
            "http://localhost:5004"
        );
    }

    #[test]
    fn test_descriptors_cover_all_stages() {
        let descriptors = StageEndpoints::default().descriptors();
        assert_eq!(descriptors.len(), 4);
        assert_eq!(descriptors[0].stage, StageKind::Loader);
        assert!(descriptors[1].expected_inputs.contains(&"technique"));
        assert!(descriptors[3].expected_outputs.contains(&"metrics"));
    }

    #[test]
    fn test_augmentation_result_success() {
        let result = AugmentationResult::success(0.75, "/data/out.json", 100);
        assert!(result.is_success());
        assert_eq!(result.output_samples, 100);
        assert!(result.message.is_none());
    }

    #[test]
    fn test_augmentation_result_parses_error_body() {
        let body = r#"{"status": "error", "message": "Unknown augmentation type: cutout"}"#;
        let result: AugmentationResult = serde_json::from_str(body).unwrap();
        assert!(!result.is_success());
        assert_eq!(result.output_samples, 0);
        assert!(result.message.unwrap().contains("cutout"));
    }

    #[test]
    fn test_evaluate_response_metrics() {
        let body = r#"{"status": "success", "metrics": {"accuracy": 0.91, "f1": 0.88}}"#;
        let response: EvaluateResponse = serde_json::from_str(body).unwrap();
        assert!(response.is_success());
        assert!((response.metrics["accuracy"] - 0.91).abs() < f64::EPSILON);
        assert!(response.artifacts_uri.is_none());
    }
}
