//! Pipeline orchestrator for the four-stage batch run.
//!
//! This module provides the main `PipelineOrchestrator` that coordinates:
//! - The readiness gate across all stage collaborators
//! - The load -> augment -> train -> evaluate stage sequence
//! - Dataset contract enforcement between stages
//! - Run tracking through an injected sink
//! - Run records and aggregate statistics
//!
//! Stages run strictly in order with exactly one in flight. The first
//! failure ends the run; later stages are never invoked and nothing is
//! retried.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::dataset::{read_dataset, DatasetContract};
use crate::error::{ContractError, StageError, StoreError};
use crate::stage::{
    AugmentRequest, EvaluateRequest, HttpStageBackend, LoadRequest, StageBackend, StageKind,
    TrainRequest,
};
use crate::tracking::{NoopSink, RunSink};

use super::config::PipelineConfig;
use super::readiness::{ReadinessGate, ReadinessTimeout, StageHealth};

/// Metric key the evaluator must always report.
pub const ACCURACY_KEY: &str = "accuracy";

/// Errors that can occur during pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration error, detected before any stage runs.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),

    /// A collaborator never became healthy; no stage was invoked.
    #[error("readiness gate failed: {0}")]
    NotReady(#[from] ReadinessTimeout),

    /// A stage output violated the dataset contract.
    #[error("contract violation at stage '{stage}': {source}")]
    Contract {
        stage: StageKind,
        #[source]
        source: ContractError,
    },

    /// A stage output file could not be read back.
    #[error("dataset store failure at stage '{stage}': {source}")]
    Store {
        stage: StageKind,
        #[source]
        source: StoreError,
    },

    /// Transport, HTTP or response-parsing failure on a stage call.
    #[error("stage call failed: {0}")]
    Stage(#[from] StageError),

    /// The stage answered, but with an error status or an unusable payload.
    #[error("stage '{stage}' failed: {reason}")]
    StageFailed { stage: StageKind, reason: String },
}

impl PipelineError {
    /// Stage the failure is attributed to. `None` only for configuration
    /// errors, which happen before any stage is involved.
    pub fn failing_stage(&self) -> Option<StageKind> {
        match self {
            PipelineError::Config(_) => None,
            PipelineError::NotReady(err) => Some(err.stage),
            PipelineError::Contract { stage, .. }
            | PipelineError::Store { stage, .. }
            | PipelineError::StageFailed { stage, .. } => Some(*stage),
            PipelineError::Stage(err) => Some(err.stage()),
        }
    }
}

/// Lifecycle state of a pipeline run.
///
/// Runs move Idle -> Loading -> Augmenting -> Training -> Evaluating ->
/// Succeeded. `Failed` is absorbing: once entered, no further transitions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Loading,
    Augmenting,
    Training,
    Evaluating,
    Succeeded,
    Failed { stage: StageKind, reason: String },
}

impl RunState {
    /// Active state for a stage being executed.
    pub fn running(stage: StageKind) -> Self {
        match stage {
            StageKind::Loader => RunState::Loading,
            StageKind::Augmenter => RunState::Augmenting,
            StageKind::Trainer => RunState::Training,
            StageKind::Evaluator => RunState::Evaluating,
        }
    }

    /// Whether the run can make no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Succeeded | RunState::Failed { .. })
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Loading => write!(f, "loading"),
            RunState::Augmenting => write!(f, "augmenting"),
            RunState::Training => write!(f, "training"),
            RunState::Evaluating => write!(f, "evaluating"),
            RunState::Succeeded => write!(f, "succeeded"),
            RunState::Failed { stage, .. } => write!(f, "failed-at-stage({})", stage),
        }
    }
}

/// Durable summary of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    /// Unique id for this run.
    pub run_id: Uuid,
    /// State the run ended in (or the stage in flight, mid-run).
    pub state: RunState,
    /// Dataset reference declared by the loader.
    pub processed_path: Option<PathBuf>,
    /// Dataset reference declared by the augmenter.
    pub augmented_path: Option<PathBuf>,
    /// Mixing coefficient reported by the augmenter.
    pub mix_ratio: Option<f64>,
    /// Model reference declared by the trainer.
    pub model_uri: Option<String>,
    /// Final metrics reported by the evaluator.
    pub metrics: BTreeMap<String, f64>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration: Duration,
    /// Error message if the run failed.
    pub error: Option<String>,
}

impl RunRecord {
    /// Creates a fresh idle record with a new run id.
    fn idle() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            state: RunState::Idle,
            processed_path: None,
            augmented_path: None,
            mix_ratio: None,
            model_uri: None,
            metrics: BTreeMap::new(),
            started_at: Utc::now(),
            finished_at: None,
            duration: Duration::ZERO,
            error: None,
        }
    }

    /// Moves the record into the active state for `stage`.
    fn enter(&mut self, stage: StageKind) {
        self.state = RunState::running(stage);
    }

    /// Marks the run as succeeded.
    fn succeeded(mut self, duration: Duration) -> Self {
        self.state = RunState::Succeeded;
        self.finished_at = Some(Utc::now());
        self.duration = duration;
        self
    }

    /// Marks the run as failed at `stage`.
    fn failed(mut self, stage: StageKind, reason: impl Into<String>, duration: Duration) -> Self {
        let reason = reason.into();
        self.error = Some(reason.clone());
        self.state = RunState::Failed { stage, reason };
        self.finished_at = Some(Utc::now());
        self.duration = duration;
        self
    }

    /// Whether the run reached the Succeeded state.
    pub fn is_success(&self) -> bool {
        self.state == RunState::Succeeded
    }

    /// Stage the run failed at, if it failed.
    pub fn failed_stage(&self) -> Option<StageKind> {
        match &self.state {
            RunState::Failed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Statistics about pipeline execution.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Total number of runs driven to a terminal state.
    pub total_runs: u64,
    /// Number of runs that reached Succeeded.
    pub succeeded: u64,
    /// Number of runs that ended Failed.
    pub failed: u64,
    /// Average run duration.
    pub average_duration: Duration,
}

impl PipelineStats {
    /// Creates new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful run.
    fn record_success(&mut self, duration: Duration) {
        self.total_runs += 1;
        self.succeeded += 1;
        self.update_average_duration(duration);
    }

    /// Records a failed run.
    fn record_failure(&mut self, duration: Duration) {
        self.total_runs += 1;
        self.failed += 1;
        self.update_average_duration(duration);
    }

    /// Updates the running average duration.
    fn update_average_duration(&mut self, duration: Duration) {
        if self.total_runs == 1 {
            self.average_duration = duration;
        } else {
            // Incremental average: avg = avg + (new - avg) / n
            let n = self.total_runs as f64;
            let old_avg = self.average_duration.as_secs_f64();
            let new_val = duration.as_secs_f64();
            let new_avg = old_avg + (new_val - old_avg) / n;
            self.average_duration = Duration::from_secs_f64(new_avg);
        }
    }
}

/// Main pipeline orchestrator that drives the four stages.
pub struct PipelineOrchestrator {
    config: PipelineConfig,
    backend: Arc<dyn StageBackend>,
    sink: Arc<dyn RunSink>,
    contract: DatasetContract,
    gate: ReadinessGate,
    stats: RwLock<PipelineStats>,
}

impl PipelineOrchestrator {
    /// Creates an orchestrator talking HTTP to the configured endpoints.
    pub fn new(config: PipelineConfig) -> Self {
        let backend = Arc::new(HttpStageBackend::with_timeout(
            config.endpoints.clone(),
            config.request_timeout,
        ));
        Self::with_backend(config, backend)
    }

    /// Creates an orchestrator over an explicit backend. The seam tests use
    /// to substitute an in-process mock.
    pub fn with_backend(config: PipelineConfig, backend: Arc<dyn StageBackend>) -> Self {
        let gate = ReadinessGate::new(config.readiness_timeout, config.readiness_poll_interval);
        Self {
            config,
            backend,
            sink: Arc::new(NoopSink),
            contract: DatasetContract::default(),
            gate,
            stats: RwLock::new(PipelineStats::new()),
        }
    }

    /// Replaces the tracking sink.
    pub fn with_sink(mut self, sink: Arc<dyn RunSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Gets the current configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Gets a snapshot of the pipeline statistics.
    pub async fn stats(&self) -> PipelineStats {
        self.stats.read().await.clone()
    }

    /// Probes every collaborator's health endpoint once.
    pub async fn probe(&self) -> Vec<StageHealth> {
        self.gate.probe_all(self.backend.as_ref()).await
    }

    /// Drives one full pipeline run.
    ///
    /// Returns `Err(PipelineError::Config)` when the configuration fails
    /// validation; the run never starts. Every in-run failure returns
    /// `Ok(record)` with a `Failed` terminal state naming the stage, so
    /// callers can distinguish "could not start" from "failed at stage X".
    pub async fn run(&self) -> Result<RunRecord, PipelineError> {
        self.config.validate()?;

        let started = Instant::now();
        let mut record = RunRecord::idle();
        info!(
            run_id = %record.run_id,
            technique = %self.config.technique,
            "starting pipeline run"
        );

        self.sink.log_params(&[
            ("run_id", record.run_id.to_string()),
            ("technique", self.config.technique.clone()),
            ("source_path", self.config.source_path.display().to_string()),
            ("holdout_path", self.config.holdout_path.display().to_string()),
        ]);

        let outcome = self.drive(&mut record).await;
        let duration = started.elapsed();

        match outcome {
            Ok(()) => {
                {
                    let mut stats = self.stats.write().await;
                    stats.record_success(duration);
                }
                let record = record.succeeded(duration);
                info!(run_id = %record.run_id, duration = ?duration, "pipeline run succeeded");
                Ok(record)
            }
            Err(err) => match err.failing_stage() {
                Some(stage) => {
                    {
                        let mut stats = self.stats.write().await;
                        stats.record_failure(duration);
                    }
                    let record = record.failed(stage, err.to_string(), duration);
                    error!(
                        run_id = %record.run_id,
                        stage = %stage,
                        reason = %err,
                        "pipeline run failed"
                    );
                    Ok(record)
                }
                // Only configuration errors carry no stage, and those are
                // caught before the run starts.
                None => Err(err),
            },
        }
    }

    /// Runs the gate and the four stages in order, recording outputs as it
    /// goes. The first error aborts the sequence.
    async fn drive(&self, record: &mut RunRecord) -> Result<(), PipelineError> {
        self.gate.await_ready(self.backend.as_ref()).await?;

        record.enter(StageKind::Loader);
        let (processed_path, samples) = self.load_stage(record).await?;

        record.enter(StageKind::Augmenter);
        let augmented_path = self.augment_stage(record, &processed_path, samples).await?;

        record.enter(StageKind::Trainer);
        let model_uri = self.train_stage(record, &augmented_path).await?;

        record.enter(StageKind::Evaluator);
        self.evaluate_stage(record, &model_uri).await?;

        Ok(())
    }

    /// Stage 1: ask the loader to process the source file, then validate the
    /// dataset it declares before anything flows downstream.
    async fn load_stage(
        &self,
        record: &mut RunRecord,
    ) -> Result<(PathBuf, usize), PipelineError> {
        let stage = StageKind::Loader;
        let request = LoadRequest {
            file_path: self.config.source_path.display().to_string(),
        };
        info!(stage = %stage, file_path = %request.file_path, "invoking loader");

        let response = self.backend.load(&request).await?;
        if !response.is_success() {
            return Err(error_status(stage, &response.status, response.message));
        }

        let processed = PathBuf::from(&response.path);
        let dataset = read_dataset(&processed)
            .await
            .map_err(|source| PipelineError::Store { stage, source })?;
        self.contract
            .validate(&dataset)
            .map_err(|source| PipelineError::Contract { stage, source })?;

        if response.samples != 0 && response.samples != dataset.len() {
            return Err(PipelineError::StageFailed {
                stage,
                reason: format!(
                    "loader declared {} samples but {} are on disk",
                    response.samples,
                    dataset.len()
                ),
            });
        }

        info!(
            stage = %stage,
            samples = dataset.len(),
            path = %processed.display(),
            "dataset loaded and validated"
        );
        record.processed_path = Some(processed.clone());
        Ok((processed, dataset.len()))
    }

    /// Stage 2: forward the loader's output to the augmenter, then validate
    /// the augmented dataset and check it preserved the sample count.
    async fn augment_stage(
        &self,
        record: &mut RunRecord,
        input_path: &Path,
        input_samples: usize,
    ) -> Result<PathBuf, PipelineError> {
        let stage = StageKind::Augmenter;
        let request = AugmentRequest {
            technique: self.config.technique.clone(),
            params: self.config.technique_params(),
            input_path: input_path.display().to_string(),
            output_path: self.config.augmented_path.display().to_string(),
        };
        info!(stage = %stage, technique = %request.technique, "invoking augmenter");

        let result = self.backend.augment(&request).await?;
        if !result.is_success() {
            return Err(error_status(stage, &result.status, result.message));
        }

        let augmented = PathBuf::from(&result.output_path);
        let dataset = read_dataset(&augmented)
            .await
            .map_err(|source| PipelineError::Store { stage, source })?;
        self.contract
            .validate(&dataset)
            .map_err(|source| PipelineError::Contract { stage, source })?;

        if dataset.len() != input_samples {
            return Err(PipelineError::Contract {
                stage,
                source: ContractError::ShapeMismatch(format!(
                    "augmentation changed the sample count: {} in, {} out",
                    input_samples,
                    dataset.len()
                )),
            });
        }
        if result.output_samples != 0 && result.output_samples != dataset.len() {
            return Err(PipelineError::Contract {
                stage,
                source: ContractError::ShapeMismatch(format!(
                    "augmenter declared {} output samples but {} are on disk",
                    result.output_samples,
                    dataset.len()
                )),
            });
        }

        info!(
            stage = %stage,
            mix_ratio = result.mix_ratio,
            samples = dataset.len(),
            "augmentation complete"
        );
        self.sink.log_metrics(&[("mix_ratio", result.mix_ratio)]);
        self.sink.log_artifact("augmented_dataset", &augmented);
        record.augmented_path = Some(augmented.clone());
        record.mix_ratio = Some(result.mix_ratio);
        Ok(augmented)
    }

    /// Stage 3: train on the augmented dataset. The trainer must declare a
    /// non-empty model reference.
    async fn train_stage(
        &self,
        record: &mut RunRecord,
        data_path: &Path,
    ) -> Result<String, PipelineError> {
        let stage = StageKind::Trainer;
        let request = TrainRequest {
            data_path: data_path.display().to_string(),
        };
        info!(stage = %stage, data_path = %request.data_path, "invoking trainer");

        let response = self.backend.train(&request).await?;
        if !response.is_success() {
            return Err(error_status(stage, &response.status, response.message));
        }
        if response.model_uri.is_empty() {
            return Err(PipelineError::StageFailed {
                stage,
                reason: "trainer returned an empty model reference".to_string(),
            });
        }

        if let Some(accuracy) = response.accuracy {
            debug!(stage = %stage, accuracy, "trainer reported training accuracy");
        }
        info!(stage = %stage, model_uri = %response.model_uri, "model trained");
        record.model_uri = Some(response.model_uri.clone());
        Ok(response.model_uri)
    }

    /// Stage 4: evaluate the model against the configured holdout set. The
    /// metrics mapping must contain the accuracy key.
    async fn evaluate_stage(
        &self,
        record: &mut RunRecord,
        model_uri: &str,
    ) -> Result<(), PipelineError> {
        let stage = StageKind::Evaluator;
        let request = EvaluateRequest {
            data_path: self.config.holdout_path.display().to_string(),
            model_uri: model_uri.to_string(),
        };
        info!(stage = %stage, model_uri = %request.model_uri, "invoking evaluator");

        let response = self.backend.evaluate(&request).await?;
        if !response.is_success() {
            return Err(error_status(stage, &response.status, response.message));
        }
        if !response.metrics.contains_key(ACCURACY_KEY) {
            return Err(PipelineError::StageFailed {
                stage,
                reason: format!("metrics are missing the '{}' key", ACCURACY_KEY),
            });
        }

        let metric_pairs: Vec<(&str, f64)> = response
            .metrics
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
            .collect();
        self.sink.log_metrics(&metric_pairs);

        info!(
            stage = %stage,
            accuracy = response.metrics[ACCURACY_KEY],
            "evaluation complete"
        );
        record.metrics = response.metrics;
        Ok(())
    }
}

/// Failure for a stage that answered with a non-success status.
fn error_status(stage: StageKind, status: &str, message: Option<String>) -> PipelineError {
    PipelineError::StageFailed {
        stage,
        reason: message.unwrap_or_else(|| format!("stage reported status '{}'", status)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_state_display() {
        assert_eq!(format!("{}", RunState::Idle), "idle");
        assert_eq!(format!("{}", RunState::Loading), "loading");
        assert_eq!(format!("{}", RunState::Augmenting), "augmenting");
        assert_eq!(format!("{}", RunState::Training), "training");
        assert_eq!(format!("{}", RunState::Evaluating), "evaluating");
        assert_eq!(format!("{}", RunState::Succeeded), "succeeded");
        assert_eq!(
            format!(
                "{}",
                RunState::Failed {
                    stage: StageKind::Trainer,
                    reason: "boom".to_string(),
                }
            ),
            "failed-at-stage(trainer)"
        );
    }

    #[test]
    fn test_run_state_running_maps_every_stage() {
        assert_eq!(RunState::running(StageKind::Loader), RunState::Loading);
        assert_eq!(
            RunState::running(StageKind::Augmenter),
            RunState::Augmenting
        );
        assert_eq!(RunState::running(StageKind::Trainer), RunState::Training);
        assert_eq!(
            RunState::running(StageKind::Evaluator),
            RunState::Evaluating
        );
    }

    #[test]
    fn test_run_state_terminal() {
        assert!(!RunState::Idle.is_terminal());
        assert!(!RunState::Training.is_terminal());
        assert!(RunState::Succeeded.is_terminal());
        assert!(RunState::Failed {
            stage: StageKind::Loader,
            reason: "x".to_string(),
        }
        .is_terminal());
    }

    #[test]
    fn test_run_record_lifecycle() {
        let mut record = RunRecord::idle();
        assert_eq!(record.state, RunState::Idle);
        assert!(record.finished_at.is_none());
        assert!(record.error.is_none());

        record.enter(StageKind::Augmenter);
        assert_eq!(record.state, RunState::Augmenting);

        let duration = Duration::from_secs(12);
        let record = record.succeeded(duration);
        assert!(record.is_success());
        assert!(record.failed_stage().is_none());
        assert!(record.finished_at.is_some());
        assert_eq!(record.duration, duration);
    }

    #[test]
    fn test_run_record_failed() {
        let record = RunRecord::idle().failed(
            StageKind::Evaluator,
            "metrics are missing the 'accuracy' key",
            Duration::from_secs(3),
        );
        assert!(!record.is_success());
        assert_eq!(record.failed_stage(), Some(StageKind::Evaluator));
        assert!(record.error.as_deref().unwrap().contains("accuracy"));
        assert_eq!(format!("{}", record.state), "failed-at-stage(evaluator)");
    }

    #[test]
    fn test_run_record_serializes_to_json() {
        let record = RunRecord::idle().failed(
            StageKind::Trainer,
            "trainer returned an empty model reference",
            Duration::from_secs(1),
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["state"]["failed"]["stage"], "trainer");
        assert!(json["error"].as_str().unwrap().contains("model reference"));
    }

    #[test]
    fn test_pipeline_stats() {
        let mut stats = PipelineStats::new();
        assert_eq!(stats.total_runs, 0);

        stats.record_success(Duration::from_secs(60));
        assert_eq!(stats.total_runs, 1);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.average_duration.as_secs(), 60);

        stats.record_failure(Duration::from_secs(30));
        assert_eq!(stats.total_runs, 2);
        assert_eq!(stats.failed, 1);
        // Average should be (60 + 30) / 2 = 45
        assert_eq!(stats.average_duration.as_secs(), 45);
    }

    #[test]
    fn test_failing_stage_attribution() {
        let config_err = PipelineError::Config(
            super::super::config::ConfigError::ValidationFailed("technique".to_string()),
        );
        assert!(config_err.failing_stage().is_none());

        let gate_err = PipelineError::NotReady(ReadinessTimeout {
            stage: StageKind::Trainer,
            waited: Duration::from_secs(30),
        });
        assert_eq!(gate_err.failing_stage(), Some(StageKind::Trainer));

        let contract_err = PipelineError::Contract {
            stage: StageKind::Augmenter,
            source: ContractError::EmptyDataset,
        };
        assert_eq!(contract_err.failing_stage(), Some(StageKind::Augmenter));

        let transport_err = PipelineError::Stage(StageError::Api {
            stage: StageKind::Evaluator,
            code: 500,
            message: "internal".to_string(),
        });
        assert_eq!(transport_err.failing_stage(), Some(StageKind::Evaluator));
    }

    #[tokio::test]
    async fn test_run_rejects_invalid_config() {
        let config = PipelineConfig::new().with_technique("");
        let orchestrator = PipelineOrchestrator::new(config);

        let err = orchestrator.run().await.unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
        assert!(err.failing_stage().is_none());

        let stats = orchestrator.stats().await;
        assert_eq!(stats.total_runs, 0);
    }
}
