//! Pipeline orchestration for the four-stage batch run.
//!
//! This module provides the infrastructure for driving a dataset through
//! load, augment, train and evaluate against four HTTP stage collaborators.
//!
//! # Architecture
//!
//! The pipeline consists of several components:
//!
//! - **Orchestrator**: The coordinator that drives the stage sequence
//! - **Readiness gate**: Health probing before the first stage runs
//! - **Config**: Configuration for endpoints, paths and the technique
//!
//! # Pipeline Flow
//!
//! 1. **Validation**: The configuration is validated; nothing runs on error
//! 2. **Readiness**: Every collaborator must answer its health probe
//! 3. **Loading**: The loader processes the source file into a dataset
//! 4. **Augmenting**: The augmenter applies the configured technique
//! 5. **Training**: The trainer fits a model on the augmented dataset
//! 6. **Evaluating**: The evaluator scores the model on the holdout set
//!
//! Between stages the orchestrator reads each declared output back and
//! validates it under the dataset contract, so a partially-written or
//! malformed stage output never flows downstream. The first failure ends
//! the run with a stage-attributed reason; nothing is retried.
//!
//! # Example
//!
//! ```rust,ignore
//! use augflow::pipeline::{PipelineConfig, PipelineOrchestrator};
//!
//! // Via builder pattern
//! let config = PipelineConfig::new()
//!     .with_source_path("data/raw.csv")
//!     .with_technique("mixing")
//!     .with_beta(0.4);
//!
//! // Via environment variables
//! let config = PipelineConfig::from_env()?;
//!
//! let orchestrator = PipelineOrchestrator::new(config);
//! let record = orchestrator.run().await?;
//!
//! println!("Run {} finished: {}", record.run_id, record.state);
//! for (name, value) in &record.metrics {
//!     println!("{} = {}", name, value);
//! }
//! ```

pub mod config;
pub mod orchestrator;
pub mod readiness;

// Re-export main types for convenience
pub use config::{ConfigError, PipelineConfig};
pub use orchestrator::{
    PipelineError, PipelineOrchestrator, PipelineStats, RunRecord, RunState, ACCURACY_KEY,
};
pub use readiness::{ReadinessGate, ReadinessTimeout, StageHealth};
