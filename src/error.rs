//! Error types for augflow operations.
//!
//! Defines error types for the major subsystems:
//! - Dataset contract validation (shapes, labels, reshaping)
//! - Dataset file storage and CSV ingestion
//! - Augmentation techniques and the augmentation engine
//! - Stage collaborator HTTP interactions

use std::path::PathBuf;

use thiserror::Error;

use crate::stage::StageKind;

/// Errors raised by the dataset contract validator.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ContractError {
    #[error("dataset contains no samples")]
    EmptyDataset,

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("label {label} at row {row} outside class range 0..={max_class}")]
    LabelOutOfRange {
        row: usize,
        label: i64,
        max_class: i64,
    },
}

/// Errors that can occur during dataset file operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("dataset file not found: {0}")]
    NotFound(PathBuf),

    #[error("corrupt dataset file '{path}': {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("malformed CSV: {0}")]
    MalformedCsv(String),

    #[error("contract violation: {0}")]
    Contract(#[from] ContractError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by the augmentation engine.
#[derive(Debug, Error)]
pub enum AugmentError {
    #[error("unknown augmentation technique '{0}'")]
    UnknownTechnique(String),

    #[error("mixing requires at least 2 samples, got {0}")]
    InsufficientSamples(usize),

    #[error("invalid parameters for technique '{technique}': {message}")]
    InvalidParams { technique: String, message: String },

    #[error("contract violation: {0}")]
    Contract(#[from] ContractError),
}

/// Errors that can occur while talking to a stage collaborator.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("request to {stage} failed: {message}")]
    RequestFailed { stage: StageKind, message: String },

    #[error("{stage} returned HTTP {code}: {message}")]
    Api {
        stage: StageKind,
        code: u16,
        message: String,
    },

    #[error("failed to parse {stage} response: {message}")]
    ParseError { stage: StageKind, message: String },
}

impl StageError {
    /// Stage the error is attributed to.
    pub fn stage(&self) -> StageKind {
        match self {
            StageError::RequestFailed { stage, .. }
            | StageError::Api { stage, .. }
            | StageError::ParseError { stage, .. } => *stage,
        }
    }
}
