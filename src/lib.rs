//! augflow: batch ML data pipeline with a deterministic augmentation engine.
//!
//! This library drives a dataset through four HTTP stage collaborators
//! (load, augment, train, evaluate) and provides the augmentation engine
//! and dataset contract the pipeline enforces between stages.

// Core modules
pub mod augment;
pub mod cli;
pub mod dataset;
pub mod error;
pub mod pipeline;
pub mod stage;
pub mod tracking;

// Re-export commonly used error types
pub use error::{AugmentError, ContractError, StageError, StoreError};
