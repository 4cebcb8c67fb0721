//! Command-line interface for augflow.
//!
//! Provides commands for driving the pipeline, probing stage readiness,
//! and converting, augmenting and validating dataset files locally.

mod commands;

pub use commands::{parse_cli, run, run_with_cli};
