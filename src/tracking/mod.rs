//! Run tracking.
//!
//! The orchestrator reports parameters, metrics and artifacts through an
//! injected [`RunSink`] so a run never depends on a global tracking
//! lifecycle. Production runs use [`TracingSink`]; tests and library
//! embedders can pass [`NoopSink`] or their own recorder.

use std::path::Path;

use tracing::info;

/// Receives run-level parameters, metrics and artifacts.
pub trait RunSink: Send + Sync {
    /// Record string parameters for the run.
    fn log_params(&self, params: &[(&str, String)]);

    /// Record numeric metrics.
    fn log_metrics(&self, metrics: &[(&str, f64)]);

    /// Record a produced artifact by label and location.
    fn log_artifact(&self, label: &str, path: &Path);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl RunSink for NoopSink {
    fn log_params(&self, _params: &[(&str, String)]) {}

    fn log_metrics(&self, _metrics: &[(&str, f64)]) {}

    fn log_artifact(&self, _label: &str, _path: &Path) {}
}

/// Emits everything through the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl RunSink for TracingSink {
    fn log_params(&self, params: &[(&str, String)]) {
        for (key, value) in params {
            info!(param = *key, value = %value, "run parameter");
        }
    }

    fn log_metrics(&self, metrics: &[(&str, f64)]) {
        for (key, value) in metrics {
            info!(metric = *key, value, "run metric");
        }
    }

    fn log_artifact(&self, label: &str, path: &Path) {
        info!(artifact = label, path = %path.display(), "run artifact");
    }
}
