//! Readiness gate.
//!
//! Before stage 1 runs, every collaborator must answer its health probe.
//! Stages are polled concurrently, each against the same per-stage timeout;
//! a gate failure names the first unready stage in execution order and the
//! pipeline never invokes any stage.

use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::stage::{StageBackend, StageKind};

/// A stage failed to become ready within its timeout.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("stage '{stage}' not ready after {waited:?}")]
pub struct ReadinessTimeout {
    pub stage: StageKind,
    pub waited: Duration,
}

/// One-shot health snapshot for a stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageHealth {
    pub stage: StageKind,
    pub ready: bool,
}

/// Polls collaborator health endpoints until all are ready.
#[derive(Debug, Clone, Copy)]
pub struct ReadinessGate {
    timeout: Duration,
    poll_interval: Duration,
}

impl ReadinessGate {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    /// Block until every stage reports healthy.
    ///
    /// On failure the earliest stage in execution order is reported, even
    /// when several stages are down.
    pub async fn await_ready(&self, backend: &dyn StageBackend) -> Result<(), ReadinessTimeout> {
        let probes = StageKind::ALL.map(|stage| self.await_stage(backend, stage));
        let results = join_all(probes).await;

        for result in results {
            result?;
        }

        info!("all stages ready");
        Ok(())
    }

    async fn await_stage(
        &self,
        backend: &dyn StageBackend,
        stage: StageKind,
    ) -> Result<(), ReadinessTimeout> {
        let started = Instant::now();
        loop {
            if backend.check_health(stage).await {
                debug!(stage = %stage, waited = ?started.elapsed(), "stage ready");
                return Ok(());
            }
            if started.elapsed() >= self.timeout {
                return Err(ReadinessTimeout {
                    stage,
                    waited: started.elapsed(),
                });
            }
            sleep(self.poll_interval).await;
        }
    }

    /// Probe every stage once, without waiting for readiness.
    pub async fn probe_all(&self, backend: &dyn StageBackend) -> Vec<StageHealth> {
        let probes = StageKind::ALL.map(|stage| async move {
            StageHealth {
                stage,
                ready: backend.check_health(stage).await,
            }
        });
        join_all(probes).await
    }
}
