//! Orchestrator - 境界層（CLI / HTTP など）から見た唯一の窓口
//!
//! ID は境界では文字列で受け取る。形式不正な ID も NotFound として扱う
//! （ジョブを作ることは決してない）。

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::error::OrchestratorError;
use super::reaper_loop::ReaperLoop;
use super::registry::JobRegistry;
use super::status::JobCounts;
use crate::channel::EventStream;
use crate::config::OrchestratorConfig;
use crate::domain::{JobId, JobSnapshot, JobStatus};

/// Service name reported by [`Orchestrator::health`].
pub const SERVICE_NAME: &str = "tether";

/// Acknowledgement of a cancel request. The job may still be running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelAck {
    pub ok: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub service: String,
    pub status: String,
}

#[derive(Clone)]
pub struct Orchestrator {
    registry: Arc<JobRegistry>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub(crate) fn new(registry: Arc<JobRegistry>, config: OrchestratorConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Start a job and return its snapshot without waiting for the task.
    pub async fn start(&self, input: serde_json::Value) -> JobSnapshot {
        self.registry.create(input).await.snapshot()
    }

    /// Start a job that is cancelled if it has not finished within `deadline`.
    pub async fn start_with_deadline(
        &self,
        input: serde_json::Value,
        deadline: Duration,
    ) -> JobSnapshot {
        self.registry
            .create_with_deadline(input, Some(deadline))
            .await
            .snapshot()
    }

    pub async fn status(&self, id: &str) -> Result<JobSnapshot, OrchestratorError> {
        self.registry.get(parse_id(id)?).await
    }

    /// Replay of every event so far, then live events until the job ends.
    pub async fn events(&self, id: &str) -> Result<EventStream, OrchestratorError> {
        self.registry.subscribe_events(parse_id(id)?).await
    }

    pub async fn cancel(&self, id: &str) -> Result<CancelAck, OrchestratorError> {
        self.registry.request_cancel(parse_id(id)?).await?;
        Ok(CancelAck { ok: true })
    }

    pub async fn list(&self, status: Option<JobStatus>) -> Vec<JobSnapshot> {
        self.registry.list(status).await
    }

    pub async fn counts(&self) -> JobCounts {
        self.registry.counts().await
    }

    pub fn health(&self) -> Health {
        Health {
            service: SERVICE_NAME.to_string(),
            status: "ok".to_string(),
        }
    }

    /// Spawn the reaper when a retention period is configured.
    pub fn spawn_reaper(&self, shutdown: CancellationToken) -> Option<JoinHandle<()>> {
        let retention = self.config.retention?;
        let reaper = ReaperLoop::new(
            Arc::clone(&self.registry),
            retention,
            self.config.reap_interval,
        );
        Some(tokio::spawn(reaper.run(shutdown)))
    }
}

fn parse_id(id: &str) -> Result<JobId, OrchestratorError> {
    id.parse()
        .map_err(|_| OrchestratorError::NotFound(id.to_string()))
}
