//! JobRegistry - プロセス内の全ジョブ表
//!
//! # 設計
//! - 共有される可変コレクションはこの map だけ
//! - map のロックは挿入・検索・削除の間だけ持つ（ジョブ個別の状態は各 Job のロック）
//! - status/result/error を書くのは TaskRunner だけ、cancel_requested を書くのは cancel 要求だけ

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use super::error::OrchestratorError;
use super::job::Job;
use super::runner::TaskRunner;
use super::status::JobCounts;
use crate::channel::EventStream;
use crate::domain::{JobId, JobSnapshot, JobStatus};
use crate::ports::{Clock, IdGenerator};

pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Arc<Job>>>,
    runner: Arc<TaskRunner>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    default_deadline: Option<Duration>,
}

impl JobRegistry {
    pub fn new(runner: Arc<TaskRunner>, ids: Arc<dyn IdGenerator>, clock: Arc<dyn Clock>) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            runner,
            ids,
            clock,
            default_deadline: None,
        }
    }

    /// Deadline applied by `create` when the caller gives none.
    pub fn with_default_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.default_deadline = deadline;
        self
    }

    /// Register a new `queued` job and spawn its runner. Never waits on the task.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn create(&self, input: serde_json::Value) -> Arc<Job> {
        self.create_with_deadline(input, self.default_deadline).await
    }

    /// Like `create`, but requests cancellation once `deadline` elapses.
    pub async fn create_with_deadline(
        &self,
        input: serde_json::Value,
        deadline: Option<Duration>,
    ) -> Arc<Job> {
        let job = {
            let mut jobs = self.jobs.write().await;
            let mut id = self.ids.generate_job_id();
            while jobs.contains_key(&id) {
                id = self.ids.generate_job_id();
            }
            let job = Arc::new(Job::new(id, input, Arc::clone(&self.clock)));
            jobs.insert(id, Arc::clone(&job));
            job
        };
        tracing::info!(job_id = %job.id(), deadline_ms = deadline.map(|d| d.as_millis() as u64), "job created");

        let runner = Arc::clone(&self.runner);
        let run = Arc::clone(&job);
        tokio::spawn(async move { runner.run(run).await });

        if let Some(deadline) = deadline {
            spawn_deadline(Arc::clone(&job), deadline);
        }
        job
    }

    /// Live handle of a job.
    pub async fn job(&self, id: JobId) -> Result<Arc<Job>, OrchestratorError> {
        self.jobs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| OrchestratorError::NotFound(id.to_string()))
    }

    pub async fn get(&self, id: JobId) -> Result<JobSnapshot, OrchestratorError> {
        Ok(self.job(id).await?.snapshot())
    }

    /// Flag the job for cancellation and return immediately.
    ///
    /// Idempotent. The runner observes the flag asynchronously; terminal jobs
    /// keep their status.
    pub async fn request_cancel(&self, id: JobId) -> Result<(), OrchestratorError> {
        let job = self.job(id).await?;
        if job.request_cancel() {
            tracing::info!(job_id = %id, status = %job.status(), "cancellation requested");
        }
        Ok(())
    }

    pub async fn subscribe_events(&self, id: JobId) -> Result<EventStream, OrchestratorError> {
        Ok(self.job(id).await?.subscribe().into_stream())
    }

    /// Snapshots in creation order, optionally filtered by status.
    pub async fn list(&self, status: Option<JobStatus>) -> Vec<JobSnapshot> {
        let mut snapshots: Vec<JobSnapshot> = self
            .jobs
            .read()
            .await
            .values()
            .map(|job| job.snapshot())
            .filter(|snap| status.is_none_or(|s| snap.status == s))
            .collect();
        snapshots.sort_by_key(|snap| snap.id);
        snapshots
    }

    pub async fn counts(&self) -> JobCounts {
        self.jobs
            .read()
            .await
            .values()
            .map(|job| job.status())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop terminal jobs that ended at least `retention` ago.
    ///
    /// Returns the number of evicted jobs. Non-terminal jobs are never evicted.
    pub async fn reap_expired(&self, retention: Duration) -> usize {
        let retention = chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::MAX);
        let now = self.clock.now();
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| match job.ended_at() {
            Some(ended_at) => now.signed_duration_since(ended_at) < retention,
            None => true,
        });
        let evicted = before - jobs.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = jobs.len(), "reaped expired jobs");
        }
        evicted
    }
}

fn spawn_deadline(job: Arc<Job>, deadline: Duration) {
    tokio::spawn(async move {
        tokio::select! {
            _ = job.finished() => {}
            _ = tokio::time::sleep(deadline) => {
                if job.request_cancel() {
                    tracing::info!(job_id = %job.id(), deadline_ms = deadline.as_millis() as u64, "deadline exceeded; cancellation requested");
                }
            }
        }
    });
}
