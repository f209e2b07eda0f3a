//! TaskExecutor port - ジョブの中で実際に動く外部タスク
//!
//! ブラウザ操作や LLM 呼び出しなど、中身はコアの関心外。
//! コアが知っているのは「input を受け取り、進捗を報告し、結果かエラーを返す」ことだけ。

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::errors::{Cancelled, TaskError};
use crate::domain::ids::JobId;
use crate::ports::ProgressReporter;

/// Everything a task gets from the runner besides its input.
#[derive(Clone)]
pub struct TaskContext {
    job_id: JobId,
    progress: Arc<dyn ProgressReporter>,
    cancel: CancellationToken,
}

impl TaskContext {
    pub fn new(
        job_id: JobId,
        progress: Arc<dyn ProgressReporter>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            job_id,
            progress,
            cancel,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Report intermediate progress. Doubles as a cancellation checkpoint.
    pub fn report(&self, payload: serde_json::Value) -> Result<(), Cancelled> {
        self.progress.report(payload)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the job's cancellation has been requested.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Token for tasks that want to hand cancellation further down (child
    /// processes, HTTP clients, ...).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// The external automated task run inside a job.
///
/// Implementations should treat `ctx.report(..)` returning `Err(Cancelled)`
/// or `ctx.cancelled()` resolving as a request to stop. Tasks that ignore it
/// are aborted after the runner's grace period and their outcome is discarded.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(
        &self,
        input: serde_json::Value,
        ctx: TaskContext,
    ) -> Result<serde_json::Value, TaskError>;
}
