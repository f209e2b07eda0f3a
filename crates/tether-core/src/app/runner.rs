//! TaskRunner - 1 ジョブ = 1 回の外部タスク実行
//!
//! # フロー
//! 1. `queued -> running` + `started` イベント
//! 2. チェックポイント（開始前にキャンセル済みなら即 `cancelled`）
//! 3. 外部タスクを別 tokio task で実行（panic を JoinError として捕まえる）
//! 4. 結果 / エラー / キャンセルのどれかで終端させ、チャネルを閉じる
//!
//! # 重要
//! - 外部タスクを待っている間、共有ロックは一切持たない
//! - どの経路でも（panic、runner 自体の drop を含め）ジョブは必ず終端に達する

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};

use super::job::{Finish, Job};
use crate::domain::{Cancelled, JobError, JobStatus, TaskError};
use crate::ports::{ProgressReporter, TaskContext, TaskExecutor};

type TaskResult = Result<serde_json::Value, TaskError>;

/// Bridges task progress callbacks into the job's event channel.
struct JobProgress {
    job: Arc<Job>,
}

impl ProgressReporter for JobProgress {
    fn report(&self, payload: serde_json::Value) -> Result<(), Cancelled> {
        let checkpoint = self.job.progress(payload);
        if checkpoint.is_err() {
            tracing::debug!(job_id = %self.job.id(), "progress dropped: cancellation requested");
        }
        checkpoint
    }
}

/// Fails the job with `internal_fault` if the runner goes away before finishing it.
struct FinalizeGuard {
    job: Option<Arc<Job>>,
}

impl FinalizeGuard {
    fn new(job: Arc<Job>) -> Self {
        Self { job: Some(job) }
    }

    fn disarm(&mut self) {
        self.job = None;
    }
}

impl Drop for FinalizeGuard {
    fn drop(&mut self) {
        let Some(job) = self.job.take() else {
            return;
        };
        if job.status().is_terminal() {
            return;
        }
        tracing::error!(job_id = %job.id(), "task runner exited without finalizing the job");
        let _ = job.finish(Finish::Failed(JobError::internal_fault(
            "task runner exited without finalizing the job",
        )));
    }
}

/// Executes one external task invocation per job.
pub struct TaskRunner {
    executor: Arc<dyn TaskExecutor>,
    cancel_grace: Duration,
}

impl TaskRunner {
    pub fn new(executor: Arc<dyn TaskExecutor>, cancel_grace: Duration) -> Self {
        Self {
            executor,
            cancel_grace,
        }
    }

    /// Run `job` to a terminal status. Meant to be spawned.
    pub async fn run(&self, job: Arc<Job>) {
        let mut guard = FinalizeGuard::new(Arc::clone(&job));

        if let Err(e) = job.start() {
            // 既に終端（起動前に別経路で閉じられた）なら何もしない
            tracing::warn!(job_id = %job.id(), error = %e, "job could not start");
            guard.disarm();
            return;
        }
        tracing::info!(job_id = %job.id(), "job started");

        let finish = if job.cancel_requested() {
            tracing::debug!(job_id = %job.id(), "cancelled before the task was invoked");
            Some(Finish::Cancelled)
        } else {
            self.drive(&job).await
        };
        if let Some(finish) = finish {
            finalize(&job, finish);
        }
        guard.disarm();
    }

    /// Invoke the task and wait for it or for cancellation.
    ///
    /// Returns `None` when the job was already finalized here (cancel path).
    async fn drive(&self, job: &Arc<Job>) -> Option<Finish> {
        let token = job.cancellation_token();
        let ctx = TaskContext::new(
            job.id(),
            Arc::new(JobProgress {
                job: Arc::clone(job),
            }),
            token.clone(),
        );
        let executor = Arc::clone(&self.executor);
        let input = job.input();
        let mut handle: JoinHandle<TaskResult> =
            tokio::spawn(async move { executor.execute(input, ctx).await });

        tokio::select! {
            joined = &mut handle => return Some(outcome(joined)),
            _ = token.cancelled() => {}
        }

        // 先に終端させてから、タスクに後始末の猶予を与える
        finalize(job, Finish::Cancelled);
        self.wind_down(job, handle).await;
        None
    }

    /// Give a cancelled task `cancel_grace` to return, then abort it. Its
    /// outcome is discarded either way.
    async fn wind_down(&self, job: &Job, mut handle: JoinHandle<TaskResult>) {
        match tokio::time::timeout(self.cancel_grace, &mut handle).await {
            Ok(_) => tracing::debug!(job_id = %job.id(), "cancelled task wound down"),
            Err(_) => {
                tracing::warn!(
                    job_id = %job.id(),
                    grace_ms = self.cancel_grace.as_millis() as u64,
                    "cancelled task ignored shutdown request; aborting"
                );
                handle.abort();
            }
        }
    }
}

fn outcome(joined: Result<TaskResult, JoinError>) -> Finish {
    match joined {
        Ok(Ok(result)) => Finish::Succeeded(result),
        // 実際にキャンセル要求があれば Job::finish が cancelled に読み替える
        Ok(Err(TaskError::Cancelled(_))) => Finish::Failed(JobError::task_failure(
            "task stopped on cancellation that was never requested",
        )),
        Ok(Err(TaskError::Failed(message))) => Finish::Failed(JobError::task_failure(message)),
        Err(e) if e.is_panic() => Finish::Failed(JobError::internal_fault(format!(
            "task panicked: {}",
            panic_message(e.into_panic())
        ))),
        Err(e) => Finish::Failed(JobError::internal_fault(format!("task aborted: {e}"))),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn finalize(job: &Job, finish: Finish) {
    match job.finish(finish) {
        Ok(status) => log_terminal(job, status),
        Err(e) => tracing::warn!(job_id = %job.id(), error = %e, "terminal transition rejected"),
    }
}

fn log_terminal(job: &Job, status: JobStatus) {
    match status {
        JobStatus::Failed => {
            let error = job.snapshot().error;
            tracing::warn!(job_id = %job.id(), %status, ?error, "job finished");
        }
        _ => tracing::info!(job_id = %job.id(), %status, "job finished"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorKind, EventKind, JobId};
    use crate::ports::SystemClock;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use ulid::Ulid;

    struct Immediate(Value);

    #[async_trait]
    impl TaskExecutor for Immediate {
        async fn execute(&self, _input: Value, _ctx: TaskContext) -> TaskResult {
            Ok(self.0.clone())
        }
    }

    struct Panics;

    #[async_trait]
    impl TaskExecutor for Panics {
        async fn execute(&self, _input: Value, _ctx: TaskContext) -> TaskResult {
            panic!("driver crashed");
        }
    }

    /// Ignores cancellation entirely.
    struct Stubborn;

    #[async_trait]
    impl TaskExecutor for Stubborn {
        async fn execute(&self, _input: Value, _ctx: TaskContext) -> TaskResult {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(json!("never"))
        }
    }

    fn job() -> Arc<Job> {
        Arc::new(Job::new(
            JobId::from_ulid(Ulid::new()),
            json!({"task": "noop"}),
            Arc::new(SystemClock),
        ))
    }

    fn runner(executor: impl TaskExecutor + 'static) -> TaskRunner {
        TaskRunner::new(Arc::new(executor), Duration::from_millis(50))
    }

    #[tokio::test]
    async fn immediate_success() {
        let job = job();
        runner(Immediate(json!({"ok": true}))).run(Arc::clone(&job)).await;

        let snap = job.snapshot();
        assert_eq!(snap.status, JobStatus::Succeeded);
        assert_eq!(snap.result, Some(json!({"ok": true})));
        assert!(snap.ended_at.is_some());
    }

    #[tokio::test]
    async fn panic_becomes_internal_fault() {
        let job = job();
        runner(Panics).run(Arc::clone(&job)).await;

        let snap = job.snapshot();
        assert_eq!(snap.status, JobStatus::Failed);
        let error = snap.error.unwrap();
        assert_eq!(error.kind, ErrorKind::InternalFault);
        assert!(error.message.contains("driver crashed"));
        assert_eq!(
            job.channel().backlog().last().map(|r| r.kind),
            Some(EventKind::Failed)
        );
    }

    #[tokio::test]
    async fn cancel_before_run_skips_the_task() {
        let job = job();
        job.request_cancel();
        runner(Panics).run(Arc::clone(&job)).await;

        assert_eq!(job.status(), JobStatus::Cancelled);
        let kinds: Vec<_> = job.channel().backlog().iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![EventKind::Started]);
    }

    #[tokio::test]
    async fn stubborn_task_is_aborted_after_grace() {
        let job = job();
        let run = {
            let job = Arc::clone(&job);
            tokio::spawn(async move { runner(Stubborn).run(job).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        job.request_cancel();

        tokio::time::timeout(Duration::from_secs(2), run)
            .await
            .expect("runner returns after the grace period")
            .unwrap();
        assert_eq!(job.status(), JobStatus::Cancelled);
        assert!(job.channel().is_closed());
    }

    #[tokio::test]
    async fn dropped_runner_fails_the_job() {
        let job = job();
        let run = {
            let job = Arc::clone(&job);
            tokio::spawn(async move { runner(Stubborn).run(job).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(job.status(), JobStatus::Running);

        run.abort();
        let _ = run.await;

        let snap = job.snapshot();
        assert_eq!(snap.status, JobStatus::Failed);
        assert_eq!(snap.error.map(|e| e.kind), Some(ErrorKind::InternalFault));
    }

    #[test]
    fn panic_message_handles_both_string_kinds() {
        assert_eq!(panic_message(Box::new("static")), "static");
        assert_eq!(panic_message(Box::new(String::from("owned"))), "owned");
        assert_eq!(panic_message(Box::new(42_u8)), "non-string panic payload");
    }
}
