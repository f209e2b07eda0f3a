//! Live job: record + event channel + cancellation handle.
//!
//! Lock discipline:
//! - `record` is held only for short, synchronous sections (never across `.await`).
//! - Lock order is always `record` -> channel log. The channel never touches `record`.
//! - Status change and channel close happen under the same `record` lock, so a
//!   reader never sees a terminal status with an open channel or vice versa.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::channel::{CloseSignal, EventChannel, EventSubscription};
use crate::domain::{
    Cancelled, EventKind, JobError, JobId, JobRecord, JobSnapshot, JobStatus, TransitionError,
};
use crate::ports::Clock;

/// How the runner wants to finish a job.
#[derive(Debug, Clone, PartialEq)]
pub enum Finish {
    Succeeded(serde_json::Value),
    Failed(JobError),
    Cancelled,
}

pub struct Job {
    id: JobId,
    record: Mutex<JobRecord>,
    channel: EventChannel,
    cancel: CancellationToken,
    done: CancellationToken,
    clock: Arc<dyn Clock>,
}

impl Job {
    pub(crate) fn new(id: JobId, input: serde_json::Value, clock: Arc<dyn Clock>) -> Self {
        Self {
            id,
            record: Mutex::new(JobRecord::new(id, input, clock.now())),
            channel: EventChannel::new(Arc::clone(&clock)),
            cancel: CancellationToken::new(),
            done: CancellationToken::new(),
            clock,
        }
    }

    fn record(&self) -> MutexGuard<'_, JobRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.record().snapshot()
    }

    pub fn status(&self) -> JobStatus {
        self.record().status
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.record().ended_at
    }

    pub fn input(&self) -> serde_json::Value {
        self.record().input.clone()
    }

    pub fn cancel_requested(&self) -> bool {
        self.record().cancel_requested
    }

    pub fn subscribe(&self) -> EventSubscription {
        self.channel.subscribe()
    }

    pub fn channel(&self) -> &EventChannel {
        &self.channel
    }

    /// Set the cancellation flag and wake the runner.
    ///
    /// Returns `true` on the first request. Terminal jobs keep their status.
    pub fn request_cancel(&self) -> bool {
        let first = self.record().request_cancel();
        if first {
            self.cancel.cancel();
        }
        first
    }

    pub(crate) fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Resolves once the job has reached a terminal status.
    pub async fn finished(&self) {
        self.done.cancelled().await
    }

    /// `queued -> running`, then the `started` event.
    pub(crate) fn start(&self) -> Result<(), TransitionError> {
        let mut record = self.record();
        record.mark_running(self.clock.now())?;
        let payload = json!({ "job_id": self.id, "input": record.input });
        // 開始前に閉じられることはない（閉じるのは finish だけ）
        let _ = self.channel.publish(EventKind::Started, payload);
        Ok(())
    }

    /// Cancellation checkpoint + `progress` event.
    ///
    /// The flag is read under the same lock `request_cancel` writes it, so no
    /// progress record can follow a cancel request.
    pub(crate) fn progress(&self, payload: serde_json::Value) -> Result<(), Cancelled> {
        let record = self.record();
        if record.cancel_requested || record.status.is_terminal() {
            return Err(Cancelled);
        }
        let _ = self.channel.publish(EventKind::Progress, payload);
        Ok(())
    }

    /// Move to a terminal status and close the channel, atomically.
    ///
    /// A job whose cancellation was requested always ends `cancelled`, whatever
    /// the task produced.
    pub(crate) fn finish(&self, finish: Finish) -> Result<JobStatus, TransitionError> {
        let status = {
            let mut record = self.record();
            let now = self.clock.now();
            let finish = if record.cancel_requested {
                Finish::Cancelled
            } else {
                finish
            };
            let signal = match finish {
                Finish::Succeeded(result) => {
                    let payload = crate::domain::outcome::completed_payload(&result);
                    record.mark_succeeded(result, now)?;
                    CloseSignal::Completed(payload)
                }
                Finish::Failed(error) => {
                    let payload = json!({ "error": error });
                    record.mark_failed(error, now)?;
                    CloseSignal::Failed(payload)
                }
                Finish::Cancelled => {
                    record.mark_cancelled(now)?;
                    CloseSignal::Cancelled
                }
            };
            self.channel.close(signal);
            record.status
        };
        self.done.cancel();
        Ok(status)
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("status", &self.status())
            .field("events", &self.channel.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use crate::ports::SystemClock;
    use ulid::Ulid;

    fn job() -> Job {
        Job::new(
            JobId::from_ulid(Ulid::new()),
            json!({"task": "noop"}),
            Arc::new(SystemClock),
        )
    }

    fn kinds(job: &Job) -> Vec<EventKind> {
        job.channel().backlog().iter().map(|r| r.kind).collect()
    }

    #[test]
    fn start_marks_running_and_publishes_started() {
        let job = job();
        job.start().unwrap();

        assert_eq!(job.status(), JobStatus::Running);
        let backlog = job.channel().backlog();
        assert_eq!(backlog.len(), 1);
        assert_eq!(backlog[0].kind, EventKind::Started);
        assert_eq!(backlog[0].payload["input"]["task"], "noop");
    }

    #[test]
    fn success_closes_channel_with_completed() {
        let job = job();
        job.start().unwrap();
        let status = job.finish(Finish::Succeeded(json!({"ok": true}))).unwrap();

        assert_eq!(status, JobStatus::Succeeded);
        assert!(job.channel().is_closed());
        assert_eq!(kinds(&job), vec![EventKind::Started, EventKind::Completed]);
        assert_eq!(job.snapshot().result, Some(json!({"ok": true})));
    }

    #[test]
    fn failure_records_error_and_failed_event() {
        let job = job();
        job.start().unwrap();
        job.finish(Finish::Failed(JobError::task_failure("boom")))
            .unwrap();

        let snap = job.snapshot();
        assert_eq!(snap.status, JobStatus::Failed);
        assert_eq!(snap.error.as_ref().map(|e| e.kind), Some(ErrorKind::TaskFailure));
        let last = job.channel().backlog().pop().unwrap();
        assert_eq!(last.kind, EventKind::Failed);
        assert_eq!(last.payload["error"]["message"], "boom");
    }

    #[test]
    fn progress_after_cancel_request_is_dropped() {
        let job = job();
        job.start().unwrap();
        job.progress(json!({"step": 1})).unwrap();

        assert!(job.request_cancel());
        assert_eq!(job.progress(json!({"step": 2})), Err(Cancelled));
        assert_eq!(kinds(&job), vec![EventKind::Started, EventKind::Progress]);
    }

    #[test]
    fn cancel_request_overrides_task_outcome() {
        let job = job();
        job.start().unwrap();
        job.request_cancel();

        let status = job.finish(Finish::Succeeded(json!({"ok": true}))).unwrap();
        assert_eq!(status, JobStatus::Cancelled);
        assert!(job.snapshot().result.is_none());
        assert_eq!(kinds(&job), vec![EventKind::Started]);
        assert!(job.channel().is_closed());
    }

    #[test]
    fn second_finish_is_rejected_and_changes_nothing() {
        let job = job();
        job.start().unwrap();
        job.finish(Finish::Succeeded(json!(1))).unwrap();

        let err = job
            .finish(Finish::Failed(JobError::internal_fault("late")))
            .unwrap_err();
        assert_eq!(err.from, JobStatus::Succeeded);
        assert_eq!(job.status(), JobStatus::Succeeded);
        assert_eq!(job.channel().len(), 2);
    }

    #[test]
    fn cancel_on_terminal_job_keeps_status() {
        let job = job();
        job.start().unwrap();
        job.finish(Finish::Succeeded(json!(1))).unwrap();

        assert!(job.request_cancel());
        assert!(!job.request_cancel());
        assert_eq!(job.status(), JobStatus::Succeeded);
        assert!(job.snapshot().cancel_requested);
    }

    #[tokio::test]
    async fn finished_resolves_after_finish() {
        let job = Arc::new(job());
        job.start().unwrap();

        let waiter = {
            let job = Arc::clone(&job);
            tokio::spawn(async move { job.finished().await })
        };
        job.finish(Finish::Cancelled).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
