//! Job record and status management.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{JobError, TransitionError};
use super::ids::JobId;

/// Job status.
///
/// State transitions:
/// - Queued -> Running -> Succeeded | Failed | Cancelled
/// - Queued -> Failed | Cancelled (runner never got to start)
///
/// Terminal states have no outgoing transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Queued,
        JobStatus::Running,
        JobStatus::Succeeded,
        JobStatus::Failed,
        JobStatus::Cancelled,
    ];

    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        match (self, next) {
            (JobStatus::Queued, JobStatus::Running) => true,
            (JobStatus::Queued | JobStatus::Running, to) => to.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job record: the mutable state of one task execution.
///
/// Design:
/// - State transitions via methods (not direct field access from outside the runner)
/// - `result` is only ever set together with `Succeeded`, `error` with `Failed`
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub job_id: JobId,
    pub status: JobStatus,
    pub input: serde_json::Value,
    pub result: Option<serde_json::Value>,
    pub error: Option<JobError>,
    pub cancel_requested: bool,

    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    pub fn new(job_id: JobId, input: serde_json::Value, now: DateTime<Utc>) -> Self {
        Self {
            job_id,
            status: JobStatus::Queued,
            input,
            result: None,
            error: None,
            cancel_requested: false,
            created_at: now,
            started_at: None,
            ended_at: None,
        }
    }

    fn transition(&mut self, to: JobStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(to) {
            return Err(TransitionError {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    pub fn mark_running(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.transition(JobStatus::Running)?;
        self.started_at = Some(now);
        Ok(())
    }

    pub fn mark_succeeded(
        &mut self,
        result: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.transition(JobStatus::Succeeded)?;
        self.result = Some(result);
        self.ended_at = Some(now);
        Ok(())
    }

    pub fn mark_failed(&mut self, error: JobError, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.transition(JobStatus::Failed)?;
        self.error = Some(error);
        self.ended_at = Some(now);
        Ok(())
    }

    pub fn mark_cancelled(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.transition(JobStatus::Cancelled)?;
        self.ended_at = Some(now);
        Ok(())
    }

    /// Set the cancellation flag. Returns `true` only on the first request.
    pub fn request_cancel(&mut self) -> bool {
        let first = !self.cancel_requested;
        self.cancel_requested = true;
        first
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.job_id,
            status: self.status,
            input: self.input.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
            cancel_requested: self.cancel_requested,
            created_at: self.created_at,
            started_at: self.started_at,
            ended_at: self.ended_at,
        }
    }
}

/// Job status for API responses.
///
/// This is a serializable, point-in-time view of a Job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub status: JobStatus,
    pub input: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
    pub cancel_requested: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}
