//! Errors - エラー型と分類
//!
//! - `ErrorKind` / `JobError`: ジョブに記録される失敗（status/event から観測される）
//! - `TaskError` / `Cancelled`: 外部タスクが返すエラー
//! - `TransitionError`: 状態機械の不正遷移

use serde::{Deserialize, Serialize};

use super::job::JobStatus;

/// ErrorKind はジョブ失敗の分類
///
/// - TaskFailure: 外部タスクがエラーを返した
/// - InternalFault: ランナー側の欠陥（panic など）。TaskFailure と同じ形で終端させる
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    TaskFailure,
    InternalFault,
}

/// Structured failure description stored on a failed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct JobError {
    pub kind: ErrorKind,
    pub message: String,
}

impl JobError {
    pub fn task_failure(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::TaskFailure,
            message: message.into(),
        }
    }

    pub fn internal_fault(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InternalFault,
            message: message.into(),
        }
    }
}

/// Returned by a progress report once cancellation has been requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("job cancellation requested")]
pub struct Cancelled;

/// Error surfaced by an external task.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The task stopped because it observed cancellation.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    #[error("{0}")]
    Failed(String),
}

impl TaskError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Illegal status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid job transition {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: JobStatus,
    pub to: JobStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_serializes_snake_case() {
        let s = serde_json::to_string(&ErrorKind::InternalFault).unwrap();
        assert_eq!(s, "\"internal_fault\"");
    }

    #[test]
    fn cancelled_converts_into_task_error() {
        fn step() -> Result<(), TaskError> {
            let checkpoint: Result<(), Cancelled> = Err(Cancelled);
            checkpoint?;
            Ok(())
        }
        assert!(matches!(step(), Err(TaskError::Cancelled(Cancelled))));
    }

    #[test]
    fn job_error_shape() {
        let e = JobError::task_failure("boom");
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["kind"], "task_failure");
        assert_eq!(v["message"], "boom");
    }
}
