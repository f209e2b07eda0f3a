//! ProgressReporter port - 外部タスクから進捗を受け取る窓口
//!
//! 外部タスクに渡す唯一のコールバック。Runner 側の実装が EventChannel への
//! publish とキャンセルのチェックポイントを兼ねる。

use crate::domain::errors::Cancelled;

/// Single-method capability handed to an external task for progress reporting.
///
/// Every call is a cancellation checkpoint: once cancellation has been
/// requested the report is dropped and `Err(Cancelled)` comes back, so a task
/// can bail out with `?`.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, payload: serde_json::Value) -> Result<(), Cancelled>;
}
