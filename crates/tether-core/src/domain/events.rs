//! Events - ジョブが発行するイベント
//!
//! 1 ジョブにつき 1 本の EventChannel があり、`seq` は 0 から欠番なしで増える。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of an event record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Started,
    Progress,
    Completed,
    Failed,
}

impl EventKind {
    /// `completed` と `failed` はチャネルを閉じるときにだけ発行される
    pub fn is_terminal(self) -> bool {
        matches!(self, EventKind::Completed | EventKind::Failed)
    }
}

/// One timestamped, ordered unit of progress/outcome information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    pub kind: EventKind,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}
