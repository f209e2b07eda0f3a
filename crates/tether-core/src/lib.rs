//! tether-core
//!
//! In-process orchestration core for long-running external tasks.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, job record, events, errors, agent input, outcome）
//! - **ports**: 抽象化レイヤー（TaskExecutor, ProgressReporter, Clock, IdGenerator）
//! - **channel**: ジョブごとの追記専用イベントログ（リプレイ + ライブ配信）
//! - **app**: ランナー、レジストリ、ファサード、リーパー
//! - **config**: 環境変数からの設定

pub mod app;
pub mod channel;
pub mod config;
pub mod domain;
pub mod ports;

pub use app::{
    BuildError, CancelAck, Health, JobCounts, Orchestrator, OrchestratorBuilder,
    OrchestratorError,
};
pub use channel::EventStream;
pub use config::{ConfigError, OrchestratorConfig};
pub use domain::{
    AgentJobInput, Cancelled, ErrorKind, EventKind, EventRecord, JobError, JobId, JobSnapshot,
    JobStatus, TaskError,
};
pub use ports::{ProgressReporter, TaskContext, TaskExecutor};
