//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」。コアが外部に求めるものだけを trait にする。
//!
//! - TaskExecutor / ProgressReporter: ジョブの中で動く外部タスクとその進捗コールバック
//! - Clock / IdGenerator: 時刻と ID（テストで差し替える）

pub mod clock;
pub mod id_generator;
pub mod progress;
pub mod task_executor;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::progress::ProgressReporter;
pub use self::task_executor::{TaskContext, TaskExecutor};
