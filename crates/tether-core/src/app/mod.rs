//! App - アプリケーション層
//!
//! domain と ports を組み合わせて、ジョブのライフサイクルを動かす。
//!
//! # 主要コンポーネント
//! - **Job**: レコード + イベントチャネル + キャンセルハンドル
//! - **TaskRunner**: 1 ジョブ分の外部タスク実行と終端処理
//! - **JobRegistry**: プロセス内のジョブ表
//! - **Orchestrator**: 境界層向けのファサード
//! - **OrchestratorBuilder**: ワイヤリングと起動時検証
//! - **ReaperLoop**: 終端ジョブの回収

pub mod builder;
pub mod error;
pub mod job;
pub mod orchestrator;
pub mod reaper_loop;
pub mod registry;
pub mod runner;
pub mod status;

// 主要な型を再エクスポート
pub use self::builder::OrchestratorBuilder;
pub use self::error::{BuildError, OrchestratorError};
pub use self::job::{Finish, Job};
pub use self::orchestrator::{CancelAck, Health, Orchestrator, SERVICE_NAME};
pub use self::reaper_loop::ReaperLoop;
pub use self::registry::JobRegistry;
pub use self::runner::TaskRunner;
pub use self::status::JobCounts;
