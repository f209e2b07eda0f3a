//! OrchestratorBuilder - 起動時のワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）: executor 未設定は build() で BuildError
//! - Clock / IdGenerator は差し替え可能（テスト用）、既定は SystemClock + UlidGenerator

use std::sync::Arc;

use super::error::BuildError;
use super::orchestrator::Orchestrator;
use super::registry::JobRegistry;
use super::runner::TaskRunner;
use crate::config::OrchestratorConfig;
use crate::ports::{Clock, IdGenerator, SystemClock, TaskExecutor, UlidGenerator};

/// # 使用例
/// ```ignore
/// let orchestrator = OrchestratorBuilder::new()
///     .executor(BrowserAgent::new())
///     .config(OrchestratorConfig::from_env()?)
///     .build()?;
/// ```
#[derive(Default)]
pub struct OrchestratorBuilder {
    executor: Option<Arc<dyn TaskExecutor>>,
    config: OrchestratorConfig,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The task every job runs.
    pub fn executor(mut self, executor: impl TaskExecutor + 'static) -> Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    pub fn shared_executor(mut self, executor: Arc<dyn TaskExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn build(self) -> Result<Orchestrator, BuildError> {
        let executor = self.executor.ok_or(BuildError::MissingExecutor)?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&clock))));

        let runner = Arc::new(TaskRunner::new(executor, self.config.cancel_grace));
        let registry = JobRegistry::new(runner, ids, clock)
            .with_default_deadline(self.config.job_deadline);

        tracing::debug!(config = ?self.config, "orchestrator built");
        Ok(Orchestrator::new(Arc::new(registry), self.config))
    }
}
