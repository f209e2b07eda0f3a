//! ReaperLoop - 終端ジョブの回収
//!
//! # フロー
//! 1. `interval` ごとに起きる
//! 2. `JobRegistry::reap_expired(retention)` で、終了から `retention` 以上経った終端ジョブを消す
//! 3. shutdown トークンが発火したら抜ける
//!
//! 実行中・待機中のジョブには触らない。

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::registry::JobRegistry;

pub struct ReaperLoop {
    registry: Arc<JobRegistry>,
    retention: Duration,
    interval: Duration,
}

impl ReaperLoop {
    pub fn new(registry: Arc<JobRegistry>, retention: Duration, interval: Duration) -> Self {
        Self {
            registry,
            retention,
            interval,
        }
    }

    /// One sweep. Returns the number of evicted jobs.
    pub async fn tick(&self) -> usize {
        self.registry.reap_expired(self.retention).await
    }

    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            retention_secs = self.retention.as_secs(),
            interval_secs = self.interval.as_secs(),
            "reaper loop started"
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // 最初の tick は即時に返るので読み捨てる
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let evicted = self.tick().await;
                    if evicted > 0 {
                        tracing::info!(evicted, "evicted expired jobs");
                    }
                }
            }
        }
        tracing::info!("reaper loop stopped");
    }
}
