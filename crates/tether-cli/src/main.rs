//! tether デモ: ジョブを 1 つ起動して、イベントを JSON Lines で流す
//!
//! ```text
//! tether-cli "find the cheapest flight to Osaka"
//! ```
//!
//! Ctrl-C でキャンセル要求を出す（ジョブは cancelled で終わる）。

mod demo;

use anyhow::Context;
use futures::StreamExt;
use serde::Serialize;
use tether_core::{
    AgentJobInput, EventRecord, JobId, Orchestrator, OrchestratorBuilder, OrchestratorConfig,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::demo::{DemoConfig, SimulatedAgent};

const DEFAULT_TASK: &str = "Look up today's top story on example.com";

/// One output line per event.
#[derive(Serialize)]
struct EventLine<'a> {
    job_id: JobId,
    #[serde(flatten)]
    event: &'a EventRecord,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tether_core=info,tether_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // --- Configuration ---
    let config = OrchestratorConfig::from_env().context("invalid orchestrator configuration")?;
    let demo = DemoConfig::from_env().context("invalid demo configuration")?;
    tracing::info!(?config, ?demo, "configuration loaded");

    let orchestrator = OrchestratorBuilder::new()
        .executor(SimulatedAgent::new(demo.clone()))
        .config(config)
        .build()?;

    let shutdown = CancellationToken::new();
    let reaper = orchestrator.spawn_reaper(shutdown.clone());

    let health = orchestrator.health();
    tracing::info!(service = %health.service, status = %health.status, "orchestrator ready");

    let task = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let task = if task.trim().is_empty() {
        DEFAULT_TASK.to_string()
    } else {
        task
    };
    let created = orchestrator.start(AgentJobInput::new(task).into_value()).await;
    println!("{}", serde_json::to_string(&created)?);
    let id = created.id.to_string();

    if let Some(after) = demo.cancel_after {
        schedule_cancel(orchestrator.clone(), id.clone(), after);
    }

    follow(&orchestrator, created.id).await?;

    let last = orchestrator.status(&id).await?;
    println!("{}", serde_json::to_string(&last)?);

    shutdown.cancel();
    if let Some(reaper) = reaper {
        reaper.await.context("reaper loop panicked")?;
    }
    Ok(())
}

/// Print every event of the job until its stream ends. Ctrl-C requests cancellation.
async fn follow(orchestrator: &Orchestrator, job_id: JobId) -> anyhow::Result<()> {
    let id = job_id.to_string();
    let mut events = orchestrator.events(&id).await?;
    loop {
        tokio::select! {
            next = events.next() => {
                let Some(event) = next else { break };
                let line = EventLine { job_id, event: &event };
                println!("{}", serde_json::to_string(&line)?);
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for ctrl-c")?;
                tracing::info!(job_id = %id, "ctrl-c received; requesting cancellation");
                orchestrator.cancel(&id).await?;
            }
        }
    }
    Ok(())
}

fn schedule_cancel(orchestrator: Orchestrator, id: String, after: std::time::Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        match orchestrator.cancel(&id).await {
            Ok(ack) => tracing::info!(job_id = %id, ok = ack.ok, "scheduled cancel sent"),
            Err(e) => tracing::warn!(job_id = %id, error = %e, "scheduled cancel failed"),
        }
    });
}
