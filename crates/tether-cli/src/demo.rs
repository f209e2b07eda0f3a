//! 疑似ブラウザエージェント
//!
//! 実ブラウザの代わりに、一定間隔で "Working... step N" を報告して終わるだけの executor。
//! キャンセルにはステップの境目で応答する。

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{Value, json};
use tether_core::{AgentJobInput, Cancelled, TaskContext, TaskError, TaskExecutor};

const DEFAULT_STEPS: u32 = 5;
const DEFAULT_STEP_MS: u64 = 400;

/// Demo knobs, read from the environment.
///
/// | Env Var                        | Default |
/// |--------------------------------|---------|
/// | `TETHER_DEMO_STEPS`            | `5`     |
/// | `TETHER_DEMO_STEP_MS`          | `400`   |
/// | `TETHER_DEMO_CANCEL_AFTER_MS`  | unset   |
/// | `TETHER_DEMO_FAIL`             | `false` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoConfig {
    pub steps: u32,
    pub step: Duration,
    pub cancel_after: Option<Duration>,
    pub fail: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS,
            step: Duration::from_millis(DEFAULT_STEP_MS),
            cancel_after: None,
            fail: false,
        }
    }
}

impl DemoConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let steps = match lookup("TETHER_DEMO_STEPS") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("TETHER_DEMO_STEPS must be a number, got {raw:?}"))?,
            None => defaults.steps,
        };
        let step = match lookup("TETHER_DEMO_STEP_MS") {
            Some(raw) => Duration::from_millis(
                raw.trim()
                    .parse()
                    .with_context(|| format!("TETHER_DEMO_STEP_MS must be a number, got {raw:?}"))?,
            ),
            None => defaults.step,
        };
        let cancel_after = lookup("TETHER_DEMO_CANCEL_AFTER_MS")
            .map(|raw| {
                raw.trim().parse().map(Duration::from_millis).with_context(|| {
                    format!("TETHER_DEMO_CANCEL_AFTER_MS must be a number, got {raw:?}")
                })
            })
            .transpose()?;
        let fail = lookup("TETHER_DEMO_FAIL")
            .map(|raw| matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(defaults.fail);

        Ok(Self {
            steps,
            step,
            cancel_after,
            fail,
        })
    }
}

/// Stand-in for the browser agent: emits heartbeat progress, then a summary.
pub struct SimulatedAgent {
    config: DemoConfig,
}

impl SimulatedAgent {
    pub fn new(config: DemoConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TaskExecutor for SimulatedAgent {
    async fn execute(&self, input: Value, ctx: TaskContext) -> Result<Value, TaskError> {
        let input: AgentJobInput = serde_json::from_value(input)
            .map_err(|e| TaskError::failed(format!("invalid agent input: {e}")))?;
        let steps = self.config.steps.min(input.max_steps);

        for step in 1..=steps {
            tokio::select! {
                _ = ctx.cancelled() => return Err(Cancelled.into()),
                _ = tokio::time::sleep(self.config.step) => {}
            }
            if self.config.fail && step > steps / 2 {
                return Err(TaskError::failed(format!(
                    "browser session lost at step {step}"
                )));
            }
            ctx.report(json!({
                "text": format!("Working... step {step}"),
                "step": step,
                "max_steps": input.max_steps,
            }))?;
        }

        let sources: Vec<String> = match &input.domains {
            Some(domains) if !domains.is_empty() => {
                domains.iter().map(|d| format!("https://{d}/")).collect()
            }
            _ => vec!["https://example.com/".to_string()],
        };
        Ok(json!({
            "summary": format!(
                "Finished \"{}\" in {steps} steps. Sources: {}",
                input.task,
                sources.join(" ")
            ),
            "model": input.model,
            "steps": steps,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tether_core::{JobId, ProgressReporter};
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Value>>);

    impl ProgressReporter for Recorder {
        fn report(&self, payload: Value) -> Result<(), Cancelled> {
            self.0.lock().unwrap().push(payload);
            Ok(())
        }
    }

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<DemoConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DemoConfig::from_lookup(|k| vars.get(k).cloned())
    }

    fn fast(steps: u32, fail: bool) -> SimulatedAgent {
        SimulatedAgent::new(DemoConfig {
            steps,
            step: Duration::from_millis(1),
            cancel_after: None,
            fail,
        })
    }

    fn ctx(recorder: Arc<Recorder>, cancel: CancellationToken) -> TaskContext {
        TaskContext::new("job-01ARZ3NDEKTSV4RRFFQ69G5FAV".parse::<JobId>().unwrap(), recorder, cancel)
    }

    #[test]
    fn demo_config_defaults_and_overrides() {
        assert_eq!(load(&[]).unwrap(), DemoConfig::default());

        let config = load(&[
            ("TETHER_DEMO_STEPS", "3"),
            ("TETHER_DEMO_STEP_MS", "10"),
            ("TETHER_DEMO_CANCEL_AFTER_MS", "25"),
            ("TETHER_DEMO_FAIL", "true"),
        ])
        .unwrap();
        assert_eq!(config.steps, 3);
        assert_eq!(config.step, Duration::from_millis(10));
        assert_eq!(config.cancel_after, Some(Duration::from_millis(25)));
        assert!(config.fail);

        assert!(load(&[("TETHER_DEMO_STEPS", "many")]).is_err());
    }

    #[tokio::test]
    async fn reports_heartbeat_and_summarizes() {
        let recorder = Arc::new(Recorder::default());
        let input = AgentJobInput::new("find docs")
            .with_domains(vec!["docs.rs".to_string()])
            .into_value();

        let result = fast(3, false)
            .execute(input, ctx(Arc::clone(&recorder), CancellationToken::new()))
            .await
            .unwrap();

        let reports = recorder.0.lock().unwrap().clone();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[2]["text"], "Working... step 3");
        assert!(result["summary"].as_str().unwrap().contains("https://docs.rs/"));
    }

    #[tokio::test]
    async fn max_steps_caps_the_run() {
        let recorder = Arc::new(Recorder::default());
        let input = AgentJobInput::new("short").with_max_steps(2).into_value();

        fast(10, false)
            .execute(input, ctx(Arc::clone(&recorder), CancellationToken::new()))
            .await
            .unwrap();
        assert_eq!(recorder.0.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn fail_mode_fails_midway() {
        let recorder = Arc::new(Recorder::default());
        let err = fast(4, true)
            .execute(
                AgentJobInput::new("x").into_value(),
                ctx(Arc::clone(&recorder), CancellationToken::new()),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, TaskError::Failed(ref m) if m.contains("step 3")));
        assert_eq!(recorder.0.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn stops_when_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = fast(3, false)
            .execute(
                AgentJobInput::new("x").into_value(),
                ctx(Arc::new(Recorder::default()), cancel),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Cancelled(_)));
    }

    #[tokio::test]
    async fn rejects_input_without_task() {
        let err = fast(1, false)
            .execute(json!({"steps": 1}), ctx(Arc::new(Recorder::default()), CancellationToken::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Failed(ref m) if m.starts_with("invalid agent input")));
    }
}
