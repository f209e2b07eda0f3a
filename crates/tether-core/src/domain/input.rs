//! Agent job input for browser-agent jobs.
//!
//! The core treats job input as opaque JSON. `AgentJobInput` is the shape the
//! browser-agent executor understands; boundary layers can build it and hand
//! `into_value()` to the orchestrator.

use serde::{Deserialize, Serialize};

const DEFAULT_MAX_STEPS: u32 = 20;
const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Task description for a browser-agent job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentJobInput {
    /// High-level task for the agent to execute.
    pub task: String,

    /// Optional allowlist of domains the agent should focus on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domains: Option<Vec<String>>,

    /// Max agent reasoning steps.
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    #[serde(default = "default_model")]
    pub model: String,
}

fn default_max_steps() -> u32 {
    DEFAULT_MAX_STEPS
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl AgentJobInput {
    /// Convenience constructor for the common "just a task" case.
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            domains: None,
            max_steps: DEFAULT_MAX_STEPS,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_domains(mut self, domains: Vec<String>) -> Self {
        self.domains = Some(domains);
        self
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn into_value(self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
