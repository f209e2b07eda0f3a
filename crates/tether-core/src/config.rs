//! Orchestrator configuration loaded from the environment.

use std::time::Duration;

use thiserror::Error;

/// Default grace period before a cancelled task is aborted, in milliseconds.
const DEFAULT_CANCEL_GRACE_MS: u64 = 2_000;
/// Default reaper tick, in seconds.
const DEFAULT_REAP_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} must be greater than zero")]
    Zero { var: &'static str },
}

/// Tunables for the orchestration core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// How long a cancelled task may keep running before it is aborted.
    pub cancel_grace: Duration,
    /// Deadline applied to every job started without an explicit one.
    pub job_deadline: Option<Duration>,
    /// How long terminal jobs stay queryable. `None` keeps them forever.
    pub retention: Option<Duration>,
    /// Reaper tick. Only used when `retention` is set.
    pub reap_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            cancel_grace: Duration::from_millis(DEFAULT_CANCEL_GRACE_MS),
            job_deadline: None,
            retention: None,
            reap_interval: Duration::from_secs(DEFAULT_REAP_INTERVAL_SECS),
        }
    }
}

impl OrchestratorConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                      | Required | Default |
    /// |------------------------------|----------|---------|
    /// | `TETHER_CANCEL_GRACE_MS`     | no       | `2000`  |
    /// | `TETHER_JOB_DEADLINE_SECS`   | no       | unset   |
    /// | `TETHER_RETENTION_SECS`      | no       | unset   |
    /// | `TETHER_REAP_INTERVAL_SECS`  | no       | `60`    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let cancel_grace = number(&lookup, "TETHER_CANCEL_GRACE_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.cancel_grace);
        let job_deadline = positive(&lookup, "TETHER_JOB_DEADLINE_SECS")?.map(Duration::from_secs);
        let retention = number(&lookup, "TETHER_RETENTION_SECS")?.map(Duration::from_secs);
        let reap_interval = positive(&lookup, "TETHER_REAP_INTERVAL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.reap_interval);

        Ok(Self {
            cancel_grace,
            job_deadline,
            retention,
            reap_interval,
        })
    }
}

fn number(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidNumber {
            var,
            value: raw.to_string(),
        })
}

fn positive(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<u64>, ConfigError> {
    match number(lookup, var)? {
        Some(0) => Err(ConfigError::Zero { var }),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<OrchestratorConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        OrchestratorConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(load(&[]).unwrap(), OrchestratorConfig::default());
    }

    #[test]
    fn all_variables_are_read() {
        let config = load(&[
            ("TETHER_CANCEL_GRACE_MS", "250"),
            ("TETHER_JOB_DEADLINE_SECS", "30"),
            ("TETHER_RETENTION_SECS", "600"),
            ("TETHER_REAP_INTERVAL_SECS", "5"),
        ])
        .unwrap();

        assert_eq!(config.cancel_grace, Duration::from_millis(250));
        assert_eq!(config.job_deadline, Some(Duration::from_secs(30)));
        assert_eq!(config.retention, Some(Duration::from_secs(600)));
        assert_eq!(config.reap_interval, Duration::from_secs(5));
    }

    #[test]
    fn blank_value_counts_as_unset() {
        let config = load(&[("TETHER_RETENTION_SECS", "  ")]).unwrap();
        assert_eq!(config.retention, None);
    }

    #[rstest]
    #[case("TETHER_CANCEL_GRACE_MS", "soon")]
    #[case("TETHER_RETENTION_SECS", "-1")]
    #[case("TETHER_JOB_DEADLINE_SECS", "1.5")]
    fn non_numeric_values_are_rejected(#[case] var: &'static str, #[case] value: &str) {
        assert_eq!(
            load(&[(var, value)]),
            Err(ConfigError::InvalidNumber {
                var,
                value: value.to_string()
            })
        );
    }

    #[rstest]
    #[case("TETHER_JOB_DEADLINE_SECS")]
    #[case("TETHER_REAP_INTERVAL_SECS")]
    fn zero_is_rejected_where_it_makes_no_sense(#[case] var: &'static str) {
        assert_eq!(load(&[(var, "0")]), Err(ConfigError::Zero { var }));
    }

    #[test]
    fn zero_grace_and_retention_are_allowed() {
        let config = load(&[
            ("TETHER_CANCEL_GRACE_MS", "0"),
            ("TETHER_RETENTION_SECS", "0"),
        ])
        .unwrap();
        assert_eq!(config.cancel_grace, Duration::ZERO);
        assert_eq!(config.retention, Some(Duration::ZERO));
    }
}
