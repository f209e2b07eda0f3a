use thiserror::Error;

/// Failures of the orchestration API itself.
///
/// Job failures are never reported through this type; they live on the job
/// (`status = failed`, `error`, final `failed` event).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    /// Unknown (or malformed) job id.
    #[error("job not found: {0}")]
    NotFound(String),
}

/// Builder misuse, caught at startup.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("no task executor configured; call `executor(..)` before `build()`")]
    MissingExecutor,
}
