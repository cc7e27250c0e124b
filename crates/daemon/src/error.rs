//! Error types for the orchestrator

use std::time::Duration;
use suiterun_browser::{SessionError, StepFailure};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Suite not found: {0}")]
    SuiteNotFound(String),

    #[error("Environment error: {0}")]
    Environment(#[from] EnvironmentError),

    #[error("Could not acquire browser session: {0}")]
    SessionAcquisition(#[source] SessionError),

    #[error(transparent)]
    Step(#[from] StepFailure),

    #[error("Store error: {0}")]
    Store(#[from] suiterun_common::Error),

    #[error("Timed out after {waited:?} waiting for run {run_id}")]
    Timeout { run_id: String, waited: Duration },
}

impl OrchestratorError {
    /// Failures that happen outside step execution and leave a `FATAL:` marker
    pub fn is_fatal(&self) -> bool {
        !matches!(self, OrchestratorError::Step(_))
    }
}

/// Environment provisioning failure
#[derive(Error, Debug)]
#[error("{0}")]
pub struct EnvironmentError(pub String);

pub type Result<T> = std::result::Result<T, OrchestratorError>;
