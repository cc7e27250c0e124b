//! Error types for browser sessions and step execution

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebDriver error ({status}): {error} - {message}")]
    WebDriver {
        status: u16,
        error: String,
        message: String,
    },

    #[error("No such element: {0}")]
    NoSuchElement(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Unexpected WebDriver response: {0}")]
    Protocol(String),

    #[error("Session error: {0}")]
    Other(String),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Why a single step failed
#[derive(Error, Debug)]
pub enum StepError {
    #[error("Element not found: {locator} (waited {timeout_ms} ms)")]
    ElementNotFound { locator: String, timeout_ms: u64 },

    #[error("Expected text not found: {expected}")]
    AssertionFailed { expected: String },

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// A failed step, carrying the raw step text it came from
#[derive(Error, Debug)]
#[error("Step failed: {step} - {cause}")]
pub struct StepFailure {
    pub step: String,
    #[source]
    pub cause: StepError,
}

impl StepFailure {
    pub fn new(step: impl Into<String>, cause: StepError) -> Self {
        Self {
            step: step.into(),
            cause,
        }
    }

    /// Line appended to the run log for this failure
    pub fn log_line(&self) -> String {
        format!("ERROR in step \"{}\": {}", self.step, self.cause)
    }
}
