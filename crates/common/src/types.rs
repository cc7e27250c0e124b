//! Core types for suites and runs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Environment tag used when a suite does not name one
pub const DEFAULT_ENVIRONMENT: &str = "dev";

/// Creator recorded when a suite does not name one
pub const DEFAULT_CREATOR: &str = "system";

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_active() -> bool {
    true
}

/// A single test case embedded in a suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    #[serde(default = "new_id")]
    pub id: String,
    pub name: String,
    /// Raw step strings, executed in order
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub expected_result: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl TestCase {
    pub fn new(name: impl Into<String>, steps: Vec<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            steps,
            expected_result: String::new(),
            active: true,
        }
    }
}

/// A stored test suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSuite {
    pub id: String,
    pub name: String,
    pub description: String,
    pub test_cases: Vec<TestCase>,
    pub environment: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a suite; omitted fields take their defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteDraft {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub test_cases: Option<Vec<TestCase>>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl SuiteDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_test_cases(mut self, test_cases: Vec<TestCase>) -> Self {
        self.test_cases = Some(test_cases);
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("suite name is required".to_string()));
        }
        if matches!(&self.id, Some(id) if id.trim().is_empty()) {
            return Err(Error::InvalidInput("suite id must not be blank".to_string()));
        }
        Ok(())
    }

    /// Materialize the draft, stamping both timestamps with `now`
    pub fn into_suite(self, now: DateTime<Utc>) -> TestSuite {
        TestSuite {
            id: self.id.unwrap_or_else(new_id),
            name: self.name,
            description: self.description.unwrap_or_default(),
            test_cases: self.test_cases.unwrap_or_default(),
            environment: self
                .environment
                .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
            created_by: self
                .created_by
                .unwrap_or_else(|| DEFAULT_CREATOR.to_string()),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Shallow partial update of a suite. The identifier and creation time never change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuitePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub test_cases: Option<Vec<TestCase>>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl SuitePatch {
    pub fn apply(self, suite: &mut TestSuite, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            suite.name = name;
        }
        if let Some(description) = self.description {
            suite.description = description;
        }
        if let Some(test_cases) = self.test_cases {
            suite.test_cases = test_cases;
        }
        if let Some(environment) = self.environment {
            suite.environment = environment;
        }
        if let Some(created_by) = self.created_by {
            suite.created_by = created_by;
        }
        suite.updated_at = now;
    }
}

/// Run status. Moves forward only: pending -> running -> passed | failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Passed,
    Failed,
}

impl Default for RunStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Passed | RunStatus::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            RunStatus::Pending => 0,
            RunStatus::Running => 1,
            RunStatus::Passed | RunStatus::Failed => 2,
        }
    }

    /// Whether a run in this status may move to `next`.
    /// Re-asserting the current non-terminal status is allowed.
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        *self == next || next.rank() > self.rank()
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Pending => write!(f, "pending"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Passed => write!(f, "passed"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for RunStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(RunStatus::Pending),
            "running" => Ok(RunStatus::Running),
            "passed" => Ok(RunStatus::Passed),
            "failed" => Ok(RunStatus::Failed),
            other => Err(Error::InvalidInput(format!("unknown run status: {}", other))),
        }
    }
}

/// One execution attempt of a suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub id: String,
    pub suite_id: String,
    pub status: RunStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Append-only, in execution order
    #[serde(default)]
    pub logs: Vec<String>,
}

impl Run {
    pub fn new(suite_id: impl Into<String>, status: RunStatus) -> Self {
        Self {
            id: new_id(),
            suite_id: suite_id.into(),
            status,
            start_time: Utc::now(),
            end_time: None,
            logs: Vec::new(),
        }
    }

    /// Link to the rendered report for this run
    pub fn report_url(&self, base: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), self.id)
    }
}

/// Partial update of a run. Logs can only be appended.
#[derive(Debug, Clone, Default)]
pub struct RunPatch {
    pub status: Option<RunStatus>,
    pub end_time: Option<DateTime<Utc>>,
    pub append_logs: Vec<String>,
}

impl RunPatch {
    pub fn log(line: impl Into<String>) -> Self {
        Self {
            append_logs: vec![line.into()],
            ..Default::default()
        }
    }

    /// Terminal update: status plus end timestamp
    pub fn finish(status: RunStatus) -> Self {
        Self {
            status: Some(status),
            end_time: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn with_log(mut self, line: impl Into<String>) -> Self {
        self.append_logs.push(line.into());
        self
    }

    /// Apply onto `run`, refusing backward status moves
    pub fn apply(self, run: &mut Run) -> Result<()> {
        if let Some(next) = self.status {
            if !run.status.can_transition_to(next) {
                return Err(Error::InvalidStateTransition {
                    from: run.status.to_string(),
                    to: next.to_string(),
                });
            }
            run.status = next;
        }
        if let Some(end_time) = self.end_time {
            run.end_time = Some(end_time);
        }
        run.logs.extend(self.append_logs);
        Ok(())
    }
}

/// Exact-match conjunction over the supplied fields
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    pub suite_id: Option<String>,
    pub status: Option<RunStatus>,
}

impl RunFilter {
    pub fn matches(&self, run: &Run) -> bool {
        self.suite_id.as_ref().map_or(true, |id| &run.suite_id == id)
            && self.status.map_or(true, |status| run.status == status)
    }
}

/// Page request. Pages are numbered from 1; page 0 is read as page 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, size: 20 }
    }
}

impl PageRequest {
    pub fn new(page: usize, size: usize) -> Self {
        Self { page, size }
    }

    pub fn offset(&self) -> usize {
        self.page.max(1).saturating_sub(1).saturating_mul(self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(RunStatus::Pending, RunStatus::Running, true ; "pending to running")]
    #[test_case(RunStatus::Running, RunStatus::Passed, true ; "running to passed")]
    #[test_case(RunStatus::Running, RunStatus::Failed, true ; "running to failed")]
    #[test_case(RunStatus::Running, RunStatus::Running, true ; "running stays running")]
    #[test_case(RunStatus::Running, RunStatus::Pending, false ; "running back to pending")]
    #[test_case(RunStatus::Passed, RunStatus::Running, false ; "passed back to running")]
    #[test_case(RunStatus::Failed, RunStatus::Passed, false ; "failed to passed")]
    #[test_case(RunStatus::Failed, RunStatus::Failed, false ; "terminal is final")]
    fn test_status_transitions(from: RunStatus, to: RunStatus, allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn test_status_parse_and_display() {
        assert_eq!("FAILED".parse::<RunStatus>().unwrap(), RunStatus::Failed);
        assert_eq!(RunStatus::Passed.to_string(), "passed");
        assert!("done".parse::<RunStatus>().is_err());
    }

    #[test]
    fn test_draft_defaults() {
        let now = Utc::now();
        let suite = SuiteDraft::new("checkout").into_suite(now);
        assert!(!suite.id.is_empty());
        assert_eq!(suite.description, "");
        assert_eq!(suite.environment, DEFAULT_ENVIRONMENT);
        assert_eq!(suite.created_by, DEFAULT_CREATOR);
        assert!(suite.test_cases.is_empty());
        assert_eq!(suite.created_at, suite.updated_at);
    }

    #[test]
    fn test_draft_validation() {
        assert!(SuiteDraft::new("  ").validate().is_err());
        let mut draft = SuiteDraft::new("login");
        draft.id = Some(String::new());
        assert!(draft.validate().is_err());
        assert!(SuiteDraft::new("login").validate().is_ok());
    }

    #[test]
    fn test_run_patch_rejects_backward_move() {
        let mut run = Run::new("suite-1", RunStatus::Running);
        RunPatch::finish(RunStatus::Failed).apply(&mut run).unwrap();
        assert!(run.end_time.is_some());

        let err = RunPatch {
            status: Some(RunStatus::Running),
            ..Default::default()
        }
        .apply(&mut run)
        .unwrap_err();
        assert!(matches!(err, Error::InvalidStateTransition { .. }));
        assert_eq!(run.status, RunStatus::Failed);
    }

    #[test]
    fn test_test_case_document_defaults() {
        let case: TestCase = serde_json::from_str(r#"{"name":"login","steps":["navigate:/"]}"#).unwrap();
        assert!(case.active);
        assert!(!case.id.is_empty());
        assert_eq!(case.expected_result, "");
    }

    #[test]
    fn test_report_url() {
        let run = Run::new("suite-1", RunStatus::Pending);
        assert_eq!(
            run.report_url("http://localhost:3000/reports/"),
            format!("http://localhost:3000/reports/{}", run.id)
        );
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(PageRequest::new(0, 10).offset(), 0);
        assert_eq!(PageRequest::new(1, 10).offset(), 0);
        assert_eq!(PageRequest::new(3, 10).offset(), 20);
    }
}
