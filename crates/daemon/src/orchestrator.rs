//! Suite execution orchestrator
//!
//! Owns the run state machine. A trigger gets the run id back as soon as the
//! run record exists; everything after that happens on a spawned task:
//!
//! ```text
//! setup env ─► acquire slot ─► build session ─► test cases / steps ─► close + teardown
//!     │                              │                    │
//!     └──── FATAL ◄──────────────────┘              first failure stops the run
//!                          ▼
//!           finalize (passed | failed) ─► notify
//! ```

use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use suiterun_browser::{BrowserSession, SessionProvider, StepInterpreter};
use suiterun_common::{Error, Run, RunPatch, RunRecordStore, RunStatus, TestSuite};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::config::DaemonConfig;
use crate::environment::{EnvironmentContext, EnvironmentProvisioner};
use crate::error::{OrchestratorError, Result};
use crate::notify::NotificationGateway;

/// Interval between store reads in [`Orchestrator::wait_for_completion`]
const COMPLETION_POLL: Duration = Duration::from_millis(50);

/// Per-trigger options
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Overrides the suite's own environment tag
    pub environment: Option<String>,
}

impl ExecuteOptions {
    pub fn in_environment(environment: impl Into<String>) -> Self {
        Self {
            environment: Some(environment.into()),
        }
    }
}

/// A started run. Dropping the handle leaves the run executing.
#[derive(Debug)]
pub struct RunHandle {
    run_id: String,
    task: JoinHandle<()>,
}

impl RunHandle {
    pub fn id(&self) -> &str {
        &self.run_id
    }

    /// Wait for the run task, including its notifications, to finish
    pub async fn join(self) -> std::result::Result<(), JoinError> {
        self.task.await
    }
}

/// Executes stored suites against remote browser sessions
#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn RunRecordStore>,
    sessions: Arc<dyn SessionProvider>,
    environments: Arc<dyn EnvironmentProvisioner>,
    gateway: NotificationGateway,
    interpreter: StepInterpreter,
    endpoint: String,
    browser: String,
    /// Caps concurrently open browser sessions; `None` is unbounded
    session_slots: Option<Arc<Semaphore>>,
}

impl Orchestrator {
    pub fn new(
        config: &DaemonConfig,
        store: Arc<dyn RunRecordStore>,
        sessions: Arc<dyn SessionProvider>,
        environments: Arc<dyn EnvironmentProvisioner>,
        gateway: NotificationGateway,
    ) -> Self {
        let interpreter = StepInterpreter::new(config.webdriver.base_url.clone())
            .with_element_timeout(config.webdriver.element_timeout());
        let session_slots = match config.execution.max_concurrent_sessions {
            0 => None,
            n => Some(Arc::new(Semaphore::new(n))),
        };

        Self {
            store,
            sessions,
            environments,
            gateway,
            interpreter,
            endpoint: config.webdriver.endpoint.clone(),
            browser: config.webdriver.browser.clone(),
            session_slots,
        }
    }

    pub fn store(&self) -> &Arc<dyn RunRecordStore> {
        &self.store
    }

    /// Start executing a suite.
    ///
    /// Fails only when the suite does not exist (or the store errors), in
    /// which case no run record is created. Otherwise the run is created in
    /// `running` status and executes on its own task.
    pub fn execute_suite(&self, suite_id: &str, options: ExecuteOptions) -> Result<RunHandle> {
        let suite = self
            .store
            .get_suite(suite_id)?
            .ok_or_else(|| OrchestratorError::SuiteNotFound(suite_id.to_string()))?;

        let run = self.store.create_run(&suite.id, RunStatus::Running)?;
        let environment = options
            .environment
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| suite.environment.clone());

        info!(
            run_id = %run.id,
            suite_id = %suite.id,
            "Starting suite '{}' in {}", suite.name, environment
        );

        let this = self.clone();
        let run_id = run.id.clone();
        let task = tokio::spawn(async move { this.drive(suite, run_id, environment).await });

        Ok(RunHandle {
            run_id: run.id,
            task,
        })
    }

    /// Poll the store until the run is terminal
    pub async fn wait_for_completion(&self, run_id: &str, timeout: Duration) -> Result<Run> {
        let deadline = Instant::now() + timeout;
        loop {
            let run = self
                .store
                .get_run(run_id)?
                .ok_or_else(|| Error::not_found("run", run_id))?;
            if run.status.is_terminal() {
                return Ok(run);
            }
            if Instant::now() >= deadline {
                return Err(OrchestratorError::Timeout {
                    run_id: run_id.to_string(),
                    waited: timeout,
                });
            }
            tokio::time::sleep(COMPLETION_POLL).await;
        }
    }

    /// Run body: execute, finalize, then notify
    async fn drive(&self, suite: TestSuite, run_id: String, environment: String) {
        let outcome = self.execute_run(&suite, &run_id, &environment).await;

        let status = if outcome.is_ok() {
            RunStatus::Passed
        } else {
            RunStatus::Failed
        };
        let mut patch = RunPatch::finish(status);
        if let Err(e) = &outcome {
            if e.is_fatal() {
                error!(run_id = %run_id, "Run aborted: {}", e);
                patch = patch.with_log(format!("FATAL: {}", e));
            }
        }

        match self.store.update_run(&run_id, patch) {
            Ok(Some(_)) => info!(run_id = %run_id, suite_id = %suite.id, "Run finished: {}", status),
            Ok(None) => warn!(run_id = %run_id, "Run record disappeared before finalization"),
            Err(e) => error!(run_id = %run_id, "Failed to finalize run: {}", e),
        }

        self.dispatch(&suite.id, &run_id, &outcome).await;
    }

    async fn execute_run(&self, suite: &TestSuite, run_id: &str, environment: &str) -> Result<()> {
        let context = self.environments.setup(environment).await?;

        let _slot = self.acquire_slot(run_id).await?;
        let session = self
            .sessions
            .build(&self.endpoint, &self.browser)
            .await
            .map_err(OrchestratorError::SessionAcquisition)?;
        debug!(run_id, "Acquired {} session", self.browser);

        let outcome = self.run_test_cases(session.as_ref(), suite, run_id).await;
        self.cleanup(session.as_ref(), &context, run_id).await;
        outcome
    }

    async fn acquire_slot(&self, run_id: &str) -> Result<Option<OwnedSemaphorePermit>> {
        let Some(slots) = &self.session_slots else {
            return Ok(None);
        };
        if slots.available_permits() == 0 {
            info!(run_id, "All browser session slots busy, waiting");
        }
        slots
            .clone()
            .acquire_owned()
            .await
            .map(Some)
            .map_err(|e| Error::Internal(format!("session slots closed: {}", e)).into())
    }

    /// Test cases in order, steps in order, stopping at the first failure
    async fn run_test_cases(
        &self,
        session: &dyn BrowserSession,
        suite: &TestSuite,
        run_id: &str,
    ) -> Result<()> {
        for case in &suite.test_cases {
            if !case.active {
                self.append_log(run_id, format!("skip test case -> {}", case.name));
                continue;
            }
            debug!(run_id, "Running test case: {}", case.name);

            for raw in &case.steps {
                if raw.trim().is_empty() {
                    continue;
                }
                match self.interpreter.execute(session, raw).await {
                    Ok(line) => self.append_log(run_id, line),
                    Err(failure) => {
                        self.append_log(run_id, failure.log_line());
                        return Err(failure.into());
                    }
                }
            }
        }
        Ok(())
    }

    /// Close the session and tear down the environment; errors are only logged
    async fn cleanup(&self, session: &dyn BrowserSession, context: &EnvironmentContext, run_id: &str) {
        if let Err(e) = session.close().await {
            warn!(run_id, "Failed to close browser session: {}", e);
        }
        if let Err(e) = self.environments.teardown(context).await {
            warn!(run_id, "Environment teardown failed: {}", e);
        }
    }

    fn append_log(&self, run_id: &str, line: String) {
        match self.store.append_run_log(run_id, line) {
            Ok(Some(_)) => {}
            Ok(None) => warn!(run_id, "Dropped log line for missing run"),
            Err(e) => warn!(run_id, "Failed to append log line: {}", e),
        }
    }

    async fn dispatch(&self, suite_id: &str, run_id: &str, outcome: &Result<()>) {
        match outcome {
            Ok(()) => {
                let payload = json!({ "suiteId": suite_id, "resultId": run_id });
                self.gateway.notify_event("suite_passed", payload.clone()).await;
                self.gateway.send_log("INFO", "Suite passed", payload).await;
            }
            Err(e) => {
                let payload = json!({ "suiteId": suite_id, "resultId": run_id, "error": e.to_string() });
                let message = if e.is_fatal() {
                    "Suite orchestration error"
                } else {
                    "Suite failed"
                };
                self.gateway.notify_event("suite_failed", payload.clone()).await;
                self.gateway.send_log("ERROR", message, payload).await;
            }
        }
    }
}
