//! Step interpreter: executes one parsed step against a browser session

use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{SessionError, StepError, StepFailure};
use crate::locator::Locator;
use crate::session::{BrowserSession, ElementRef};
use crate::step::{resolve_url, Command, ElementTarget};

/// How long click/type/wait steps wait for their element
pub const ELEMENT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Executes raw steps and produces one log line per step.
///
/// Never retries; the first error is returned as a [`StepFailure`].
#[derive(Debug, Clone)]
pub struct StepInterpreter {
    base_url: String,
    element_timeout: Duration,
}

impl StepInterpreter {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            element_timeout: ELEMENT_TIMEOUT,
        }
    }

    pub fn with_element_timeout(mut self, timeout: Duration) -> Self {
        self.element_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Parse and execute `raw`, returning the log line for it
    pub async fn execute(
        &self,
        session: &dyn BrowserSession,
        raw: &str,
    ) -> Result<String, StepFailure> {
        let command = Command::parse(raw);
        debug!("Executing step: {:?}", command);

        self.run(session, &command).await.map_err(|cause| {
            warn!("Step '{}' failed: {}", raw, cause);
            StepFailure::new(raw, cause)
        })
    }

    async fn run(&self, session: &dyn BrowserSession, command: &Command) -> Result<String, StepError> {
        match command {
            Command::Navigate(target) => {
                let url = resolve_url(&self.base_url, target);
                session.navigate(&url).await?;
                Ok(format!("navigate -> {}", url))
            }
            Command::Click(target) => {
                let element = self.wait_for(session, target).await?;
                session.click(&element).await?;
                Ok(format!("click -> {}", target.text))
            }
            Command::Type(target, text) => {
                let element = self.wait_for(session, target).await?;
                session.clear(&element).await?;
                session.send_keys(&element, text).await?;
                Ok(format!("type -> {} | {}", target.text, text))
            }
            Command::WaitFor(target) => {
                self.wait_for(session, target).await?;
                Ok(format!("wait -> {}", target.text))
            }
            Command::AssertText(expected) => {
                let body = session.find_element(&Locator::css("body")).await?;
                let text = session.text(&body).await?;
                if !text.contains(expected.as_str()) {
                    return Err(StepError::AssertionFailed {
                        expected: expected.clone(),
                    });
                }
                Ok(format!("assert:text -> found \"{}\"", expected))
            }
            Command::Unknown(raw) => Ok(format!("unknown step -> {}", raw)),
        }
    }

    async fn wait_for(
        &self,
        session: &dyn BrowserSession,
        target: &ElementTarget,
    ) -> Result<ElementRef, StepError> {
        session
            .wait_for_element(&target.locator, self.element_timeout)
            .await
            .map_err(|e| match e {
                SessionError::Timeout(_) | SessionError::NoSuchElement(_) => StepError::ElementNotFound {
                    locator: target.text.clone(),
                    timeout_ms: self.element_timeout.as_millis() as u64,
                },
                other => StepError::Session(other),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{ScriptedSession, SessionAction};

    fn interpreter() -> StepInterpreter {
        StepInterpreter::new("http://localhost:3000")
    }

    #[tokio::test]
    async fn test_navigate_relative_and_absolute() {
        let session = ScriptedSession::new();
        let line = interpreter().execute(&session, "navigate:/login").await.unwrap();
        assert_eq!(line, "navigate -> http://localhost:3000/login");

        let line = interpreter()
            .execute(&session, "navigate:https://example.com")
            .await
            .unwrap();
        assert_eq!(line, "navigate -> https://example.com");

        assert_eq!(
            session.actions(),
            vec![
                SessionAction::Navigate("http://localhost:3000/login".to_string()),
                SessionAction::Navigate("https://example.com".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_type_clears_then_sends_keys() {
        let session = ScriptedSession::new().with_element(Locator::css("#user"), "");
        let line = interpreter()
            .execute(&session, "type:css=#user|alice")
            .await
            .unwrap();

        assert_eq!(line, "type -> css=#user | alice");
        assert_eq!(session.value_of(&Locator::css("#user")).as_deref(), Some("alice"));
        assert_eq!(
            session.actions(),
            vec![
                SessionAction::Clear("css=#user".to_string()),
                SessionAction::SendKeys("css=#user".to_string(), "alice".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_click_missing_element_fails() {
        let session = ScriptedSession::new();
        let failure = interpreter()
            .execute(&session, "click:css=#submit")
            .await
            .unwrap_err();

        assert_eq!(failure.step, "click:css=#submit");
        assert!(matches!(
            failure.cause,
            StepError::ElementNotFound { ref locator, timeout_ms: 10_000 } if locator == "css=#submit"
        ));
        assert!(session.actions().is_empty());
    }

    #[tokio::test]
    async fn test_wait_does_not_interact() {
        let session = ScriptedSession::new().with_element(Locator::resolve("name=q"), "");
        let line = interpreter().execute(&session, "wait:name=q").await.unwrap();
        assert_eq!(line, "wait -> name=q");
        assert!(session.actions().is_empty());
    }

    #[tokio::test]
    async fn test_assert_text() {
        let session = ScriptedSession::new().with_body_text("Hello, Welcome back");
        let line = interpreter()
            .execute(&session, "assert:text=Welcome")
            .await
            .unwrap();
        assert_eq!(line, "assert:text -> found \"Welcome\"");

        let failure = interpreter()
            .execute(&session, "assert:text=Goodbye")
            .await
            .unwrap_err();
        assert!(matches!(failure.cause, StepError::AssertionFailed { ref expected } if expected == "Goodbye"));
        assert_eq!(
            failure.log_line(),
            "ERROR in step \"assert:text=Goodbye\": Expected text not found: Goodbye"
        );
    }

    #[tokio::test]
    async fn test_unknown_step_is_logged_not_failed() {
        let session = ScriptedSession::new();
        let line = interpreter().execute(&session, "hover:#menu").await.unwrap();
        assert_eq!(line, "unknown step -> hover:#menu");
    }

    #[tokio::test]
    async fn test_session_error_is_wrapped() {
        let session = ScriptedSession::new().failing_navigation("browser crashed");
        let failure = interpreter().execute(&session, "navigate:/").await.unwrap_err();
        assert!(matches!(failure.cause, StepError::Session(_)));
        assert_eq!(failure.step, "navigate:/");
    }
}
