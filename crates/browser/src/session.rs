//! Browser session abstraction

use async_trait::async_trait;
use std::time::{Duration, Instant};

use crate::error::{SessionError, SessionResult};
use crate::locator::Locator;

/// Interval between find attempts while waiting for an element
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Opaque handle to an element within one session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

/// A remote browser session owned by exactly one run
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn navigate(&self, url: &str) -> SessionResult<()>;

    /// Find an element without waiting
    async fn find_element(&self, locator: &Locator) -> SessionResult<ElementRef>;

    /// Poll for an element until it exists or `timeout` elapses.
    ///
    /// Each find attempt is cut off at the deadline, so a slow driver cannot
    /// stretch the wait.
    async fn wait_for_element(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> SessionResult<ElementRef> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, self.find_element(locator)).await {
                Ok(Ok(element)) => return Ok(element),
                Ok(Err(SessionError::NoSuchElement(_))) => {}
                Ok(Err(e)) => return Err(e),
                Err(_) => return Err(SessionError::Timeout(locator.to_string())),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(SessionError::Timeout(locator.to_string()));
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn click(&self, element: &ElementRef) -> SessionResult<()>;

    async fn clear(&self, element: &ElementRef) -> SessionResult<()>;

    async fn send_keys(&self, element: &ElementRef, text: &str) -> SessionResult<()>;

    /// Visible text of an element
    async fn text(&self, element: &ElementRef) -> SessionResult<String>;

    async fn close(&self) -> SessionResult<()>;
}

/// Builds sessions against a remote endpoint
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn build(&self, endpoint: &str, browser: &str) -> SessionResult<Box<dyn BrowserSession>>;
}
