//! Scripted in-process browser session for tests
//!
//! Elements are registered up front by locator; every interaction is recorded
//! so tests can assert on what a run did to the page.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{SessionError, SessionResult};
use crate::locator::Locator;
use crate::session::{BrowserSession, ElementRef, SessionProvider};

/// An interaction observed by a [`ScriptedSession`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    Navigate(String),
    Click(String),
    Clear(String),
    SendKeys(String, String),
    Close,
}

#[derive(Debug, Default)]
struct Page {
    /// Element text keyed by locator display form
    elements: HashMap<String, String>,
    values: HashMap<String, String>,
    actions: Vec<SessionAction>,
    navigation_error: Option<String>,
    navigation_delay: Option<Duration>,
    close_error: Option<String>,
    closed: bool,
}

/// Cloneable handle onto one scripted page; clones share state
#[derive(Debug, Clone)]
pub struct ScriptedSession {
    page: Arc<Mutex<Page>>,
}

impl Default for ScriptedSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedSession {
    /// A page with an empty `body`
    pub fn new() -> Self {
        let session = Self {
            page: Arc::new(Mutex::new(Page::default())),
        };
        session.with_body_text("")
    }

    pub fn with_element(self, locator: Locator, text: &str) -> Self {
        self.page
            .lock()
            .elements
            .insert(locator.to_string(), text.to_string());
        self
    }

    pub fn with_body_text(self, text: &str) -> Self {
        self.with_element(Locator::css("body"), text)
    }

    pub fn failing_navigation(self, message: &str) -> Self {
        self.page.lock().navigation_error = Some(message.to_string());
        self
    }

    /// Every navigation takes `delay` before it completes
    pub fn with_navigation_delay(self, delay: Duration) -> Self {
        self.page.lock().navigation_delay = Some(delay);
        self
    }

    pub fn failing_close(self, message: &str) -> Self {
        self.page.lock().close_error = Some(message.to_string());
        self
    }

    pub fn actions(&self) -> Vec<SessionAction> {
        self.page
            .lock()
            .actions
            .iter()
            .filter(|a| **a != SessionAction::Close)
            .cloned()
            .collect()
    }

    pub fn value_of(&self, locator: &Locator) -> Option<String> {
        self.page.lock().values.get(&locator.to_string()).cloned()
    }

    pub fn is_closed(&self) -> bool {
        self.page.lock().closed
    }

    fn record(&self, action: SessionAction) {
        self.page.lock().actions.push(action);
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn navigate(&self, url: &str) -> SessionResult<()> {
        let delay = self.page.lock().navigation_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = self.page.lock().navigation_error.clone() {
            return Err(SessionError::Other(message));
        }
        self.record(SessionAction::Navigate(url.to_string()));
        Ok(())
    }

    async fn find_element(&self, locator: &Locator) -> SessionResult<ElementRef> {
        let key = locator.to_string();
        if self.page.lock().elements.contains_key(&key) {
            Ok(ElementRef(key))
        } else {
            Err(SessionError::NoSuchElement(key))
        }
    }

    /// Answers immediately instead of polling so tests never sleep
    async fn wait_for_element(
        &self,
        locator: &Locator,
        _timeout: Duration,
    ) -> SessionResult<ElementRef> {
        self.find_element(locator)
            .await
            .map_err(|_| SessionError::Timeout(locator.to_string()))
    }

    async fn click(&self, element: &ElementRef) -> SessionResult<()> {
        self.record(SessionAction::Click(element.0.clone()));
        Ok(())
    }

    async fn clear(&self, element: &ElementRef) -> SessionResult<()> {
        self.page.lock().values.remove(&element.0);
        self.record(SessionAction::Clear(element.0.clone()));
        Ok(())
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> SessionResult<()> {
        self.page
            .lock()
            .values
            .entry(element.0.clone())
            .or_default()
            .push_str(text);
        self.record(SessionAction::SendKeys(element.0.clone(), text.to_string()));
        Ok(())
    }

    async fn text(&self, element: &ElementRef) -> SessionResult<String> {
        self.page
            .lock()
            .elements
            .get(&element.0)
            .cloned()
            .ok_or_else(|| SessionError::NoSuchElement(element.0.clone()))
    }

    async fn close(&self) -> SessionResult<()> {
        let mut page = self.page.lock();
        page.actions.push(SessionAction::Close);
        if let Some(message) = page.close_error.clone() {
            return Err(SessionError::Other(message));
        }
        page.closed = true;
        Ok(())
    }
}

type SessionFactory = Box<dyn Fn() -> ScriptedSession + Send + Sync>;

/// Hands out scripted sessions, remembering each one it built
pub struct ScriptedProvider {
    factory: SessionFactory,
    build_error: Option<String>,
    built: Mutex<Vec<ScriptedSession>>,
    peak_open: AtomicUsize,
}

impl ScriptedProvider {
    /// Every build returns a fresh session from `factory`
    pub fn from_fn<F>(factory: F) -> Self
    where
        F: Fn() -> ScriptedSession + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            build_error: None,
            built: Mutex::new(Vec::new()),
            peak_open: AtomicUsize::new(0),
        }
    }

    /// Every build shares the state of `session`
    pub fn new(session: ScriptedSession) -> Self {
        Self::from_fn(move || session.clone())
    }

    /// Every build fails with `message`
    pub fn failing(message: &str) -> Self {
        let mut provider = Self::from_fn(ScriptedSession::new);
        provider.build_error = Some(message.to_string());
        provider
    }

    pub fn built(&self) -> Vec<ScriptedSession> {
        self.built.lock().clone()
    }

    /// Most sessions that were built and not yet closed at any one time
    pub fn peak_open(&self) -> usize {
        self.peak_open.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvider for ScriptedProvider {
    async fn build(&self, _endpoint: &str, _browser: &str) -> SessionResult<Box<dyn BrowserSession>> {
        if let Some(message) = &self.build_error {
            return Err(SessionError::Other(message.clone()));
        }
        let session = (self.factory)();
        let mut built = self.built.lock();
        let open = built.iter().filter(|s| !s.is_closed()).count() + 1;
        self.peak_open.fetch_max(open, Ordering::SeqCst);
        built.push(session.clone());
        Ok(Box::new(session))
    }
}
