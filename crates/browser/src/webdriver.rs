//! W3C WebDriver sessions over HTTP
//!
//! Talks to a Selenium Grid / standalone driver using the JSON wire format
//! from the W3C WebDriver recommendation.

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{SessionError, SessionResult};
use crate::locator::Locator;
use crate::session::{BrowserSession, ElementRef, SessionProvider};

/// Key under which W3C drivers return element references
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Per-request timeout for driver calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Session provider for remote WebDriver endpoints
#[derive(Clone)]
pub struct WebDriverProvider {
    client: Client,
}

impl WebDriverProvider {
    pub fn new() -> SessionResult<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SessionProvider for WebDriverProvider {
    async fn build(&self, endpoint: &str, browser: &str) -> SessionResult<Box<dyn BrowserSession>> {
        let endpoint = endpoint.trim_end_matches('/');
        let body = json!({
            "capabilities": {
                "alwaysMatch": { "browserName": browser }
            }
        });

        let value = send(
            &self.client,
            Method::POST,
            &format!("{}/session", endpoint),
            Some(body),
        )
        .await?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| SessionError::Protocol("new session response has no sessionId".to_string()))?;

        info!("Started {} session {} on {}", browser, session_id, endpoint);

        Ok(Box::new(WebDriverSession {
            client: self.client.clone(),
            session_url: format!("{}/session/{}", endpoint, session_id),
            session_id: session_id.to_string(),
        }))
    }
}

/// One remote WebDriver session
pub struct WebDriverSession {
    client: Client,
    session_url: String,
    session_id: String,
}

impl WebDriverSession {
    pub fn id(&self) -> &str {
        &self.session_id
    }

    async fn call(&self, method: Method, path: &str, body: Option<Value>) -> SessionResult<Value> {
        send(&self.client, method, &format!("{}{}", self.session_url, path), body).await
    }

    fn element_path(element: &ElementRef, action: &str) -> String {
        format!("/element/{}/{}", element.0, action)
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&self, url: &str) -> SessionResult<()> {
        self.call(Method::POST, "/url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    async fn find_element(&self, locator: &Locator) -> SessionResult<ElementRef> {
        let (using, value) = locator.to_webdriver();
        let found = self
            .call(
                Method::POST,
                "/element",
                Some(json!({ "using": using, "value": value })),
            )
            .await
            .map_err(|e| match e {
                SessionError::NoSuchElement(_) => SessionError::NoSuchElement(locator.to_string()),
                other => other,
            })?;

        found
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(|id| ElementRef(id.to_string()))
            .ok_or_else(|| SessionError::Protocol(format!("find element returned {}", found)))
    }

    async fn click(&self, element: &ElementRef) -> SessionResult<()> {
        self.call(Method::POST, &Self::element_path(element, "click"), Some(json!({})))
            .await
            .map(|_| ())
    }

    async fn clear(&self, element: &ElementRef) -> SessionResult<()> {
        self.call(Method::POST, &Self::element_path(element, "clear"), Some(json!({})))
            .await
            .map(|_| ())
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> SessionResult<()> {
        self.call(
            Method::POST,
            &Self::element_path(element, "value"),
            Some(json!({ "text": text })),
        )
        .await
        .map(|_| ())
    }

    async fn text(&self, element: &ElementRef) -> SessionResult<String> {
        let value = self
            .call(Method::GET, &Self::element_path(element, "text"), None)
            .await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| SessionError::Protocol(format!("element text returned {}", value)))
    }

    async fn close(&self) -> SessionResult<()> {
        debug!("Closing WebDriver session {}", self.session_id);
        self.call(Method::DELETE, "", None).await.map(|_| ())
    }
}

/// Issue one WebDriver command and unwrap its `value` member
async fn send(client: &Client, method: Method, url: &str, body: Option<Value>) -> SessionResult<Value> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request.send().await?;
    let status = response.status();
    let payload: Value = response.json().await.map_err(|e| {
        SessionError::Protocol(format!("undecodable response (HTTP {}): {}", status.as_u16(), e))
    })?;
    let value = payload.get("value").cloned().unwrap_or(Value::Null);

    if status.is_success() {
        return Ok(value);
    }

    let error = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if error == "no such element" {
        return Err(SessionError::NoSuchElement(message));
    }

    Err(SessionError::WebDriver {
        status: status.as_u16(),
        error,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    async fn start_session(server: &MockServer) -> Box<dyn BrowserSession> {
        server
            .mock_async(|when, then| {
                when.method(POST).path("/wd/hub/session");
                then.status(200)
                    .json_body(json!({ "value": { "sessionId": "abc", "capabilities": {} } }));
            })
            .await;

        WebDriverProvider::new()
            .unwrap()
            .build(&server.url("/wd/hub/"), "chrome")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_build_and_navigate() {
        let server = MockServer::start_async().await;
        let session = start_session(&server).await;

        let navigate = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/wd/hub/session/abc/url")
                    .json_body(json!({ "url": "http://app/login" }));
                then.status(200).json_body(json!({ "value": null }));
            })
            .await;

        session.navigate("http://app/login").await.unwrap();
        navigate.assert_async().await;
    }

    #[tokio::test]
    async fn test_find_element_translates_id_strategy() {
        let server = MockServer::start_async().await;
        let session = start_session(&server).await;

        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/wd/hub/session/abc/element")
                    .json_body(json!({ "using": "css selector", "value": "[id=\"user\"]" }));
                then.status(200)
                    .json_body(json!({ "value": { "element-6066-11e4-a52e-4f735466cecf": "el-1" } }));
            })
            .await;

        let element = session.find_element(&Locator::resolve("id=user")).await.unwrap();
        assert_eq!(element, ElementRef("el-1".to_string()));
    }

    #[tokio::test]
    async fn test_missing_element_maps_to_no_such_element() {
        let server = MockServer::start_async().await;
        let session = start_session(&server).await;

        server
            .mock_async(|when, then| {
                when.method(POST).path("/wd/hub/session/abc/element");
                then.status(404).json_body(json!({
                    "value": { "error": "no such element", "message": "gone" }
                }));
            })
            .await;

        let err = session
            .find_element(&Locator::css("#missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NoSuchElement(ref l) if l == "css=#missing"));

        let err = session
            .wait_for_element(&Locator::css("#missing"), Duration::from_millis(300))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_wait_is_bounded_by_slow_driver() {
        let server = MockServer::start_async().await;
        let session = start_session(&server).await;

        server
            .mock_async(|when, then| {
                when.method(POST).path("/wd/hub/session/abc/element");
                then.status(404)
                    .json_body(json!({
                        "value": { "error": "no such element", "message": "gone" }
                    }))
                    .delay(Duration::from_millis(2_000));
            })
            .await;

        let started = std::time::Instant::now();
        let err = session
            .wait_for_element(&Locator::css("#slow"), Duration::from_millis(300))
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, SessionError::Timeout(ref l) if l == "css=#slow"));
        assert!(elapsed < Duration::from_millis(1_000), "waited {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_undecodable_body_is_protocol_error() {
        let server = MockServer::start_async().await;
        let session = start_session(&server).await;

        server
            .mock_async(|when, then| {
                when.method(POST).path("/wd/hub/session/abc/url");
                then.status(200).body("<html>proxy says hi</html>");
            })
            .await;

        let err = session.navigate("http://app/").await.unwrap_err();
        assert!(matches!(err, SessionError::Protocol(ref m) if m.contains("HTTP 200")));
    }

    #[tokio::test]
    async fn test_driver_error_is_reported() {
        let server = MockServer::start_async().await;
        let session = start_session(&server).await;

        server
            .mock_async(|when, then| {
                when.method(GET).path("/wd/hub/session/abc/element/el-1/text");
                then.status(500).json_body(json!({
                    "value": { "error": "stale element reference", "message": "detached" }
                }));
            })
            .await;

        let err = session
            .text(&ElementRef("el-1".to_string()))
            .await
            .unwrap_err();
        match err {
            SessionError::WebDriver { status, error, .. } => {
                assert_eq!(status, 500);
                assert_eq!(error, "stale element reference");
            }
            other => panic!("Expected WebDriver error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_close_deletes_session() {
        let server = MockServer::start_async().await;
        let session = start_session(&server).await;

        let delete = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/wd/hub/session/abc");
                then.status(200).json_body(json!({ "value": null }));
            })
            .await;

        session.close().await.unwrap();
        delete.assert_async().await;
    }
}
