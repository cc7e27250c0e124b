//! Notification gateway
//!
//! Best-effort delivery of run lifecycle events and operational log records.
//! Every call is bounded by a timeout; failures are logged and counted but
//! never returned to the caller.

use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::IntegrationsConfig;

/// Source name stamped on every operational log record
pub const LOG_SOURCE: &str = "TestAutomationService";

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {0}")]
    Status(u16),
}

/// Outbound channel to the notification and monitoring services
#[derive(Clone)]
pub struct NotificationGateway {
    client: Client,
    notification_url: Option<String>,
    monitoring_url: Option<String>,
    timeout: Duration,
    failures: Arc<AtomicU64>,
}

impl NotificationGateway {
    pub fn new(config: &IntegrationsConfig) -> Self {
        Self {
            client: Client::new(),
            notification_url: normalize(config.notification_url.as_deref()),
            monitoring_url: normalize(config.monitoring_url.as_deref()),
            timeout: Duration::from_millis(config.timeout_ms),
            failures: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A gateway with no destinations; every call is a no-op
    pub fn disabled() -> Self {
        Self::new(&IntegrationsConfig::default())
    }

    /// Deliveries that failed since this gateway was created
    pub fn failed_deliveries(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Publish a run lifecycle event (`suite_passed`, `suite_failed`)
    pub async fn notify_event(&self, event_type: &str, payload: Value) {
        let Some(base) = &self.notification_url else {
            return;
        };
        let body = event_record(event_type, payload);
        if let Err(e) = self.post(&format!("{}/notifications", base), &body).await {
            self.failures.fetch_add(1, Ordering::Relaxed);
            warn!("NotificationService call failed ({}): {}", event_type, e);
        }
    }

    /// Ship an operational log record
    pub async fn send_log(&self, level: &str, message: &str, context: Value) {
        let Some(base) = &self.monitoring_url else {
            return;
        };
        let body = log_record(level, message, context);
        if let Err(e) = self.post(&format!("{}/logs", base), &body).await {
            self.failures.fetch_add(1, Ordering::Relaxed);
            warn!("MonitoringService log failed: {}", e);
        }
    }

    async fn post(&self, url: &str, body: &Value) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }
        debug!("Delivered to {}", url);
        Ok(())
    }
}

fn event_record(event_type: &str, payload: Value) -> Value {
    json!({
        "type": "email",
        "recipients": [],
        "templateId": format!("test-{}", event_type),
        "parameters": payload,
    })
}

fn log_record(level: &str, message: &str, context: Value) -> Value {
    let level = if level.trim().is_empty() {
        "INFO".to_string()
    } else {
        level.trim().to_uppercase()
    };
    json!({
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "level": level,
        "message": message,
        "source": LOG_SOURCE,
        "context": context,
    })
}

fn normalize(url: Option<&str>) -> Option<String> {
    url.map(|u| u.trim().trim_end_matches('/'))
        .filter(|u| !u.is_empty())
        .map(str::to_string)
}
