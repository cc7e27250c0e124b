//! Daemon configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Daemon configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Base URL that run report links are built on
    pub report_base_url: String,

    /// Remote browser configuration
    pub webdriver: WebDriverConfig,

    /// Notification and monitoring endpoints
    pub integrations: IntegrationsConfig,

    /// Execution limits
    pub execution: ExecutionConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            report_base_url: "http://localhost:3000/reports".to_string(),
            webdriver: WebDriverConfig::default(),
            integrations: IntegrationsConfig::default(),
            execution: ExecutionConfig::default(),
        }
    }
}

/// WebDriver-specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebDriverConfig {
    /// Selenium Grid / driver endpoint
    pub endpoint: String,

    /// Browser name requested for new sessions
    pub browser: String,

    /// Base URL relative navigate targets are appended to
    pub base_url: String,

    /// How long element steps wait for their element
    pub element_timeout_ms: u64,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4444/wd/hub".to_string(),
            browser: "chrome".to_string(),
            base_url: "http://localhost:3000".to_string(),
            element_timeout_ms: 10_000,
        }
    }
}

impl WebDriverConfig {
    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }
}

/// Outbound integrations. Unset URLs disable the corresponding channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationsConfig {
    pub notification_url: Option<String>,

    pub monitoring_url: Option<String>,

    /// Per-call delivery timeout
    pub timeout_ms: u64,
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self {
            notification_url: None,
            monitoring_url: None,
            timeout_ms: 5_000,
        }
    }
}

/// Execution configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Browser sessions allowed at once; 0 disables the limit
    pub max_concurrent_sessions: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sessions: 4,
        }
    }
}

impl DaemonConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`; empty values count as unset
    pub fn apply_env_from<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("SELENIUM_URL") {
            self.webdriver.endpoint = v;
        }
        if let Some(v) = get("DEFAULT_BROWSER") {
            self.webdriver.browser = v;
        }
        if let Some(v) = get("TEST_BASE_URL") {
            self.webdriver.base_url = v;
        }
        if let Some(v) = get("NOTIFICATION_SERVICE_URL") {
            self.integrations.notification_url = Some(v);
        }
        if let Some(v) = get("MONITORING_SERVICE_URL") {
            self.integrations.monitoring_url = Some(v);
        }
        if let Some(v) = get("REPORT_BASE_URL") {
            self.report_base_url = v;
        }
        if let Some(v) = get("MAX_CONCURRENT_SESSIONS") {
            self.execution.max_concurrent_sessions = v
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("MAX_CONCURRENT_SESSIONS={}: {}", v, e))?;
        }
        Ok(())
    }
}
