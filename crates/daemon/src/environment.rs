//! Test environment provisioning

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error::EnvironmentError;
use crate::notify::NotificationGateway;

/// Handle returned by setup and given back to teardown. Opaque to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentContext {
    pub env: String,
    pub seeded: bool,
}

/// Prepares and cleans up the environment a run executes against
#[async_trait]
pub trait EnvironmentProvisioner: Send + Sync {
    async fn setup(&self, env: &str) -> Result<EnvironmentContext, EnvironmentError>;

    async fn teardown(&self, context: &EnvironmentContext) -> Result<(), EnvironmentError>;
}

/// Provisioner that only reports setup/teardown to the monitoring service
pub struct LoggingProvisioner {
    gateway: NotificationGateway,
}

impl LoggingProvisioner {
    pub fn new(gateway: NotificationGateway) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl EnvironmentProvisioner for LoggingProvisioner {
    async fn setup(&self, env: &str) -> Result<EnvironmentContext, EnvironmentError> {
        debug!("Environment setup: {}", env);
        self.gateway
            .send_log("INFO", "Environment setup start", json!({ "env": env }))
            .await;
        Ok(EnvironmentContext {
            env: env.to_string(),
            seeded: true,
        })
    }

    async fn teardown(&self, context: &EnvironmentContext) -> Result<(), EnvironmentError> {
        debug!("Environment teardown: {}", context.env);
        self.gateway
            .send_log("INFO", "Environment teardown", json!({ "context": context }))
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_logging_provisioner_round_trip() {
        let provisioner = LoggingProvisioner::new(NotificationGateway::disabled());
        let context = provisioner.setup("staging").await.unwrap();
        assert_eq!(
            context,
            EnvironmentContext {
                env: "staging".to_string(),
                seeded: true
            }
        );
        provisioner.teardown(&context).await.unwrap();
    }
}
