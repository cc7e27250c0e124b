//! suiterun daemon
//!
//! Suite execution orchestration: configuration, the notification gateway,
//! environment provisioning and the run state machine that ties the browser
//! layer to the run record store.

pub mod config;
pub mod environment;
pub mod error;
pub mod notify;
pub mod orchestrator;
pub mod suite_file;

pub use config::DaemonConfig;
pub use environment::{EnvironmentContext, EnvironmentProvisioner, LoggingProvisioner};
pub use error::{EnvironmentError, OrchestratorError, Result};
pub use notify::NotificationGateway;
pub use orchestrator::{ExecuteOptions, Orchestrator, RunHandle};
