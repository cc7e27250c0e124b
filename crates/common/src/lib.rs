//! suiterun Common Library
//!
//! Shared data model, errors and run record storage for the suiterun
//! orchestrator.

pub mod error;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result};
pub use store::{InMemoryStore, RunRecordStore};
pub use types::*;
