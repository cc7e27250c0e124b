//! Run record storage
//!
//! The [`RunRecordStore`] trait is the only state shared between concurrent
//! runs. [`InMemoryStore`] keeps everything for the lifetime of the process;
//! a durable backend implements the same trait.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::*;

/// Suite and run persistence.
///
/// Lookups of a missing key return `Ok(None)` (or `Ok(false)` for deletes)
/// rather than an error. Every update is atomic per key.
pub trait RunRecordStore: Send + Sync {
    // ========================================================================
    // Suites
    // ========================================================================

    fn list_suites(&self, page: PageRequest) -> Result<Vec<TestSuite>>;

    fn create_suite(&self, draft: SuiteDraft) -> Result<TestSuite>;

    fn get_suite(&self, id: &str) -> Result<Option<TestSuite>>;

    fn update_suite(&self, id: &str, patch: SuitePatch) -> Result<Option<TestSuite>>;

    fn delete_suite(&self, id: &str) -> Result<bool>;

    // ========================================================================
    // Runs
    // ========================================================================

    fn create_run(&self, suite_id: &str, status: RunStatus) -> Result<Run>;

    fn update_run(&self, id: &str, patch: RunPatch) -> Result<Option<Run>>;

    fn get_run(&self, id: &str) -> Result<Option<Run>>;

    fn list_runs(&self, filter: &RunFilter, page: PageRequest) -> Result<Vec<Run>>;

    /// Append one log line to a run
    fn append_run_log(&self, id: &str, line: String) -> Result<Option<Run>> {
        self.update_run(id, RunPatch::log(line))
    }
}

/// Map that remembers insertion order
struct Collection<T> {
    items: HashMap<String, T>,
    order: Vec<String>,
}

impl<T: Clone> Collection<T> {
    fn new() -> Self {
        Self {
            items: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn insert(&mut self, id: String, item: T) {
        if self.items.insert(id.clone(), item).is_none() {
            self.order.push(id);
        }
    }

    fn remove(&mut self, id: &str) -> bool {
        if self.items.remove(id).is_some() {
            self.order.retain(|k| k != id);
            true
        } else {
            false
        }
    }

    fn page<F>(&self, page: PageRequest, mut keep: F) -> Vec<T>
    where
        F: FnMut(&T) -> bool,
    {
        self.order
            .iter()
            .filter_map(|id| self.items.get(id))
            .filter(|item| keep(item))
            .skip(page.offset())
            .take(page.size)
            .cloned()
            .collect()
    }
}

/// Process-lifetime store backed by locked maps
pub struct InMemoryStore {
    suites: RwLock<Collection<TestSuite>>,
    runs: RwLock<Collection<Run>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            suites: RwLock::new(Collection::new()),
            runs: RwLock::new(Collection::new()),
        }
    }
}

impl RunRecordStore for InMemoryStore {
    fn list_suites(&self, page: PageRequest) -> Result<Vec<TestSuite>> {
        Ok(self.suites.read().page(page, |_| true))
    }

    fn create_suite(&self, draft: SuiteDraft) -> Result<TestSuite> {
        draft.validate()?;
        let suite = draft.into_suite(Utc::now());

        let mut suites = self.suites.write();
        if suites.items.contains_key(&suite.id) {
            return Err(Error::AlreadyExists {
                kind: "suite".to_string(),
                id: suite.id,
            });
        }
        suites.insert(suite.id.clone(), suite.clone());

        debug!(suite_id = %suite.id, "Created suite: {}", suite.name);
        Ok(suite)
    }

    fn get_suite(&self, id: &str) -> Result<Option<TestSuite>> {
        Ok(self.suites.read().items.get(id).cloned())
    }

    fn update_suite(&self, id: &str, patch: SuitePatch) -> Result<Option<TestSuite>> {
        let mut suites = self.suites.write();
        let Some(suite) = suites.items.get_mut(id) else {
            return Ok(None);
        };
        patch.apply(suite, Utc::now());
        Ok(Some(suite.clone()))
    }

    fn delete_suite(&self, id: &str) -> Result<bool> {
        Ok(self.suites.write().remove(id))
    }

    fn create_run(&self, suite_id: &str, status: RunStatus) -> Result<Run> {
        let run = Run::new(suite_id, status);
        self.runs.write().insert(run.id.clone(), run.clone());
        debug!(run_id = %run.id, suite_id, "Created run ({})", status);
        Ok(run)
    }

    fn update_run(&self, id: &str, patch: RunPatch) -> Result<Option<Run>> {
        let mut runs = self.runs.write();
        let Some(run) = runs.items.get_mut(id) else {
            return Ok(None);
        };
        patch.apply(run)?;
        Ok(Some(run.clone()))
    }

    fn get_run(&self, id: &str) -> Result<Option<Run>> {
        Ok(self.runs.read().items.get(id).cloned())
    }

    fn list_runs(&self, filter: &RunFilter, page: PageRequest) -> Result<Vec<Run>> {
        Ok(self.runs.read().page(page, |run| filter.matches(run)))
    }
}
