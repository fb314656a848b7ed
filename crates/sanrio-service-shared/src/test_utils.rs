//! Test utilities for handler and router testing.
//!
//! [`TestContext`] bundles an [`AppState`] backed by an [`InMemoryStore`] and
//! an event log in a temporary directory, plus helpers to read the events
//! back.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use sanrio_lib::{ensure_index, InMemoryStore};
use serde_json::Value;
use tempfile::TempDir;

use crate::config::ServiceConfig;
use crate::event_log::EventLogger;
use crate::state::AppState;

/// An isolated state with its own store and log file.
pub struct TestContext {
    /// Temp directory holding the event log (removed on drop).
    _temp_dir: TempDir,
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub log_path: PathBuf,
}

impl TestContext {
    /// Build a context with default configuration and an ensured index.
    pub async fn new() -> Self {
        Self::with_config(ServiceConfig::default()).await
    }

    /// Build a context from `config`; its log path is replaced with a temp file.
    pub async fn with_config(mut config: ServiceConfig) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let log_path = temp_dir.path().join("logs").join("api.log");
        config.log_path = log_path.clone();

        let store = Arc::new(InMemoryStore::new());
        ensure_index(store.as_ref(), &config.index)
            .await
            .expect("create test index");

        let events =
            EventLogger::open(&log_path, config.logger_name.clone()).expect("open event log");
        let state = AppState::from_components(store.clone(), Arc::new(events), config);

        Self {
            _temp_dir: temp_dir,
            state,
            store,
            log_path,
        }
    }

    /// Every event written so far, parsed.
    pub fn events(&self) -> Vec<Value> {
        fs::read_to_string(&self.log_path)
            .unwrap_or_default()
            .lines()
            .map(|line| serde_json::from_str(line).expect("event line is JSON"))
            .collect()
    }

    /// Events whose `event` field equals `name`.
    pub fn events_named(&self, name: &str) -> Vec<Value> {
        self.events()
            .into_iter()
            .filter(|e| e["event"] == name)
            .collect()
    }
}
