//! Application state for the HTTP services.
//!
//! Holds the long-lived resources every handler needs: the document store
//! client, the event log, and the configuration they were built from.

use std::sync::Arc;

use sanrio_lib::{ensure_index, DocumentStore, ElasticClient, Error as LibError};

use crate::config::ServiceConfig;
use crate::event_log::EventLogger;

/// Error during application state initialization.
#[derive(Debug)]
pub enum AppStateError {
    /// The event log file could not be opened.
    EventLog(std::io::Error),

    /// The document store was unreachable or rejected index setup.
    Store(LibError),
}

impl std::fmt::Display for AppStateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EventLog(e) => write!(f, "failed to open event log: {}", e),
            Self::Store(e) => write!(f, "failed to prepare document store: {}", e),
        }
    }
}

impl std::error::Error for AppStateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::EventLog(e) => Some(e),
            Self::Store(e) => Some(e),
        }
    }
}

impl From<LibError> for AppStateError {
    fn from(err: LibError) -> Self {
        Self::Store(err)
    }
}

impl From<std::io::Error> for AppStateError {
    fn from(err: std::io::Error) -> Self {
        Self::EventLog(err)
    }
}

/// Shared application state for all axum handlers.
///
/// This struct is cheaply cloneable (using `Arc` internally) and should be
/// shared via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn DocumentStore>,
    events: Arc<EventLogger>,
    config: ServiceConfig,
}

impl AppState {
    /// Open the event log, connect to Elasticsearch (retrying per
    /// `config.retry`) and make sure the character index exists.
    ///
    /// Fails when the store stays unreachable; the service must not start.
    pub async fn connect(config: ServiceConfig) -> Result<Self, AppStateError> {
        let events = EventLogger::open(&config.log_path, config.logger_name.clone())?;
        tracing::info!(path = %config.log_path.display(), "event log opened");

        let client = ElasticClient::connect(&config.elasticsearch_host, config.retry).await?;
        ensure_index(&client, &config.index).await?;

        Ok(Self::from_components(Arc::new(client), Arc::new(events), config))
    }

    /// Create application state from pre-built components.
    ///
    /// This is useful for testing with an in-memory store.
    pub fn from_components(
        store: Arc<dyn DocumentStore>,
        events: Arc<EventLogger>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                store,
                events,
                config,
            }),
        }
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.inner.store.as_ref()
    }

    pub fn events(&self) -> &EventLogger {
        &self.inner.events
    }

    /// Shared handle to the event log, for middleware layers.
    pub fn events_arc(&self) -> Arc<EventLogger> {
        Arc::clone(&self.inner.events)
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    /// Index holding character documents.
    pub fn index(&self) -> &str {
        &self.inner.config.index
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("index", &self.inner.config.index)
            .field("elasticsearch_host", &self.inner.config.elasticsearch_host)
            .field("log_path", &self.inner.events.path())
            .finish()
    }
}
