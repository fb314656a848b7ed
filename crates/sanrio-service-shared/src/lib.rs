//! Shared infrastructure for the Sanrio characters HTTP service.
//!
//! This crate provides the HTTP glue around `sanrio-lib`:
//!
//! - [`AppState`]: Store client, event log and configuration for handlers
//! - [`ServiceConfig`]: Environment-driven configuration
//! - [`event_log`]: JSON-lines API event log
//! - [`middleware`]: Per-request correlation id and request events
//! - [`ApiError`] / [`HandlerError`]: Error mapping to HTTP responses
//! - [`ValidatedJson`] / [`ValidatedQuery`]: Input decoding with validation
//! - [`health`]: Liveness/readiness probes
//! - [`metrics`]: Prometheus metrics infrastructure
//! - [`logging`]: `tracing` subscriber setup
//!
//! # Architecture
//!
//! Handlers stay thin; the record schema, query construction and store
//! access live in `sanrio-lib`:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  RequestLogLayer   request_completed / request_failed       │
//! │  log_api_errors    api_error                                │
//! │  CatchPanicLayer   panic -> 500                             │
//! │  axum Handler      validate -> sanrio-lib -> response       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Testing Support
//!
//! The [`test_utils`] module provides an in-memory [`AppState`] with a
//! temporary event log. Enable the `test-utils` feature to access it from
//! dependent crates.

#![deny(warnings)]

pub mod config;
mod error;
pub mod event_log;
mod extract;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod middleware;
mod response;
mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::ServiceConfig;
pub use error::{
    log_api_errors, panic_response, ApiError, ErrorBody, HandlerError, HandlerResult,
    ValidationProblem, ERROR_NOT_FOUND, ERROR_VALIDATION,
};
pub use event_log::{EventLogger, LogLevel, LogPayload};
pub use extract::{ValidatedJson, ValidatedQuery};
pub use health::{health_live, health_ready, HealthStatus};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use metrics::{
    init_metrics, metrics_handler, record_character_operation, record_search_results,
    MetricsConfig, MetricsError,
};
pub use middleware::{
    extract_or_generate_request_id, RequestId, RequestLogLayer, UnhandledFailure,
    REQUEST_ID_HEADER,
};
pub use response::{DeletedResponse, SearchResponse};
pub use state::{AppState, AppStateError};
