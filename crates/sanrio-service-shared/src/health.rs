//! Health check handlers for container probes.
//!
//! Provides `/health/live` and `/health/ready` endpoints that return JSON
//! status responses.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Health status response for liveness and readiness probes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Status indicator: "ok" or "not_ready: <reason>".
    pub status: String,

    /// Service name for identification.
    pub service: String,

    /// Service version from build-time.
    pub version: String,

    /// Cluster name reported by the store (for readiness check).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_cluster: Option<String>,

    /// Index served by this instance (for readiness check).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
}

impl HealthStatus {
    /// Create a healthy liveness status.
    pub fn alive(service: &str, version: &str) -> Self {
        Self {
            status: "ok".to_string(),
            service: service.to_string(),
            version: version.to_string(),
            store_cluster: None,
            index: None,
        }
    }

    /// Create a ready status with store information.
    pub fn ready(service: &str, version: &str, cluster: &str, index: &str) -> Self {
        Self {
            status: "ok".to_string(),
            service: service.to_string(),
            version: version.to_string(),
            store_cluster: Some(cluster.to_string()),
            index: Some(index.to_string()),
        }
    }

    /// Create a not-ready status.
    pub fn not_ready(service: &str, version: &str, reason: &str) -> Self {
        Self {
            status: format!("not_ready: {}", reason),
            service: service.to_string(),
            version: version.to_string(),
            store_cluster: None,
            index: None,
        }
    }
}

/// Liveness probe handler.
///
/// Returns 200 OK if the process is serving requests; it does not touch the
/// store.
pub async fn health_live() -> impl IntoResponse {
    let status = HealthStatus::alive(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    (StatusCode::OK, Json(status))
}

/// Readiness probe handler.
///
/// Returns 200 OK when the store answers a liveness check, 503 otherwise.
pub async fn health_ready(State(state): State<AppState>) -> Response {
    let service = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");

    match state.store().info().await {
        Ok(info) => {
            let status = HealthStatus::ready(service, version, &info.cluster_name, state.index());
            (StatusCode::OK, Json(status)).into_response()
        }
        Err(err) => {
            tracing::warn!(error = %err, "readiness check failed");
            let status = HealthStatus::not_ready(service, version, "document store unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, Json(status)).into_response()
        }
    }
}
