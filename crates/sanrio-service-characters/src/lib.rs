//! Sanrio characters HTTP service.
//!
//! # Endpoints
//!
//! - `POST /characters` - Create a character
//! - `GET /characters/{id}` - Fetch a character
//! - `PUT /characters/{id}` - Replace a character
//! - `DELETE /characters/{id}` - Delete a character
//! - `GET /search` - Filtered, optionally fuzzy, paginated search
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe (checks the store)
//! - `GET /metrics` - Prometheus metrics (path set by `METRICS_PATH`)

#![deny(warnings)]

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;

use sanrio_service_shared::{
    health_live, health_ready, log_api_errors, metrics_handler, panic_response, AppState,
    RequestLogLayer,
};

pub mod handlers;

/// Default path of the Prometheus endpoint.
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

/// Build the application router.
///
/// Layers, outermost first: request events, `api_error` events, panic
/// recovery. Used by `main` and by the integration tests.
pub fn build_router(state: AppState, metrics_path: &str) -> Router {
    Router::new()
        .route("/characters", post(handlers::create_character))
        .route(
            "/characters/{id}",
            get(handlers::get_character)
                .put(handlers::update_character)
                .delete(handlers::delete_character),
        )
        .route("/search", get(handlers::search_characters))
        .route("/health/live", get(health_live))
        .route("/health/ready", get(health_ready))
        .route(metrics_path, get(metrics_handler))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn_with_state(state.clone(), log_api_errors))
        .layer(RequestLogLayer::new(state.events_arc()))
        .with_state(state)
}
