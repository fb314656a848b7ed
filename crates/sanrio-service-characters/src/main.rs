//! Sanrio characters HTTP service binary.
//!
//! # Configuration
//!
//! - `ELASTICSEARCH_HOST` - Store URL (default: http://elasticsearch:9200)
//! - `ELASTICSEARCH_RETRIES` / `ELASTICSEARCH_RETRY_DELAY_SECS` - Startup retry
//! - `CHARACTER_INDEX` - Index name (default: sanrio_characters)
//! - `API_LOG_PATH` - Event log file (default: /app/logs/api.log)
//! - `SEARCH_MAX_PAGE_SIZE` - Optional cap on the search page size
//! - `RUST_LOG` - Log level (default: info)
//! - `LOG_FORMAT` - Log format: json (default) or text
//! - `SERVICE_PORT` - HTTP port (default: 8000)

use std::net::SocketAddr;

use tracing::{error, info};

use sanrio_service_characters::build_router;
use sanrio_service_shared::{
    init_logging, init_metrics, AppState, LoggingConfig, MetricsConfig, ServiceConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (reads LOG_FORMAT from environment)
    let logging_config = LoggingConfig::from_env().with_service("characters");
    init_logging(&logging_config);

    let metrics_config = MetricsConfig::from_env();
    if let Err(e) = init_metrics(&metrics_config) {
        tracing::warn!(error = %e, "failed to initialize metrics, continuing without metrics");
    }

    let config = ServiceConfig::from_env();
    let port = config.port;

    info!(
        host = %config.elasticsearch_host,
        index = %config.index,
        port = port,
        "starting characters service"
    );

    // Startup blocks here until the store answers or the retries run out.
    let state = AppState::connect(config).await.map_err(|e| {
        error!(error = %e, "failed to initialize application state");
        e
    })?;

    let app = build_router(state, &metrics_config.path);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(addr = %addr, "listening on");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
