//! `ping`: a single liveness check against Elasticsearch.

use anyhow::{Context, Result};

use sanrio_lib::{DocumentStore, ElasticClient, RetryPolicy, StoreInfo};

/// Connect once (no retry) and print the cluster identity.
pub async fn handle_ping(host: &str) -> Result<StoreInfo> {
    let client = ElasticClient::connect(host, RetryPolicy::once())
        .await
        .with_context(|| format!("failed to reach Elasticsearch at {}", host))?;
    let info = client.info().await.context("failed to read cluster info")?;

    println!(
        "Elasticsearch at {} is up (cluster {}, version {})",
        client.base_url(),
        info.cluster_name,
        info.version
    );
    Ok(info)
}
