//! `ensure-index`: create the character index if it is missing.

use anyhow::{Context, Result};

use sanrio_lib::{ensure_index, ElasticClient, RetryPolicy};

/// Connect with `policy` and make sure `index` exists.
///
/// Returns `true` when the index was created by this call.
pub async fn handle_ensure_index(host: &str, index: &str, policy: RetryPolicy) -> Result<bool> {
    let client = ElasticClient::connect(host, policy)
        .await
        .with_context(|| format!("failed to reach Elasticsearch at {}", host))?;

    let created = ensure_index(&client, index)
        .await
        .with_context(|| format!("failed to ensure index {}", index))?;

    if created {
        println!("Created index {}", index);
    } else {
        println!("Index {} already exists", index);
    }
    Ok(created)
}
