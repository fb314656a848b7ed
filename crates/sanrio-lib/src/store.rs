//! The document store collaborator.
//!
//! The service never talks to Elasticsearch directly; it goes through
//! [`DocumentStore`] so that handlers can be exercised against an in-memory
//! implementation in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Cluster identification returned by the liveness check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreInfo {
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub version: String,
}

/// One search hit: the document identity and its stored body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub source: Value,
}

/// Result page of a search request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHits {
    /// Total number of matching documents, across all pages.
    pub total: u64,
    /// Documents on the requested page, in store order.
    pub hits: Vec<StoredDocument>,
}

/// Document-store operations the service depends on.
///
/// `get_document` and `delete_document` report a missing identity as
/// [`Error::DocumentNotFound`](crate::Error::DocumentNotFound); every other
/// failure is passed through unchanged.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Lightweight liveness check.
    async fn info(&self) -> Result<StoreInfo>;

    async fn index_exists(&self, index: &str) -> Result<bool>;

    /// Create `index` with the given settings/mappings body.
    async fn create_index(&self, index: &str, body: &Value) -> Result<()>;

    /// Write `document`; the store assigns an id when `id` is `None`.
    /// An existing document with the same id is replaced in full.
    async fn index_document(&self, index: &str, id: Option<&str>, document: &Value)
        -> Result<String>;

    async fn get_document(&self, index: &str, id: &str) -> Result<Value>;

    async fn delete_document(&self, index: &str, id: &str) -> Result<()>;

    async fn search(&self, index: &str, body: &Value) -> Result<SearchHits>;
}
