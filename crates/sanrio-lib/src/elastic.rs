//! Elasticsearch REST client.
//!
//! Implements [`DocumentStore`] over plain HTTP/JSON with `reqwest`. Startup
//! goes through [`ElasticClient::connect`], which retries the liveness check
//! with a fixed delay before giving up.

use std::borrow::Cow;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::store::{DocumentStore, SearchHits, StoreInfo, StoredDocument};

/// Store address used when none is configured.
pub const DEFAULT_ELASTICSEARCH_HOST: &str = "http://elasticsearch:9200";

/// Bounded, fixed-delay retry for the startup connectivity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// A single attempt with no waiting.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

/// Async Elasticsearch client bound to one cluster address.
#[derive(Debug, Clone)]
pub struct ElasticClient {
    http: Client,
    base_url: String,
}

impl ElasticClient {
    /// Build a client without contacting the cluster.
    pub fn new(host: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("sanrio-lib/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: host.into().trim_end_matches('/').to_string(),
        })
    }

    /// Connect to `host`, verifying liveness with an info call.
    ///
    /// Each failed attempt logs a retry notice and sleeps `policy.delay`.
    /// After `policy.attempts` failures the error names the host and the
    /// attempt count.
    pub async fn connect(host: &str, policy: RetryPolicy) -> Result<Self> {
        let client = Self::new(host)?;

        for attempt in 1..=policy.attempts {
            match client.info().await {
                Ok(info) => {
                    info!(
                        host = %client.base_url,
                        cluster = %info.cluster_name,
                        version = %info.version,
                        "connected to elasticsearch"
                    );
                    return Ok(client);
                }
                Err(err) => {
                    warn!(
                        host = %client.base_url,
                        attempt = attempt,
                        attempts = policy.attempts,
                        error = %err,
                        "elasticsearch not reachable, retrying"
                    );
                    if attempt < policy.attempts {
                        tokio::time::sleep(policy.delay).await;
                    }
                }
            }
        }

        Err(Error::StoreUnreachable {
            host: client.base_url,
            attempts: policy.attempts,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!(method = %method, url = %url, "elasticsearch request");
        self.http.request(method, url)
    }

    /// Map non-success responses to [`Error::StoreResponse`].
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::StoreResponse {
            status: status.as_u16(),
            body,
        })
    }

    /// Path of one document, or `None` when `id` cannot be addressed.
    fn doc_path(index: &str, id: &str) -> Option<String> {
        Some(format!("{}/_doc/{}", segment(index)?, segment(id)?))
    }

    fn not_found(index: &str, id: &str) -> Error {
        Error::DocumentNotFound {
            index: index.to_string(),
            id: id.to_string(),
        }
    }
}

/// Percent-encode one path segment.
///
/// `.` and `..` survive encoding and are collapsed by URL normalization, so
/// they are refused along with the empty segment.
fn segment(value: &str) -> Option<Cow<'_, str>> {
    match value {
        "" | "." | ".." => None,
        _ => Some(urlencoding::encode(value)),
    }
}

fn index_segment(index: &str) -> Result<Cow<'_, str>> {
    segment(index).ok_or_else(|| Error::InvalidIndexName {
        index: index.to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct InfoResponse {
    #[serde(default)]
    cluster_name: String,
    #[serde(default)]
    version: InfoVersion,
}

#[derive(Debug, Default, Deserialize)]
struct InfoVersion {
    #[serde(default)]
    number: String,
}

#[derive(Debug, Deserialize)]
struct IndexResponse {
    #[serde(rename = "_id")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct GetResponse {
    #[serde(default)]
    found: bool,
    #[serde(rename = "_source", default)]
    source: Value,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    total: TotalHits,
    #[serde(default)]
    hits: Vec<RawHit>,
}

/// `hits.total` is an object since 7.x and a bare number before.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Object { value: u64 },
    Count(u64),
}

impl TotalHits {
    fn value(&self) -> u64 {
        match self {
            TotalHits::Object { value } => *value,
            TotalHits::Count(count) => *count,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source", default)]
    source: Value,
}

pub(crate) fn parse_search_response(body: Value) -> Result<SearchHits> {
    let parsed: SearchResponse =
        serde_json::from_value(body).map_err(|e| Error::MalformedResponse {
            message: format!("unexpected search response: {}", e),
        })?;

    Ok(SearchHits {
        total: parsed.hits.total.value(),
        hits: parsed
            .hits
            .hits
            .into_iter()
            .map(|h| StoredDocument {
                id: h.id,
                source: h.source,
            })
            .collect(),
    })
}

#[async_trait]
impl DocumentStore for ElasticClient {
    async fn info(&self) -> Result<StoreInfo> {
        let response = Self::check(self.request(Method::GET, "/").send().await?).await?;
        let info: InfoResponse = response.json().await?;
        Ok(StoreInfo {
            cluster_name: info.cluster_name,
            version: info.version.number,
        })
    }

    async fn index_exists(&self, index: &str) -> Result<bool> {
        let response = self
            .request(Method::HEAD, &index_segment(index)?)
            .send()
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            _ => Self::check(response).await.map(|_| true),
        }
    }

    async fn create_index(&self, index: &str, body: &Value) -> Result<()> {
        let response = self
            .request(Method::PUT, &index_segment(index)?)
            .json(body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn index_document(
        &self,
        index: &str,
        id: Option<&str>,
        document: &Value,
    ) -> Result<String> {
        let builder = match id {
            Some(id) => {
                let path = Self::doc_path(index, id).ok_or_else(|| Error::InvalidDocumentId {
                    id: id.to_string(),
                })?;
                self.request(Method::PUT, &path)
            }
            None => self.request(Method::POST, &format!("{}/_doc", index_segment(index)?)),
        };
        let response = Self::check(builder.json(document).send().await?).await?;
        let indexed: IndexResponse = response.json().await?;
        Ok(indexed.id)
    }

    async fn get_document(&self, index: &str, id: &str) -> Result<Value> {
        let path = Self::doc_path(index, id).ok_or_else(|| Self::not_found(index, id))?;
        let response = self.request(Method::GET, &path).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Self::not_found(index, id));
        }
        let found: GetResponse = Self::check(response).await?.json().await?;
        if !found.found {
            return Err(Self::not_found(index, id));
        }
        Ok(found.source)
    }

    async fn delete_document(&self, index: &str, id: &str) -> Result<()> {
        let path = Self::doc_path(index, id).ok_or_else(|| Self::not_found(index, id))?;
        let response = self.request(Method::DELETE, &path).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Self::not_found(index, id));
        }
        Self::check(response).await?;
        Ok(())
    }

    async fn search(&self, index: &str, body: &Value) -> Result<SearchHits> {
        let response = self
            .request(Method::POST, &format!("{}/_search", index_segment(index)?))
            .json(body)
            .send()
            .await?;
        let body: Value = Self::check(response).await?.json().await?;
        parse_search_response(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// What the fake cluster saw on its single connection.
    struct Captured {
        request_line: String,
        body: String,
    }

    fn find_header_end(buf: &[u8]) -> Option<usize> {
        buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
    }

    /// Accept one request, answer it with `status` and `body`, and hand back
    /// the request line and body.
    async fn fake_cluster(
        status: &'static str,
        body: &'static str,
    ) -> (ElasticClient, JoinHandle<Captured>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let host = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];

            let header_end = loop {
                let n = stream.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed before headers");
                buf.extend_from_slice(&chunk[..n]);
                if let Some(end) = find_header_end(&buf) {
                    break end;
                }
            };
            let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
            let content_length = head
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            while buf.len() < header_end + content_length {
                let n = stream.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed before body");
                buf.extend_from_slice(&chunk[..n]);
            }

            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();

            Captured {
                request_line: head.lines().next().unwrap_or_default().to_string(),
                body: String::from_utf8_lossy(&buf[header_end..header_end + content_length])
                    .to_string(),
            }
        });

        (ElasticClient::new(host).unwrap(), handle)
    }

    fn closed_port_client() -> ElasticClient {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        ElasticClient::new(format!("http://127.0.0.1:{}", port)).unwrap()
    }

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 10);
        assert_eq!(policy.delay, Duration::from_secs(5));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ElasticClient::new("http://localhost:9200/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:9200");
    }

    #[test]
    fn test_parse_search_response_object_total() {
        let body = json!({
            "hits": {
                "total": {"value": 2, "relation": "eq"},
                "hits": [
                    {"_id": "a", "_source": {"name": "Kuromi"}},
                    {"_id": "b", "_source": {"name": "My Melody"}}
                ]
            }
        });
        let hits = parse_search_response(body).unwrap();
        assert_eq!(hits.total, 2);
        assert_eq!(hits.hits[1].id, "b");
        assert_eq!(hits.hits[0].source["name"], "Kuromi");
    }

    #[test]
    fn test_parse_search_response_numeric_total() {
        let body = json!({"hits": {"total": 7, "hits": []}});
        let hits = parse_search_response(body).unwrap();
        assert_eq!(hits.total, 7);
        assert!(hits.hits.is_empty());
    }

    #[test]
    fn test_parse_search_response_malformed() {
        let err = parse_search_response(json!({"took": 3})).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_connect_unreachable_names_host_and_attempts() {
        // Bind then drop a listener so the port is known to be closed.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let host = format!("http://127.0.0.1:{}", port);
        let policy = RetryPolicy::new(2, Duration::from_millis(10));
        let err = ElasticClient::connect(&host, policy).await.unwrap_err();

        match &err {
            Error::StoreUnreachable { host: h, attempts } => {
                assert_eq!(h, &host);
                assert_eq!(*attempts, 2);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().contains("after 2 retries"));
    }

    #[test]
    fn test_segment_encodes_reserved_characters() {
        assert_eq!(segment("abc-123").unwrap(), "abc-123");
        assert_eq!(segment("../../other").unwrap(), "..%2F..%2Fother");
        assert_eq!(segment("a?pretty&b#c").unwrap(), "a%3Fpretty%26b%23c");
        assert!(segment("").is_none());
        assert!(segment(".").is_none());
        assert!(segment("..").is_none());
        assert_eq!(segment("...").unwrap(), "...");
    }

    #[tokio::test]
    async fn test_get_document_escapes_traversal_id() {
        let (client, server) =
            fake_cluster("200 OK", r#"{"found":true,"_source":{"name":"Kuromi"}}"#).await;

        let source = client
            .get_document("sanrio_characters", "../../_all/_doc/x")
            .await
            .unwrap();
        assert_eq!(source["name"], "Kuromi");

        let seen = server.await.unwrap();
        assert_eq!(
            seen.request_line,
            "GET /sanrio_characters/_doc/..%2F..%2F_all%2F_doc%2Fx HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_delete_document_escapes_query_characters() {
        let (client, server) = fake_cluster("200 OK", r#"{"result":"deleted"}"#).await;

        client
            .delete_document("sanrio_characters", "abc?refresh=true")
            .await
            .unwrap();

        let seen = server.await.unwrap();
        assert_eq!(
            seen.request_line,
            "DELETE /sanrio_characters/_doc/abc%3Frefresh%3Dtrue HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_dot_segment_ids_never_reach_the_cluster() {
        // Nothing listens here, so any request would surface as an HTTP error.
        let client = closed_port_client();

        for id in ["", ".", ".."] {
            let err = client.get_document("sanrio_characters", id).await.unwrap_err();
            assert!(err.is_not_found(), "get {:?}: {:?}", id, err);

            let err = client
                .delete_document("sanrio_characters", id)
                .await
                .unwrap_err();
            assert!(err.is_not_found(), "delete {:?}: {:?}", id, err);

            let err = client
                .index_document("sanrio_characters", Some(id), &json!({}))
                .await
                .unwrap_err();
            assert!(
                matches!(err, Error::InvalidDocumentId { .. }),
                "index {:?}: {:?}",
                id,
                err
            );
        }
    }

    #[tokio::test]
    async fn test_get_document_404_is_not_found() {
        let (client, server) = fake_cluster(
            "404 Not Found",
            r#"{"_index":"sanrio_characters","_id":"missing","found":false}"#,
        )
        .await;

        let err = client
            .get_document("sanrio_characters", "missing")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_get_document_found_false_is_not_found() {
        let (client, server) = fake_cluster("200 OK", r#"{"found":false}"#).await;

        let err = client
            .get_document("sanrio_characters", "gone")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_document_404_is_not_found() {
        let (client, server) = fake_cluster("404 Not Found", r#"{"result":"not_found"}"#).await;

        let err = client
            .delete_document("sanrio_characters", "missing")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_index_document_without_id_posts() {
        let (client, server) = fake_cluster("201 Created", r#"{"_id":"generated-1"}"#).await;

        let id = client
            .index_document("sanrio_characters", None, &json!({"name": "Pompompurin"}))
            .await
            .unwrap();
        assert_eq!(id, "generated-1");

        let seen = server.await.unwrap();
        assert_eq!(seen.request_line, "POST /sanrio_characters/_doc HTTP/1.1");
        let sent: Value = serde_json::from_str(&seen.body).unwrap();
        assert_eq!(sent, json!({"name": "Pompompurin"}));
    }

    #[tokio::test]
    async fn test_index_document_with_id_puts() {
        let (client, server) = fake_cluster("200 OK", r#"{"_id":"char-7"}"#).await;

        let id = client
            .index_document("sanrio_characters", Some("char-7"), &json!({"name": "Keroppi"}))
            .await
            .unwrap();
        assert_eq!(id, "char-7");

        let seen = server.await.unwrap();
        assert_eq!(seen.request_line, "PUT /sanrio_characters/_doc/char-7 HTTP/1.1");
    }

    #[tokio::test]
    async fn test_index_exists_maps_head_status() {
        let (client, server) = fake_cluster("200 OK", "").await;
        assert!(client.index_exists("sanrio_characters").await.unwrap());
        let seen = server.await.unwrap();
        assert_eq!(seen.request_line, "HEAD /sanrio_characters HTTP/1.1");

        let (client, server) = fake_cluster("404 Not Found", "").await;
        assert!(!client.index_exists("sanrio_characters").await.unwrap());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_create_index_sends_mapping() {
        let (client, server) = fake_cluster("200 OK", r#"{"acknowledged":true}"#).await;

        let mapping = crate::index::character_mapping();
        client
            .create_index("sanrio_characters", &mapping)
            .await
            .unwrap();

        let seen = server.await.unwrap();
        assert_eq!(seen.request_line, "PUT /sanrio_characters HTTP/1.1");
        let sent: Value = serde_json::from_str(&seen.body).unwrap();
        assert_eq!(sent, mapping);
    }

    #[tokio::test]
    async fn test_search_posts_query_and_parses_hits() {
        let (client, server) = fake_cluster(
            "200 OK",
            r#"{"hits":{"total":{"value":1,"relation":"eq"},"hits":[{"_id":"k1","_source":{"name":"Kuromi"}}]}}"#,
        )
        .await;

        let query = json!({"query": {"match_all": {}}});
        let hits = client.search("sanrio_characters", &query).await.unwrap();
        assert_eq!(hits.total, 1);
        assert_eq!(hits.hits[0].id, "k1");

        let seen = server.await.unwrap();
        assert_eq!(seen.request_line, "POST /sanrio_characters/_search HTTP/1.1");
        let sent: Value = serde_json::from_str(&seen.body).unwrap();
        assert_eq!(sent, query);
    }

    #[tokio::test]
    async fn test_server_error_maps_to_store_response() {
        let (client, server) =
            fake_cluster("500 Internal Server Error", r#"{"error":"boom"}"#).await;

        let err = client
            .search("sanrio_characters", &json!({}))
            .await
            .unwrap_err();
        match err {
            Error::StoreResponse { status, body } => {
                assert_eq!(status, 500);
                assert!(body.contains("boom"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        server.await.unwrap();
    }
}
