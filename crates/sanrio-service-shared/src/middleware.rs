//! HTTP middleware for the Sanrio services.
//!
//! This module provides:
//! - [`RequestId`]: Newtype for correlation ID extraction/generation
//! - [`extract_or_generate_request_id`]: Extract X-Request-ID header or generate UUID v7
//! - [`RequestLogLayer`]: Tower middleware that writes one event per request
//!
//! # Request events
//!
//! For every request the layer records the start time, assigns a correlation
//! id (also stored in the request extensions and echoed in the `x-request-id`
//! response header) and, once the inner service answers, appends either
//!
//! - `request_completed` (INFO) with method, path, status code, duration and
//!   client address, or
//! - `request_failed` (ERROR) with the error message and duration, when the
//!   response carries an [`UnhandledFailure`] marker or the inner service
//!   itself failed.
//!
//! The response is passed through unchanged apart from the header. HTTP
//! request counters and latency histograms are recorded at the same point.

use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::extract::{ConnectInfo, FromRequestParts, MatchedPath};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, Request, Response};
use pin_project_lite::pin_project;
use serde_json::json;
use tower::{Layer, Service};
use tracing::{info_span, Span};
use uuid::Uuid;

use crate::event_log::EventLogger;

/// Header carrying the correlation id in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Newtype wrapper for request correlation IDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    /// Create a new request ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new UUID v7 request ID.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the request ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Handlers receive the id assigned by [`RequestLogLayer`]; outside the
/// layer a fresh one is generated.
impl<S: Send + Sync> FromRequestParts<S> for RequestId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestId>()
            .cloned()
            .unwrap_or_else(RequestId::generate))
    }
}

/// Extract the request ID from headers or generate a new UUID v7.
///
/// Looks for the `X-Request-ID` header (case-insensitive). If not present,
/// empty, or invalid UTF-8, generates a new UUID v7 (time-sortable).
pub fn extract_or_generate_request_id(headers: &HeaderMap) -> RequestId {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(RequestId::from)
        .unwrap_or_else(RequestId::generate)
}

/// Response marker for a failure that escaped the handler.
///
/// Set on 500 responses produced for unhandled store errors and panics so
/// that [`RequestLogLayer`] reports `request_failed` with the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnhandledFailure(pub String);

/// Elapsed seconds rounded to 4 decimal places.
pub fn round_duration(seconds: f64) -> f64 {
    (seconds * 10_000.0).round() / 10_000.0
}

/// Convert HTTP status code to bucket label.
fn status_bucket(status: u16) -> &'static str {
    match status {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}

// =============================================================================
// RequestLogLayer - Tower middleware for request events
// =============================================================================

/// Tower layer that writes `request_completed` / `request_failed` events.
#[derive(Debug, Clone)]
pub struct RequestLogLayer {
    events: Arc<EventLogger>,
}

impl RequestLogLayer {
    pub fn new(events: Arc<EventLogger>) -> Self {
        Self { events }
    }
}

impl<S> Layer<S> for RequestLogLayer {
    type Service = RequestLogMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLogMiddleware {
            inner,
            events: Arc::clone(&self.events),
        }
    }
}

/// Middleware service created by [`RequestLogLayer`].
#[derive(Debug, Clone)]
pub struct RequestLogMiddleware<S> {
    inner: S,
    events: Arc<EventLogger>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestLogMiddleware<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Display,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = RequestLogFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let start = Instant::now();

        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        // Metric labels use the route template to keep cardinality bounded.
        let route = req
            .extensions()
            .get::<MatchedPath>()
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| path.clone());
        let client = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        let request_id = extract_or_generate_request_id(req.headers());
        req.extensions_mut().insert(request_id.clone());

        let span = info_span!(
            "request",
            request_id = %request_id,
            method = %method,
            path = %path,
        );

        let future = {
            let _enter = span.enter();
            tracing::debug!("handling request");
            self.inner.call(req)
        };

        RequestLogFuture {
            inner: future,
            start,
            method,
            path,
            route,
            client,
            request_id,
            events: Arc::clone(&self.events),
            span,
        }
    }
}

pin_project! {
    /// Future wrapper that writes the request event on completion.
    pub struct RequestLogFuture<F> {
        #[pin]
        inner: F,
        start: Instant,
        method: String,
        path: String,
        route: String,
        client: Option<String>,
        request_id: RequestId,
        events: Arc<EventLogger>,
        span: Span,
    }
}

impl<F, ResBody, E> Future for RequestLogFuture<F>
where
    F: Future<Output = Result<Response<ResBody>, E>>,
    E: Display,
{
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let _enter = this.span.enter();

        let mut result = match this.inner.poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(result) => result,
        };

        let elapsed = this.start.elapsed().as_secs_f64();
        let duration_seconds = round_duration(elapsed);

        let status_label = match &mut result {
            Ok(response) => {
                let status = response.status().as_u16();
                if let Ok(value) = HeaderValue::from_str(this.request_id.as_str()) {
                    response.headers_mut().insert(REQUEST_ID_HEADER, value);
                }

                match response.extensions().get::<UnhandledFailure>() {
                    Some(UnhandledFailure(error)) => {
                        this.events.error(json!({
                            "request_id": this.request_id.as_str(),
                            "event": "request_failed",
                            "method": this.method,
                            "path": this.path,
                            "error": error,
                            "duration_seconds": duration_seconds,
                        }));
                        tracing::error!(error = %error, duration_seconds, "request failed");
                    }
                    None => {
                        this.events.info(json!({
                            "request_id": this.request_id.as_str(),
                            "event": "request_completed",
                            "method": this.method,
                            "path": this.path,
                            "status_code": status,
                            "duration_seconds": duration_seconds,
                            "client": this.client,
                        }));
                        tracing::info!(status, duration_seconds, "request completed");
                    }
                }
                status_bucket(status)
            }
            Err(err) => {
                this.events.error(json!({
                    "request_id": this.request_id.as_str(),
                    "event": "request_failed",
                    "method": this.method,
                    "path": this.path,
                    "error": err.to_string(),
                    "duration_seconds": duration_seconds,
                }));
                tracing::error!(error = %err, duration_seconds, "request failed");
                "5xx"
            }
        };

        metrics::counter!(
            "http_requests_total",
            "method" => this.method.clone(),
            "path" => this.route.clone(),
            "status" => status_label
        )
        .increment(1);
        metrics::histogram!(
            "http_request_duration_seconds",
            "method" => this.method.clone(),
            "path" => this.route.clone()
        )
        .record(elapsed);

        Poll::Ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_generate() {
        let id1 = RequestId::generate();
        let id2 = RequestId::generate();

        assert_ne!(id1, id2);
        assert_eq!(id1.as_str().len(), 36);
        assert!(id1.as_str().contains('-'));
    }

    #[test]
    fn test_extract_request_id_from_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("test-123"));

        let id = extract_or_generate_request_id(&headers);
        assert_eq!(id.as_str(), "test-123");
    }

    #[test]
    fn test_extract_request_id_case_insensitive() {
        let mut headers = HeaderMap::new();
        let name = axum::http::HeaderName::from_bytes(b"X-Request-ID").unwrap();
        headers.insert(name, HeaderValue::from_static("test-456"));

        let id = extract_or_generate_request_id(&headers);
        assert_eq!(id.as_str(), "test-456");
    }

    #[test]
    fn test_extract_request_id_generates_when_empty() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static(""));

        let id = extract_or_generate_request_id(&headers);
        assert_eq!(id.as_str().len(), 36);
    }

    #[test]
    fn test_round_duration() {
        assert_eq!(round_duration(0.123456), 0.1235);
        assert_eq!(round_duration(1.0), 1.0);
        assert_eq!(round_duration(0.00004), 0.0);
    }

    #[test]
    fn test_status_bucket() {
        assert_eq!(status_bucket(201), "2xx");
        assert_eq!(status_bucket(404), "4xx");
        assert_eq!(status_bucket(422), "4xx");
        assert_eq!(status_bucket(500), "5xx");
    }
}
