//! API error types and their HTTP mapping.
//!
//! Handlers return `Result<_, HandlerError>`:
//!
//! - [`ApiError`] is a domain error with a machine code, a human message and a
//!   status. It renders as `{"error": code, "message": message}` and is logged
//!   as an `api_error` event by [`log_api_errors`].
//! - [`ValidationErrors`] renders as a 422 [`ValidationProblem`].
//! - Any other library error is *unhandled*: it renders as a bare 500 and is
//!   reported by the request middleware as `request_failed`.

use std::any::Any;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use sanrio_lib::{Error as LibError, FieldError, ValidationErrors};

use crate::middleware::{RequestId, UnhandledFailure};
use crate::state::AppState;

/// Error code for missing documents.
pub const ERROR_NOT_FOUND: &str = "NOT_FOUND";

/// Error code for rejected payloads and query parameters.
pub const ERROR_VALIDATION: &str = "VALIDATION_ERROR";

/// Domain error surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    /// Short machine-readable code, e.g. `NOT_FOUND`.
    pub code: String,
    /// Human-readable explanation.
    pub message: String,
    /// HTTP status of the response.
    pub status: StatusCode,
}

/// JSON body of every [`ApiError`] response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl ApiError {
    /// Create an error with the default 400 status.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            status: StatusCode::BAD_REQUEST,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// 404 for a character id that does not exist.
    pub fn character_not_found(id: &str) -> Self {
        Self::new(ERROR_NOT_FOUND, format!("Character {} not found", id))
            .with_status(StatusCode::NOT_FOUND)
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.code.clone(),
            message: self.message.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body())).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

/// 422 body for payloads or parameters that fail validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationProblem {
    pub error: String,
    pub message: String,
    pub detail: Vec<FieldError>,
}

impl ValidationProblem {
    pub fn new(detail: Vec<FieldError>) -> Self {
        Self {
            error: ERROR_VALIDATION.to_string(),
            message: "request validation failed".to_string(),
            detail,
        }
    }

    /// A problem for an input that could not be decoded at all.
    pub fn malformed(location: &str, message: impl Into<String>) -> Self {
        Self::new(vec![FieldError::new(location, message)])
    }
}

impl From<ValidationErrors> for ValidationProblem {
    fn from(errors: ValidationErrors) -> Self {
        Self::new(errors.0)
    }
}

impl IntoResponse for ValidationProblem {
    fn into_response(self) -> Response {
        (StatusCode::UNPROCESSABLE_ENTITY, Json(self)).into_response()
    }
}

/// Everything a handler can fail with.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Invalid(#[from] ValidationErrors),

    #[error(transparent)]
    Unhandled(#[from] LibError),
}

/// Convenience type alias for handler return values.
pub type HandlerResult<T> = Result<T, HandlerError>;

impl HandlerError {
    /// Translate a store lookup failure: a missing document becomes a
    /// `NOT_FOUND` [`ApiError`], anything else stays unhandled.
    pub fn from_lookup(err: LibError, id: &str) -> Self {
        if err.is_not_found() {
            HandlerError::Api(ApiError::character_not_found(id))
        } else {
            HandlerError::Unhandled(err)
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        match self {
            HandlerError::Api(err) => err.into_response(),
            HandlerError::Invalid(errors) => ValidationProblem::from(errors).into_response(),
            HandlerError::Unhandled(err) => {
                tracing::error!(error = %err, "unhandled error in handler");
                unhandled_response(err.to_string())
            }
        }
    }
}

/// Plain 500 carrying the [`UnhandledFailure`] marker.
fn unhandled_response(error: String) -> Response {
    let mut response = (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
    response.extensions_mut().insert(UnhandledFailure(error));
    response
}

/// Response for a panicking handler, used with `CatchPanicLayer::custom`.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    tracing::error!(panic = %message, "handler panicked");
    unhandled_response(message)
}

/// Middleware that writes an `api_error` event for every [`ApiError`]
/// response. Install it inside [`RequestLogLayer`](crate::RequestLogLayer)
/// so that the request's correlation id is available.
pub async fn log_api_errors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .cloned()
        .unwrap_or_else(RequestId::generate);

    let response = next.run(request).await;

    if let Some(err) = response.extensions().get::<ApiError>() {
        state.events().error(json!({
            "request_id": request_id.as_str(),
            "event": "api_error",
            "path": path,
            "status_code": err.status.as_u16(),
            "error_code": err.code,
            "message": err.message,
        }));
    }

    response
}
