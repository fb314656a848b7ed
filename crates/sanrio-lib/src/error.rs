use thiserror::Error;

use crate::character::ValidationErrors;

/// Convenient result alias for the Sanrio library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested document does not exist in the index.
    #[error("document {id} not found in index {index}")]
    DocumentNotFound { index: String, id: String },

    /// The id cannot be used as a URL path segment.
    #[error("invalid document id '{id}'")]
    InvalidDocumentId { id: String },

    #[error("invalid index name '{index}'")]
    InvalidIndexName { index: String },

    /// The store could not be reached during startup after every attempt.
    #[error("Elasticsearch not reachable at {host} after {attempts} retries")]
    StoreUnreachable { host: String, attempts: u32 },

    /// The store answered with a non-success status.
    #[error("store responded with status {status}: {body}")]
    StoreResponse { status: u16, body: String },

    /// The store answered with a body that does not have the expected shape.
    #[error("malformed store response: {message}")]
    MalformedResponse { message: String },

    /// Raised when a payload violates the character schema.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// Wrapper for HTTP client errors.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Wrapper for JSON encoding errors.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True when the error means the addressed document is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::DocumentNotFound { .. })
    }
}
