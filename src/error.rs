//! Error types for the document Q&A service

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// All errors produced by the service
///
/// Upstream provider failures are split three ways because the ingestion
/// pipeline treats them differently: rate limits abort a document, transient
/// errors skip a single chunk, and unavailable providers fail fast.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or invalid identity
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller-fixable request problem (missing field, bad value)
    #[error("validation error: {0}")]
    Validation(String),

    /// Referenced entity absent or not owned by the caller
    #[error("not found: {0}")]
    NotFound(String),

    /// Declared MIME type is not one we can extract text from
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),

    /// File bytes could not be parsed into text
    #[error("extraction failed for {kind}: {cause}")]
    ExtractionFailed { kind: String, cause: String },

    /// Provider unreachable or misconfigured (bad credentials, refused
    /// connection) - operator-fixable, not retried
    #[error("upstream provider unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Provider quota or rate limit exhausted
    #[error("upstream rate limited: {0}")]
    UpstreamRateLimited(String),

    /// Transient provider error
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Terminal ingestion failure, persisted on the document row
    #[error("processing failed: {0}")]
    Processing(String),

    /// Persistence layer failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration problem
    #[error("config error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Helper for extraction failures carrying the underlying cause
    pub fn extraction(kind: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::ExtractionFailed {
            kind: kind.into(),
            cause: cause.to_string(),
        }
    }

    /// Whether this error means further embedding calls are guaranteed-futile
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::UpstreamRateLimited(_))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Validation(_) | Self::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::UpstreamRateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::UpstreamUnavailable(_) | Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::ExtractionFailed { .. }
            | Self::Processing(_)
            | Self::Storage(_)
            | Self::Config(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Internal(e.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_distinguishable() {
        assert!(Error::UpstreamRateLimited("quota".into()).is_rate_limit());
        assert!(!Error::Upstream("timeout".into()).is_rate_limit());
        assert!(!Error::UpstreamUnavailable("no key".into()).is_rate_limit());
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            Error::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            Error::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::UpstreamRateLimited("x".into()).status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }
}
