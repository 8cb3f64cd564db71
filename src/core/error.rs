//! Error types and error handling for the siterag service.
//!
//! The taxonomy separates transient network failures (retried, then
//! skipped in isolation), configuration errors (fail fast before any
//! work), content errors (logged and skipped), and the distinct
//! "no index built yet" condition that must never be confused with
//! an empty result set.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for siterag operations
pub type Result<T> = std::result::Result<T, SiteragError>;

/// Main error type for the siterag service
#[derive(Error, Debug)]
pub enum SiteragError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Vector storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Content error: {0}")]
    Content(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("No index has been built for this corpus yet")]
    IndexNotBuilt,

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl SiteragError {
    /// Whether the affected unit (page, batch, query) may be retried.
    ///
    /// Only transient network failures qualify; everything else is
    /// either permanent or a caller bug.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SiteragError::Fetch(_)
                | SiteragError::EmbeddingUnavailable(_)
                | SiteragError::StorageUnavailable(_)
        )
    }

    /// Convert error to appropriate HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            SiteragError::Config(_) | SiteragError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            SiteragError::IndexNotBuilt => StatusCode::SERVICE_UNAVAILABLE,
            SiteragError::EmbeddingUnavailable(_) | SiteragError::StorageUnavailable(_) => {
                StatusCode::BAD_GATEWAY
            }
            SiteragError::Fetch(_)
            | SiteragError::Content(_)
            | SiteragError::Snapshot(_)
            | SiteragError::Io(_)
            | SiteragError::Serde(_)
            | SiteragError::Toml(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get user-friendly error message
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Implement IntoResponse for automatic error conversion in Axum
impl IntoResponse for SiteragError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.message();

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(SiteragError::Fetch("timeout".to_string()).is_transient());
        assert!(SiteragError::EmbeddingUnavailable("503".to_string()).is_transient());
        assert!(SiteragError::StorageUnavailable("connect".to_string()).is_transient());
    }

    #[test]
    fn test_permanent_classification() {
        assert!(!SiteragError::Config("bad overlap".to_string()).is_transient());
        assert!(!SiteragError::IndexNotBuilt.is_transient());
        assert!(!SiteragError::InvalidQuery("empty".to_string()).is_transient());
    }

    #[test]
    fn test_error_message() {
        let err = SiteragError::Config("overlap must be less than chunk size".to_string());
        assert!(err.to_string().contains("overlap"));
        assert!(err.to_string().contains("Configuration"));
    }

    #[test]
    fn test_index_not_built_is_distinct() {
        // The "query before build" case must not look like an empty result
        let err = SiteragError::IndexNotBuilt;
        assert!(err.to_string().contains("No index"));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_invalid_query_status() {
        let err = SiteragError::InvalidQuery("empty".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_backend_unavailable_status() {
        let err = SiteragError::EmbeddingUnavailable("503".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        let err = SiteragError::StorageUnavailable("connect".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }
}
