//! Error types for landmark.

use serde::Serialize;
use thiserror::Error;

/// Result type alias using landmark's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`], used by callers to decide how a
/// failure is surfaced (HTTP status, bulk summary outcome).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Rejected before any external call.
    InvalidInput,
    /// A record addressed by identifier does not exist.
    NotFound,
    /// The store or the matcher failed, or did not answer in time.
    DelegatedServiceFailure,
    /// Bug or misconfiguration inside this process.
    Internal,
}

/// Core error type for landmark operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Image not found
    #[error("Image not found: {0}")]
    ImageNotFound(uuid::Uuid),

    /// Feature matcher returned an error or an unusable response
    #[error("Matcher error: {0}")]
    Matcher(String),

    /// An external call exceeded its time bound
    #[error("Timeout: {operation} did not complete within {after_ms}ms")]
    Timeout {
        operation: &'static str,
        after_ms: u64,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::NotFound(_) | Error::ImageNotFound(_) => ErrorKind::NotFound,
            Error::Database(_) | Error::Matcher(_) | Error::Timeout { .. } | Error::Request(_) => {
                ErrorKind::DelegatedServiceFailure
            }
            Error::Serialization(_) | Error::Config(_) | Error::Internal(_) | Error::Io(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// True if the failure came from the store or the matcher.
    pub fn is_delegated(&self) -> bool {
        self.kind() == ErrorKind::DelegatedServiceFailure
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("test resource".to_string());
        assert_eq!(err.to_string(), "Not found: test resource");
    }

    #[test]
    fn test_error_display_image_not_found() {
        let id = Uuid::nil();
        let err = Error::ImageNotFound(id);
        assert_eq!(err.to_string(), format!("Image not found: {}", id));
    }

    #[test]
    fn test_error_display_matcher() {
        let err = Error::Matcher("returned 500".to_string());
        assert_eq!(err.to_string(), "Matcher error: returned 500");
    }

    #[test]
    fn test_error_display_timeout() {
        let err = Error::Timeout {
            operation: "matcher.query",
            after_ms: 1500,
        };
        assert_eq!(
            err.to_string(),
            "Timeout: matcher.query did not complete within 1500ms"
        );
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("latitude out of range".to_string());
        assert_eq!(err.to_string(), "Invalid input: latitude out of range");
    }

    #[test]
    fn test_kind_invalid_input() {
        assert_eq!(
            Error::InvalidInput("x".into()).kind(),
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn test_kind_not_found() {
        assert_eq!(Error::NotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            Error::ImageNotFound(Uuid::nil()).kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_timeout_is_reported_like_service_failure() {
        let timeout = Error::Timeout {
            operation: "store.find_by_geo_radius",
            after_ms: 10,
        };
        let matcher = Error::Matcher("boom".into());
        assert_eq!(timeout.kind(), matcher.kind());
        assert!(timeout.is_delegated());
    }

    #[test]
    fn test_kind_delegated_variants() {
        assert!(Error::Matcher("x".into()).is_delegated());
        assert!(Error::Request("x".into()).is_delegated());
        assert!(Error::Database(sqlx::Error::PoolTimedOut).is_delegated());
    }

    #[test]
    fn test_kind_internal_variants() {
        assert_eq!(Error::Config("x".into()).kind(), ErrorKind::Internal);
        assert_eq!(Error::Internal("x".into()).kind(), ErrorKind::Internal);
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert_eq!(Error::Io(io_err).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number");
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        match err {
            Error::Serialization(msg) => {
                assert!(!msg.is_empty());
            }
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::DelegatedServiceFailure).unwrap();
        assert_eq!(json, "\"delegated_service_failure\"");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        match err {
            Error::Io(_) => {} // Success
            _ => panic!("Expected Io error"),
        }
    }
}
