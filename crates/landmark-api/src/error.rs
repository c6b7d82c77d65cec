//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::error;

use landmark_core::ErrorKind;

/// Handler error, rendered as `{"error": "..."}`.
///
/// Store and matcher failures reach the client as a generic 502; details
/// only go to the log.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    BadGateway(String),
    Internal(String),
}

pub const UPSTREAM_FAILURE_MESSAGE: &str = "Upstream service failed; please retry later";

impl From<landmark_core::Error> for ApiError {
    fn from(err: landmark_core::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidInput => ApiError::BadRequest(err.to_string()),
            ErrorKind::NotFound => ApiError::NotFound(err.to_string()),
            ErrorKind::DelegatedServiceFailure => {
                error!(error = %err, "Delegated service failure");
                ApiError::BadGateway(UPSTREAM_FAILURE_MESSAGE.to_string())
            }
            ErrorKind::Internal => {
                error!(error = %err, "Internal error");
                ApiError::Internal("Internal server error".to_string())
            }
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::BadGateway(msg)
            | ApiError::Internal(msg) => msg,
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
