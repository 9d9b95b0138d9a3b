/// Unified error types for Tubely
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the upload service
#[derive(Error, Debug)]
pub enum TubelyError {
    /// Bad path id, bad multipart body, unparsable content type
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Missing or invalid credential
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Caller is authenticated but does not own the record
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Declared media type is not on the allow-list
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Supported media type, but not valid for the asset being uploaded
    #[error("Wrong content for {purpose}: {media_type}")]
    WrongContentForPurpose { purpose: String, media_type: String },

    /// Upload exceeded the configured ceiling
    #[error("Payload too large (max: {max_bytes} bytes)")]
    PayloadTooLarge { max_bytes: u64 },

    /// Temporary stage file could not be created or written
    #[error("Staging failed: {0}")]
    StagingFailed(String),

    /// Storage backend did not complete the write
    #[error("Storage write failed: {0}")]
    StorageWriteFailed(String),

    /// Asset bytes are stored, but the owning record was not updated
    #[error("Persistence failed for stored asset {key}: {reason}")]
    PersistenceFailed { key: String, reason: String },

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl TubelyError {
    /// Status code and stable error code for this error
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            TubelyError::MalformedRequest(_) => (StatusCode::BAD_REQUEST, "MalformedRequest"),
            TubelyError::Authentication(_) => (StatusCode::UNAUTHORIZED, "AuthenticationRequired"),
            TubelyError::Forbidden(_) => (StatusCode::FORBIDDEN, "Forbidden"),
            TubelyError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            TubelyError::UnsupportedMediaType(_) => {
                (StatusCode::BAD_REQUEST, "UnsupportedMediaType")
            }
            TubelyError::WrongContentForPurpose { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "WrongContentForPurpose")
            }
            TubelyError::PayloadTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PayloadTooLarge")
            }
            TubelyError::StagingFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "StagingFailed"),
            TubelyError::StorageWriteFailed(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "StorageWriteFailed")
            }
            TubelyError::PersistenceFailed { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "PersistenceFailed")
            }
            TubelyError::Database(_)
            | TubelyError::Io(_)
            | TubelyError::Config(_)
            | TubelyError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalServerError")
            }
        }
    }

    /// Message that is safe to show to the caller
    fn public_message(&self) -> String {
        match self {
            TubelyError::StagingFailed(_) => "Could not stage upload".to_string(),
            TubelyError::StorageWriteFailed(_) => "Could not store asset".to_string(),
            TubelyError::PersistenceFailed { .. } => {
                "Asset stored but the video could not be updated".to_string()
            }
            TubelyError::Database(_)
            | TubelyError::Io(_)
            | TubelyError::Config(_)
            | TubelyError::Internal(_) => "Internal server error".to_string(), // Don't leak details
            _ => self.to_string(),
        }
    }
}

/// Convert TubelyError to HTTP response
impl IntoResponse for TubelyError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, code = error_code, "Request failed");
        } else {
            tracing::debug!(error = %self, code = error_code, "Request rejected");
        }

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message: self.public_message(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for Tubely operations
pub type TubelyResult<T> = Result<T, TubelyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            TubelyError::UnsupportedMediaType("application/pdf".into()).status().0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            TubelyError::PayloadTooLarge { max_bytes: 10 }.status().0,
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            TubelyError::WrongContentForPurpose {
                purpose: "video".into(),
                media_type: "image/png".into(),
            }
            .status()
            .0,
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            TubelyError::Forbidden("not yours".into()).status().0,
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_internal_details_not_leaked() {
        let err = TubelyError::StorageWriteFailed("bucket secret-bucket denied".into());
        assert!(!err.public_message().contains("secret-bucket"));

        let err = TubelyError::Internal("db at /var/lib/tubely".into());
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn test_persistence_failure_is_distinct() {
        let err = TubelyError::PersistenceFailed {
            key: "abc.png".into(),
            reason: "row missing".into(),
        };
        assert_eq!(err.status().1, "PersistenceFailed");
    }
}
