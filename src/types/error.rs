//! Error types for the deed service

use hyper::StatusCode;

/// Main error type for deed service operations
#[derive(Debug, thiserror::Error)]
pub enum DeedError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("NATS error: {0}")]
    Nats(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),
}

impl DeedError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidSignature(_) => StatusCode::BAD_REQUEST,
            Self::Nats(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
        }
    }

    /// Convert to status code and body tuple for HTTP response
    pub fn into_status_code_and_body(self) -> (StatusCode, String) {
        let status = self.status_code();
        let body = self.to_string();
        (status, body)
    }
}

// Implement From conversions for common error types

impl From<std::io::Error> for DeedError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for DeedError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for DeedError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for DeedError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<bson::oid::Error> for DeedError {
    fn from(err: bson::oid::Error) -> Self {
        Self::BadRequest(format!("Invalid object id: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for DeedError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Unauthorized(format!("JWT error: {}", err))
    }
}

/// Result type alias for deed service operations
pub type Result<T> = std::result::Result<T, DeedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            DeedError::NotFound("deed".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            DeedError::Forbidden("not an owner".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            DeedError::Unauthorized("signer mismatch".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            DeedError::BadRequest("invalid mode".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DeedError::InvalidSignature("bad hex".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DeedError::Database("down".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
