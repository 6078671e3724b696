use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use identity_cache::error::CacheError;
use thiserror::Error;

/// Body of every internal-error response the gate emits.
pub const INTERNAL_ERROR_BODY: &str = "Internal server error.";

/// Faults raised while gating a request.
///
/// None of these is a policy outcome; every variant surfaces as a 500 and is
/// never folded into a denial.
#[derive(Error, Debug)]
pub enum GateError {
    #[error("Identity cache failure: {0}")]
    Cache(#[from] CacheError),

    #[error("Invalid redirect location: {0}")]
    InvalidRedirect(String),
}

impl GateError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    /// Get error code for the error type
    pub fn error_code(&self) -> &str {
        match self {
            GateError::Cache(CacheError::NoBackend) => "CACHE_NOT_CONFIGURED",
            GateError::Cache(CacheError::Timeout(_)) => "CACHE_TIMEOUT",
            GateError::Cache(CacheError::MalformedEntry { .. }) => "CACHE_MALFORMED_ENTRY",
            GateError::Cache(_) => "CACHE_ERROR",
            GateError::InvalidRedirect(_) => "INVALID_REDIRECT",
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            [(header::CONTENT_TYPE, "text/plain")],
            INTERNAL_ERROR_BODY,
        )
            .into_response()
    }
}

/// Result type for gate operations
pub type GateResult<T> = Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            GateError::from(CacheError::NoBackend).error_code(),
            "CACHE_NOT_CONFIGURED"
        );
        assert_eq!(
            GateError::from(CacheError::Timeout(Duration::from_millis(5))).error_code(),
            "CACHE_TIMEOUT"
        );
        assert_eq!(
            GateError::from(CacheError::Backend("down".into())).error_code(),
            "CACHE_ERROR"
        );
        assert_eq!(
            GateError::InvalidRedirect("\n".into()).error_code(),
            "INVALID_REDIRECT"
        );
    }

    #[test]
    fn test_into_response_is_plain_500() {
        let response = GateError::from(CacheError::NoBackend).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain"
        );
    }
}
