//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Connection
//! handlers translate it into a rejected connect or a silent no-op; the REST
//! control surface maps each variant to an HTTP status and a structured JSON
//! error body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1002,
///     "message": "malformed envelope: message requires conversation_id",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category              | HTTP Status                 |
/// |-----------|-----------------------|-----------------------------|
/// | 1000–1999 | Validation            | 400 Bad Request             |
/// | 2000–2999 | Lookup / stale state  | 404 Not Found / 409 Conflict|
/// | 3000–3999 | Server / backends     | 500 / 503                   |
/// | 4000–4999 | Connection admission  | 401 Unauthorized            |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Connect-time authentication or identification failed.
    #[error("connection rejected: {0}")]
    RejectedConnection(String),

    /// The operation references a conversation or message the caller is no
    /// longer attached to.
    #[error("stale operation: {0}")]
    StaleOperation(String),

    /// The shared session store could not be reached.
    #[error("registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// Publishing to or subscribing on the message bus failed.
    #[error("bus error: {0}")]
    Bus(String),

    /// An envelope is missing a routing field its channel requires.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// A bus channel name outside the fixed taxonomy.
    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    /// A domain collaborator (database lookup) failed.
    #[error("domain error: {0}")]
    Domain(String),

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A referenced entity or handle does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::MalformedEnvelope(_) => 1002,
            Self::NotFound(_) => 2001,
            Self::UnknownChannel(_) => 2002,
            Self::StaleOperation(_) => 2003,
            Self::Internal(_) => 3000,
            Self::RegistryUnavailable(_) => 3001,
            Self::Bus(_) => 3002,
            Self::Domain(_) => 3003,
            Self::RejectedConnection(_) => 4001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::MalformedEnvelope(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) | Self::UnknownChannel(_) => StatusCode::NOT_FOUND,
            Self::StaleOperation(_) => StatusCode::CONFLICT,
            Self::RegistryUnavailable(_) | Self::Bus(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Domain(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::RejectedConnection(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl From<redis::RedisError> for GatewayError {
    fn from(err: redis::RedisError) -> Self {
        Self::RegistryUnavailable(err.to_string())
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        Self::Domain(err.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_fall_in_documented_ranges() {
        assert_eq!(GatewayError::InvalidRequest(String::new()).error_code(), 1001);
        assert_eq!(
            GatewayError::RegistryUnavailable(String::new()).error_code(),
            3001
        );
        assert_eq!(
            GatewayError::RejectedConnection(String::new()).error_code(),
            4001
        );
    }

    #[test]
    fn malformed_envelope_is_bad_request() {
        let err = GatewayError::MalformedEnvelope("missing organization_id".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("organization_id"));
    }

    #[test]
    fn backend_failures_are_service_unavailable() {
        assert_eq!(
            GatewayError::Bus("closed".to_string()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            GatewayError::RegistryUnavailable("down".to_string()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn into_response_carries_status() {
        let response = GatewayError::UnknownChannel("nope".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
