//! HTTP error type.
//!
//! Bridges [`EngineError`] to responses. Policy denials carry a
//! machine-readable `reason` so clients can render "you can't do this because X"
//! separately from "something went wrong, retry".

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use eventgate_core::error::{Denial, EngineError};
use serde::Serialize;
use std::fmt;

/// Application error type for handlers.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    code: &'static str,
    reason: Option<Denial>,
    retryable: bool,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code,
            reason: None,
            retryable: false,
            source: None,
        }
    }

    /// Attach an internal source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// 400 Bad Request
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// 401 Unauthorized
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    /// 403 Forbidden with a denial reason
    #[must_use]
    pub fn denied(denial: Denial) -> Self {
        Self {
            reason: Some(denial),
            ..Self::new(StatusCode::FORBIDDEN, "POLICY_DENIED", denial.to_string())
        }
    }

    /// 404 Not Found
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{resource} with id {id} not found"),
        )
    }

    /// 409 Conflict; the client may retry
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            retryable: true,
            ..Self::new(StatusCode::CONFLICT, "CONFLICT", message)
        }
    }

    /// 422 Unprocessable Entity
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
    }

    /// 503 Service Unavailable; the client may retry
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            retryable: true,
            ..Self::new(StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", message)
        }
    }

    /// 500 Internal Server Error
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR", message)
    }

    /// Response status
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<Denial>,
    retryable: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    error = %source,
                    "Request failed"
                ),
                None => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    "Request failed"
                ),
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
            reason: self.reason,
            retryable: self.retryable,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<EngineError> for AppError {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::PolicyDenied(denial) => Self::denied(denial),
            EngineError::Validation(message) => Self::validation(message),
            EngineError::NotFound { entity, id } => Self::not_found(entity, id),
            EngineError::Conflict(message) => Self::conflict(message),
            EngineError::Transport(message) => {
                Self::unavailable("The record store is unavailable, retry later")
                    .with_source(anyhow::anyhow!(message))
            }
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::bad_request("Invalid input");
        assert_eq!(err.to_string(), "[BAD_REQUEST] Invalid input");
    }

    #[test]
    fn test_engine_error_mapping() {
        let cases = [
            (EngineError::PolicyDenied(Denial::CapacityFull), StatusCode::FORBIDDEN),
            (EngineError::Validation("bad".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (EngineError::not_found("event", "42"), StatusCode::NOT_FOUND),
            (EngineError::Conflict("lost".into()), StatusCode::CONFLICT),
            (EngineError::Transport("down".into()), StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (error, status) in cases {
            assert_eq!(AppError::from(error).status(), status);
        }
    }

    #[test]
    fn test_denial_carries_reason() {
        let err = AppError::from(EngineError::PolicyDenied(Denial::DeadlinePassed));
        assert_eq!(err.reason, Some(Denial::DeadlinePassed));
        assert!(!err.retryable);
        assert_eq!(err.message, "the registration deadline has passed");
    }

    #[test]
    fn test_transport_hides_details() {
        let err = AppError::from(EngineError::Transport("password=hunter2".into()));
        assert!(err.retryable);
        assert!(!err.message.contains("hunter2"));
        assert!(err.source.is_some());
    }
}
