//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Booking failures are mapped by their [`ErrorKind`]; the JSON body always
//! has the shape `{"error": {"code", "message"}}`. Internal failures are
//! logged and replaced by a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use hirelawyer_core::{ErrorKind, ValidationError};

use crate::booking::BookingError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable reason.
    pub message: String,
}

impl ErrorBody {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.to_string(),
                message: message.into(),
            },
        }
    }
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("{0}")]
    NotFound(String),

    /// Request field failed validation (422).
    #[error("{0}")]
    Validation(String),

    /// Request body could not be parsed (422).
    #[error("{0}")]
    BadRequest(String),

    /// Missing or invalid credentials (401).
    #[error("{0}")]
    Unauthorized(String),

    /// Caller may not perform this operation (403).
    #[error("{0}")]
    Forbidden(String),

    /// Operation not legal from the current status (409).
    #[error("{0}")]
    InvalidState(String),

    /// Slot already held by another active appointment (409).
    #[error("{0}")]
    Conflict(String),

    /// Internal server error (500). Message is logged but not returned.
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::InvalidState(_) => (StatusCode::CONFLICT, "INVALID_STATE"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "internal server error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorBody::new(code, message))).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::InvalidInput => Self::Validation(message),
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::Forbidden => Self::Forbidden(message),
            ErrorKind::InvalidState => Self::InvalidState(message),
            ErrorKind::Conflict => Self::Conflict(message),
            ErrorKind::InternalFailure => Self::Internal(message),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hirelawyer_core::{AppointmentId, Slot};
    use hirelawyer_state::AppointmentError;
    use http_body_util::BodyExt;

    use crate::repository::StoreError;

    #[test]
    fn status_codes() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (
                AppError::Validation("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
            ),
            (AppError::BadRequest("x".into()), StatusCode::UNPROCESSABLE_ENTITY, "BAD_REQUEST"),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (AppError::Forbidden("x".into()), StatusCode::FORBIDDEN, "FORBIDDEN"),
            (AppError::InvalidState("x".into()), StatusCode::CONFLICT, "INVALID_STATE"),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT, "CONFLICT"),
            (AppError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status_and_code(), (status, code));
        }
    }

    #[test]
    fn booking_errors_map_by_kind() {
        let err = AppError::from(BookingError::from(AppointmentError::NoOfferToAccept));
        assert!(matches!(err, AppError::InvalidState(ref m) if m == "No lawyer offer to accept"));

        let err = AppError::from(BookingError::AppointmentNotFound(AppointmentId::new()));
        assert!(matches!(err, AppError::NotFound(_)));

        let slot = Slot::parse("2026-02-10", "10:00").unwrap();
        let err = AppError::from(BookingError::from(StoreError::SlotTaken { slot }));
        assert!(matches!(err, AppError::Conflict(_)));

        let err = AppError::from(BookingError::from(ValidationError::MissingField("subject")));
        assert!(matches!(err, AppError::Validation(ref m) if m == "subject is required"));
    }

    #[tokio::test]
    async fn internal_message_is_hidden() {
        let response = AppError::Internal("connection refused".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error.code, "INTERNAL_ERROR");
        assert!(!body.error.message.contains("connection refused"));
    }
}
