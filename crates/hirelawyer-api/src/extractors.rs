//! # Custom Extractors & Validation
//!
//! Request DTOs implement [`Validate`] to turn their loosely typed wire form
//! into a typed command. Handlers use [`extract_validated_json`] so that
//! malformed JSON and invalid fields produce structured errors.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use hirelawyer_core::{AppointmentId, FeeInput, Fee, NotificationId, ValidationError};

use crate::error::AppError;

/// Request types that parse into a validated command.
pub trait Validate {
    type Valid;

    fn validate(self) -> Result<Self::Valid, ValidationError>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T::Valid, AppError> {
    let value = extract_json(result)?;
    Ok(value.validate()?)
}

/// Parse an appointment id from a path segment.
pub fn appointment_id(raw: &str) -> Result<AppointmentId, AppError> {
    Ok(raw.parse()?)
}

/// Parse a notification id from a path segment.
pub fn notification_id(raw: &str) -> Result<NotificationId, AppError> {
    Ok(raw.parse()?)
}

/// A fee field that must be present.
pub fn required_fee(value: Option<FeeInput>, field: &'static str) -> Result<Fee, ValidationError> {
    match value {
        Some(input) if !input.is_blank() => input.coerce(),
        _ => Err(ValidationError::MissingField(field)),
    }
}

/// A fee field where absent or blank means "not given".
pub fn optional_fee(value: Option<FeeInput>) -> Result<Option<Fee>, ValidationError> {
    match value {
        Some(input) if !input.is_blank() => input.coerce().map(Some),
        _ => Ok(None),
    }
}

/// A string field that must be present and non-blank.
pub fn required_text(
    value: Option<String>,
    field: &'static str,
) -> Result<String, ValidationError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::MissingField(field))
}
