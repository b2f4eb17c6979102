//! # Error Taxonomy
//!
//! [`ErrorKind`] is the classification every failure in the booking backend
//! reports. Transport layers map it to status codes; the core never does.
//!
//! [`ValidationError`] covers malformed input caught while constructing
//! domain primitives. It always classifies as [`ErrorKind::InvalidInput`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Malformed or missing field, non-numeric or negative fee.
    InvalidInput,
    /// Appointment or lawyer does not exist.
    NotFound,
    /// Actor is not a party to the appointment and not an admin,
    /// or the actor's role may not perform the operation.
    Forbidden,
    /// Operation is not legal from the current status.
    InvalidState,
    /// Slot already occupied by another active appointment.
    Conflict,
    /// Storage or infrastructure fault. The only retryable kind.
    InternalFailure,
}

impl ErrorKind {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::NotFound => "NOT_FOUND",
            Self::Forbidden => "FORBIDDEN",
            Self::InvalidState => "INVALID_STATE",
            Self::Conflict => "CONFLICT",
            Self::InternalFailure => "INTERNAL_FAILURE",
        }
    }

    /// Whether a caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::InternalFailure)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Validation errors raised while constructing domain primitives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was absent or blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Fee is not a non-negative finite number.
    #[error("invalid fee \"{0}\": expected a non-negative amount with at most two decimals")]
    InvalidFee(String),

    /// Date is not `YYYY-MM-DD`.
    #[error("invalid appointment date \"{0}\" (expected YYYY-MM-DD)")]
    InvalidDate(String),

    /// Time is not `HH:MM` or `HH:MM:SS`.
    #[error("invalid appointment time \"{0}\" (expected HH:MM or HH:MM:SS)")]
    InvalidTime(String),

    /// Role string is not one of `client`, `lawyer`, `admin`.
    #[error("unknown role \"{0}\"")]
    UnknownRole(String),

    /// Status code is not one of the six appointment statuses.
    #[error("unknown appointment status \"{0}\"")]
    UnknownStatus(String),

    /// Notification kind code is not a known kind.
    #[error("unknown notification kind \"{0}\"")]
    UnknownNotificationKind(String),

    /// Identifier is not a UUID.
    #[error("invalid identifier \"{0}\"")]
    InvalidId(String),

    /// Chat message text is empty after trimming.
    #[error("Message is required")]
    EmptyMessage,
}

impl ValidationError {
    /// Always [`ErrorKind::InvalidInput`].
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidInput
    }
}
