//! # Transition Effects
//!
//! Every transition returns the side effects it wants performed instead of
//! performing them. The orchestration layer commits [`Effect::Message`]
//! entries in the same unit of work as the appointment write, and dispatches
//! [`Effect::Notify`] requests only after that commit succeeds.

use serde::{Deserialize, Serialize};

use hirelawyer_core::{AppointmentId, Role, UserId, ValidationError};

/// A side effect produced by a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    /// Append an entry to the appointment's message log.
    Message(NewMessage),
    /// Ask the notifier to record a notification for the counterparty.
    Notify(NotificationRequest),
}

/// An audit entry to be appended to an appointment's message log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub appointment_id: AppointmentId,
    pub sender_id: UserId,
    pub sender_role: Role,
    pub text: String,
}

/// Kind of notification, stored by the notifier as a stable code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    AppointmentRequest,
    FeeOffer,
    CounterOffer,
    #[serde(rename = "APPT_ACCEPTED")]
    AppointmentAccepted,
    OfferAccepted,
    #[serde(rename = "APPT_REJECTED")]
    AppointmentRejected,
    #[serde(rename = "APPT_COMPLETED")]
    AppointmentCompleted,
    #[serde(rename = "APPT_CANCELLED")]
    AppointmentCancelled,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppointmentRequest => "APPOINTMENT_REQUEST",
            Self::FeeOffer => "FEE_OFFER",
            Self::CounterOffer => "COUNTER_OFFER",
            Self::AppointmentAccepted => "APPT_ACCEPTED",
            Self::OfferAccepted => "OFFER_ACCEPTED",
            Self::AppointmentRejected => "APPT_REJECTED",
            Self::AppointmentCompleted => "APPT_COMPLETED",
            Self::AppointmentCancelled => "APPT_CANCELLED",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APPOINTMENT_REQUEST" => Ok(Self::AppointmentRequest),
            "FEE_OFFER" => Ok(Self::FeeOffer),
            "COUNTER_OFFER" => Ok(Self::CounterOffer),
            "APPT_ACCEPTED" => Ok(Self::AppointmentAccepted),
            "OFFER_ACCEPTED" => Ok(Self::OfferAccepted),
            "APPT_REJECTED" => Ok(Self::AppointmentRejected),
            "APPT_COMPLETED" => Ok(Self::AppointmentCompleted),
            "APPT_CANCELLED" => Ok(Self::AppointmentCancelled),
            other => Err(ValidationError::UnknownNotificationKind(other.to_string())),
        }
    }
}

/// A request to the notifier. Fire-and-forget from the core's side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub recipient: UserId,
    pub appointment_id: Option<AppointmentId>,
    pub kind: NotificationKind,
    pub title: String,
    pub body: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_codes_round_trip() {
        let all = [
            NotificationKind::AppointmentRequest,
            NotificationKind::FeeOffer,
            NotificationKind::CounterOffer,
            NotificationKind::AppointmentAccepted,
            NotificationKind::OfferAccepted,
            NotificationKind::AppointmentRejected,
            NotificationKind::AppointmentCompleted,
            NotificationKind::AppointmentCancelled,
        ];
        for kind in all {
            assert_eq!(kind.as_str().parse::<NotificationKind>().unwrap(), kind);
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn unknown_kind_code_is_a_validation_error() {
        let err = "PING".parse::<NotificationKind>().unwrap_err();
        assert_eq!(err, ValidationError::UnknownNotificationKind("PING".into()));
        assert_eq!(err.to_string(), "unknown notification kind \"PING\"");
    }
}
