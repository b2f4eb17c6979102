//! # Identifier Newtypes
//!
//! UUID-backed identifiers, valid by construction. Each is a distinct type,
//! so an [`AppointmentId`] cannot be passed where a [`UserId`] is expected.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|_| ValidationError::InvalidId(s.to_string()))
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_id!(
    /// A user of the marketplace. Clients, lawyers and admins share this
    /// namespace; the role travels separately.
    UserId
);

uuid_id!(
    /// An appointment. Immutable once assigned at creation.
    AppointmentId
);

uuid_id!(
    /// One entry in an appointment's message log.
    MessageId
);

uuid_id!(
    /// A notification held by the notifier.
    NotificationId
);

impl UserId {
    /// The identity used for administrative acts when authentication is
    /// disabled (development mode).
    pub fn system() -> Self {
        Self(Uuid::nil())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(AppointmentId::new(), AppointmentId::new());
    }

    #[test]
    fn parse_round_trip() {
        let id = UserId::new();
        let parsed: UserId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = "42".parse::<AppointmentId>().unwrap_err();
        assert_eq!(err, ValidationError::InvalidId("42".to_string()));
    }

    #[test]
    fn serializes_as_bare_uuid() {
        let uuid = Uuid::new_v4();
        let json = serde_json::to_string(&MessageId::from_uuid(uuid)).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));
    }

    #[test]
    fn system_user_is_nil() {
        assert!(UserId::system().as_uuid().is_nil());
    }
}
