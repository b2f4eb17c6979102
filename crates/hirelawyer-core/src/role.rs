//! # Roles
//!
//! The three kinds of marketplace user. Guards match on [`Role`]
//! exhaustively, so adding a role forces every guard to decide.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Role of an acting user. Also used as the sender role of log messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Requests appointments and negotiates the fee from the asking side.
    Client,
    /// Owns appointments booked with them; offers fees, accepts, rejects.
    Lawyer,
    /// May act on any appointment.
    Admin,
}

impl Role {
    /// Return the string representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Lawyer => "lawyer",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Self::Client),
            "lawyer" => Ok(Self::Lawyer),
            "admin" => Ok(Self::Admin),
            other => Err(ValidationError::UnknownRole(other.to_string())),
        }
    }
}
