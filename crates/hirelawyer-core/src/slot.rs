//! # Appointment Slots
//!
//! A [`Slot`] is the `(date, time)` pair an appointment occupies on a
//! lawyer's calendar. Two slots conflict only when both components are
//! equal; durations and overlaps are not modelled.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The date and start time of an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl Slot {
    pub fn new(date: NaiveDate, time: NaiveTime) -> Self {
        Self { date, time }
    }

    /// Parse a slot from its wire form.
    ///
    /// The date must be `YYYY-MM-DD`. The time may be `HH:MM` or `HH:MM:SS`;
    /// both spellings of the same instant produce equal slots.
    pub fn parse(date: &str, time: &str) -> Result<Self, ValidationError> {
        let date_str = date.trim();
        let time_str = time.trim();
        if date_str.is_empty() {
            return Err(ValidationError::MissingField("appointment_date"));
        }
        if time_str.is_empty() {
            return Err(ValidationError::MissingField("appointment_time"));
        }

        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .map_err(|_| ValidationError::InvalidDate(date_str.to_string()))?;
        let time = NaiveTime::parse_from_str(time_str, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(time_str, "%H:%M"))
            .map_err(|_| ValidationError::InvalidTime(time_str.to_string()))?;

        Ok(Self { date, time })
    }

    /// `YYYY-MM-DD`
    pub fn date_string(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// `HH:MM`
    pub fn time_string(&self) -> String {
        self.time.format("%H:%M").to_string()
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.date_string(), self.time_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_both_time_spellings() {
        let a = Slot::parse("2026-02-10", "10:00").unwrap();
        let b = Slot::parse("2026-02-10", "10:00:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "2026-02-10 10:00");
    }

    #[test]
    fn different_time_is_different_slot() {
        let a = Slot::parse("2026-02-10", "10:00").unwrap();
        let b = Slot::parse("2026-02-10", "10:30").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn missing_components() {
        assert_eq!(
            Slot::parse("", "10:00").unwrap_err(),
            ValidationError::MissingField("appointment_date")
        );
        assert_eq!(
            Slot::parse("2026-02-10", " ").unwrap_err(),
            ValidationError::MissingField("appointment_time")
        );
    }

    #[test]
    fn malformed_components() {
        assert!(matches!(
            Slot::parse("10/02/2026", "10:00"),
            Err(ValidationError::InvalidDate(_))
        ));
        assert!(matches!(
            Slot::parse("2026-02-30", "10:00"),
            Err(ValidationError::InvalidDate(_))
        ));
        assert!(matches!(
            Slot::parse("2026-02-10", "25:00"),
            Err(ValidationError::InvalidTime(_))
        ));
    }
}
