//! # Fees: Two-Decimal Money in Integer Cents
//!
//! Every fee in the negotiation triple (proposed, offered, final) is a
//! [`Fee`]: a non-negative count of cents with an upper bound matching a
//! `DECIMAL(10,2)` column. Arithmetic never touches floating point once a
//! value is inside the system.
//!
//! Wire input arrives as [`FeeInput`], either a JSON number or a string.
//! Strings are parsed as fixed-point decimals; numbers must be finite.
//! Anything that does not coerce to a non-negative amount is rejected with
//! [`ValidationError::InvalidFee`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// Largest representable fee: 99,999,999.99.
pub const MAX_FEE_CENTS: i64 = 9_999_999_999;

/// A non-negative monetary amount with two-decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Fee(i64);

impl Fee {
    /// The zero fee.
    pub const ZERO: Fee = Fee(0);

    /// Construct from cents. Rejects negative and out-of-range values.
    pub fn from_cents(cents: i64) -> Result<Self, ValidationError> {
        if !(0..=MAX_FEE_CENTS).contains(&cents) {
            return Err(ValidationError::InvalidFee(format_cents(cents)));
        }
        Ok(Self(cents))
    }

    /// Construct from a JSON number. Rounds to the nearest cent.
    pub fn from_f64(value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() || value < 0.0 {
            return Err(ValidationError::InvalidFee(value.to_string()));
        }
        let cents = (value * 100.0).round();
        if cents > MAX_FEE_CENTS as f64 {
            return Err(ValidationError::InvalidFee(value.to_string()));
        }
        Ok(Self(cents as i64))
    }

    /// Parse a decimal string such as `"140"`, `"140.5"` or `"140.005"`.
    ///
    /// More than two fractional digits are rounded half-up to the cent.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidFee(s.to_string());
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(invalid());
        }

        let (int_part, frac_part) = match trimmed.split_once('.') {
            Some((i, f)) => (i, f),
            None => (trimmed, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(int_part) || !all_digits(frac_part) {
            return Err(invalid());
        }

        let units: i64 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid())?
        };

        let frac = frac_part.as_bytes();
        let digit = |i: usize| frac.get(i).map(|b| i64::from(b - b'0')).unwrap_or(0);
        let mut cents_frac = digit(0) * 10 + digit(1);
        if digit(2) >= 5 {
            cents_frac += 1;
        }

        let cents = units
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents_frac))
            .ok_or_else(invalid)?;
        if cents > MAX_FEE_CENTS {
            return Err(invalid());
        }
        Ok(Self(cents))
    }

    /// The amount in cents.
    pub fn cents(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Fee {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_cents(self.0))
    }
}

fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

impl Serialize for Fee {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Fee {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        FeeInput::deserialize(deserializer)?
            .coerce()
            .map_err(serde::de::Error::custom)
    }
}

/// A fee as it arrives on the wire: JSON number or string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FeeInput {
    /// `140`, `140.5`
    Number(f64),
    /// `"140.00"`
    Text(String),
}

impl FeeInput {
    /// Coerce into a [`Fee`].
    pub fn coerce(&self) -> Result<Fee, ValidationError> {
        match self {
            Self::Number(n) => Fee::from_f64(*n),
            Self::Text(s) => Fee::parse(s),
        }
    }

    /// Whether this is an empty string, which create treats as "not given".
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Text(s) if s.trim().is_empty())
    }
}
