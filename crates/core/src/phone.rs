//! Destination phone number value object.
//!
//! A destination is either an E.164 international number (`+`-prefixed or
//! not, 7–15 digits, no leading zero) or a short internal extension
//! (3–6 digits). Equivalent to the pattern `^(\+?[1-9]\d{6,14}|\d{3,6})$`.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Normalized call destination, validated at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parse and validate a destination number.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let raw = raw.trim();
        if is_e164(raw) || is_extension(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(DomainError::validation(format!(
                "invalid phone number: {raw:?} (expected E.164 or a 3-6 digit extension)"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the destination is a short internal extension.
    pub fn is_extension(&self) -> bool {
        is_extension(&self.0)
    }
}

impl core::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl core::str::FromStr for PhoneNumber {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn is_e164(s: &str) -> bool {
    let digits = s.strip_prefix('+').unwrap_or(s);
    (7..=15).contains(&digits.len())
        && digits.chars().all(|c| c.is_ascii_digit())
        && !digits.starts_with('0')
}

fn is_extension(s: &str) -> bool {
    (3..=6).contains(&s.len()) && s.chars().all(|c| c.is_ascii_digit())
}
