//! # Domain Identity Newtypes
//!
//! Fixed-width numeric identifiers used by R9 documents. These prevent
//! accidental identifier confusion: an `ObjectId` (16 digits, one building
//! component) cannot be passed where a `ModelId` (12 digits, one model) is
//! expected.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DigitError;

/// Check that `s` consists solely of ASCII decimal digits and has exactly
/// `len` characters.
///
/// The non-digit check runs first, so `"12a"` reports a non-digit rather
/// than a length mismatch.
pub fn check_fixed_digits(s: &str, len: usize) -> Result<(), DigitError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DigitError::NonDigit {
            literal: s.to_string(),
        });
    }
    if s.len() != len {
        return Err(DigitError::WrongLength {
            expected: len,
            actual: s.len(),
        });
    }
    Ok(())
}

/// 16-digit identifier of one building component (`ID`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ObjectId(String);

/// 12-digit identifier of one building model (`ID_maquette`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ObjectId {
    /// Number of digits in an object identifier.
    pub const DIGITS: usize = 16;

    /// Parse a 16-digit object identifier.
    pub fn parse(s: &str) -> Result<Self, DigitError> {
        check_fixed_digits(s, Self::DIGITS)?;
        Ok(Self(s.to_string()))
    }

    /// The identifier digits.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ModelId {
    /// Number of digits in a model identifier.
    pub const DIGITS: usize = 12;

    /// Parse a 12-digit model identifier.
    pub fn parse(s: &str) -> Result<Self, DigitError> {
        check_fixed_digits(s, Self::DIGITS)?;
        Ok(Self(s.to_string()))
    }

    /// The identifier digits.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for ModelId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
