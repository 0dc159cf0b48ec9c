//! # Field Validation
//!
//! Pure checks deciding whether one raw value conforms to a
//! [`FormatKind`] and producing its canonical normalized form. Every check
//! works from the value's string form ([`RawValue::to_text`]), so a numeric
//! identifier exported as an integer is validated exactly like its text.
//!
//! Failures are returned as [`FieldError`] values. A null or absent input
//! is always [`FieldError::Missing`], never a malformed literal.

use r9_core::{check_fixed_digits, CalendarDate, DateError, DigitError};
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::field::{FieldSpec, FormatKind};
use crate::value::{FieldValue, RawValue};

/// Why a present value does not conform to its format.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Fixed-width digit check failed.
    #[error(transparent)]
    Digits(#[from] DigitError),

    /// Nothing alphabetic survived stripping.
    #[error("must contain letters")]
    NoLetters,

    /// The text does not parse as a decimal number.
    #[error("must be a decimal number")]
    NotANumber,

    /// The number parsed but is NaN or infinite.
    #[error("must be a finite number")]
    NonFinite,

    /// Blank text.
    #[error("must not be empty")]
    Blank,

    /// Not a member of the enumeration.
    #[error("must be one of {allowed:?}")]
    NotAllowed {
        /// The declared literals.
        allowed: &'static [&'static str],
    },

    /// Date check failed.
    #[error(transparent)]
    Date(#[from] DateError),
}

/// A single field failed.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldError {
    /// No non-null value was found under any lookup key.
    #[error("missing field '{field}' ({description})")]
    Missing {
        /// Record name of the field.
        field: String,
        /// Field description from the schema.
        description: String,
    },

    /// A value was found but does not conform.
    #[error("malformed field '{field}' = {literal:?}: {reason}")]
    Malformed {
        /// Record name of the field.
        field: String,
        /// The offending value, in string form.
        literal: String,
        /// What was wrong with it.
        #[serde(serialize_with = "as_display")]
        reason: FormatError,
    },
}

impl FieldError {
    /// Record name of the failing field.
    pub fn field(&self) -> &str {
        match self {
            FieldError::Missing { field, .. } | FieldError::Malformed { field, .. } => field,
        }
    }
}

fn as_display<S: Serializer>(value: &FormatError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Validate one raw value against the field's format.
pub fn validate_field(spec: &FieldSpec, raw: Option<&RawValue>) -> Result<FieldValue, FieldError> {
    let Some(raw) = raw else {
        return Err(FieldError::Missing {
            field: spec.name.to_string(),
            description: spec.description.to_string(),
        });
    };
    let literal = raw.to_text();
    check_format(&spec.format, &literal).map_err(|reason| FieldError::Malformed {
        field: spec.name.to_string(),
        literal,
        reason,
    })
}

/// Apply a format check to a string.
pub fn check_format(format: &FormatKind, text: &str) -> Result<FieldValue, FormatError> {
    match format {
        FormatKind::FixedDigits(n) => fixed_digit_string(text, *n).map(FieldValue::Text),
        FormatKind::LettersOnly => letters_only(text).map(FieldValue::Text),
        FormatKind::Decimal => decimal_number(text).map(FieldValue::Number),
        FormatKind::NonEmptyText => nonempty_text(text).map(FieldValue::Text),
        FormatKind::Enumerated(allowed) => enumerated(text, allowed).map(FieldValue::Text),
        FormatKind::Date => date(text).map(FieldValue::Text),
    }
}

/// Exactly `n` ASCII digits; returned unchanged.
pub fn fixed_digit_string(text: &str, n: usize) -> Result<String, FormatError> {
    check_fixed_digits(text, n)?;
    Ok(text.to_string())
}

/// Strip everything that is neither alphabetic nor whitespace, then trim.
pub fn letters_only(text: &str) -> Result<String, FormatError> {
    let kept: String = text
        .chars()
        .filter(|c| c.is_alphabetic() || c.is_whitespace())
        .collect();
    let trimmed = kept.trim();
    if trimmed.is_empty() {
        return Err(FormatError::NoLetters);
    }
    Ok(trimmed.to_string())
}

/// Parse the trimmed text as a finite float.
pub fn decimal_number(text: &str) -> Result<f64, FormatError> {
    let value: f64 = text.trim().parse().map_err(|_| FormatError::NotANumber)?;
    if !value.is_finite() {
        return Err(FormatError::NonFinite);
    }
    Ok(value)
}

/// Any text that is not blank; returned as given.
pub fn nonempty_text(text: &str) -> Result<String, FormatError> {
    if text.trim().is_empty() {
        return Err(FormatError::Blank);
    }
    Ok(text.to_string())
}

/// Case-insensitive membership; returns the literal as declared.
pub fn enumerated(text: &str, allowed: &'static [&'static str]) -> Result<String, FormatError> {
    let wanted = text.trim().to_lowercase();
    allowed
        .iter()
        .find(|candidate| candidate.to_lowercase() == wanted)
        .map(|candidate| (*candidate).to_string())
        .ok_or(FormatError::NotAllowed { allowed })
}

/// A `DD MM YYYY`-family date, re-emitted space-joined.
pub fn date(text: &str) -> Result<String, FormatError> {
    Ok(CalendarDate::parse(text)?.canonical())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{R9_OBJECT_SCHEMA, USAGE_STATUSES};

    fn spec(name: &str) -> &'static FieldSpec {
        R9_OBJECT_SCHEMA.field(name).unwrap()
    }

    #[test]
    fn sixteen_digit_identifier() {
        assert_eq!(fixed_digit_string("1111111111111111", 16).unwrap(), "1111111111111111");
        assert!(matches!(
            fixed_digit_string("111111111111111", 16),
            Err(FormatError::Digits(DigitError::WrongLength { expected: 16, actual: 15 }))
        ));
        assert!(matches!(
            fixed_digit_string("11111111111111a1", 16),
            Err(FormatError::Digits(DigitError::NonDigit { .. }))
        ));
    }

    #[test]
    fn integer_identifier_is_validated_by_its_digits() {
        let v = validate_field(spec("ID"), Some(&RawValue::Integer(1111111111111111))).unwrap();
        assert_eq!(v, FieldValue::Text("1111111111111111".into()));
    }

    #[test]
    fn letters_only_strips_and_trims() {
        assert_eq!(letters_only("poutre IPE 200").unwrap(), "poutre IPE");
        assert_eq!(letters_only("  élément-béton ").unwrap(), "élémentbéton");
        assert_eq!(letters_only("123 !"), Err(FormatError::NoLetters));
    }

    #[test]
    fn decimal_accepts_integers_and_trims() {
        assert_eq!(decimal_number(" 12.23 ").unwrap(), 12.23);
        assert_eq!(decimal_number("400").unwrap(), 400.0);
        assert_eq!(decimal_number("12,5"), Err(FormatError::NotANumber));
        assert_eq!(decimal_number("NaN"), Err(FormatError::NonFinite));
        assert_eq!(decimal_number("inf"), Err(FormatError::NonFinite));
    }

    #[test]
    fn nonempty_text_keeps_original() {
        assert_eq!(nonempty_text(" S355 ").unwrap(), " S355 ");
        assert_eq!(nonempty_text("   "), Err(FormatError::Blank));
    }

    #[test]
    fn enumeration_is_case_insensitive_and_canonical() {
        assert_eq!(enumerated("Réemployé", USAGE_STATUSES).unwrap(), "réemployé");
        assert_eq!(enumerated("EN USAGE", USAGE_STATUSES).unwrap(), "en usage");
        let err = enumerated("demoli", USAGE_STATUSES).unwrap_err();
        let msg = err.to_string();
        for allowed in USAGE_STATUSES {
            assert!(msg.contains(allowed), "{msg}");
        }
    }

    #[test]
    fn dates() {
        assert_eq!(date("13-01-2011").unwrap(), "13 01 2011");
        assert!(date("31 02 2020").is_err());
    }

    #[test]
    fn absent_is_missing_not_malformed() {
        let err = validate_field(spec("Materiau"), None).unwrap_err();
        assert!(matches!(err, FieldError::Missing { .. }));
        assert_eq!(err.field(), "Materiau");
    }

    #[test]
    fn malformed_message_names_field_and_literal() {
        let err = validate_field(spec("ID"), Some(&"12345".into())).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'ID'"), "{msg}");
        assert!(msg.contains("12345"), "{msg}");
        assert!(msg.contains("16"), "{msg}");
    }

    #[test]
    fn boolean_is_text_for_free_fields() {
        let v = validate_field(spec("Materiau"), Some(&RawValue::Boolean(true))).unwrap();
        assert_eq!(v, FieldValue::Text("True".into()));
        assert!(validate_field(spec("Longueur_m"), Some(&RawValue::Boolean(true))).is_err());
    }

    #[test]
    fn field_error_serializes_reason_as_text() {
        let err = validate_field(spec("Statut usage"), Some(&"demoli".into())).unwrap_err();
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "malformed");
        assert_eq!(json["field"], "Statut usage");
        assert_eq!(json["literal"], "demoli");
        assert!(json["reason"].as_str().unwrap().contains("en usage"));
    }
}
