//! # Error Types — Structured Error Hierarchy
//!
//! Errors shared by the R9 crates. All errors use `thiserror` for derived
//! `Display` and `Error` implementations.
//!
//! Field-level validation failures are *not* errors in this sense: they are
//! accumulated as data by `r9-schema`. The types here describe faults in
//! the primitives themselves (a value that cannot be canonicalized, a digest
//! string that is not hex, a malformed identifier or date).

use thiserror::Error;

/// Top-level error type for the R9 primitives.
#[derive(Error, Debug)]
pub enum R9Error {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A digest string could not be parsed.
    #[error("invalid digest: {0}")]
    InvalidDigest(String),

    /// A fixed-width identifier was malformed.
    #[error("invalid identifier: {0}")]
    Identifier(#[from] DigitError),

    /// A calendar date was malformed or does not exist.
    #[error("invalid date: {0}")]
    Date(#[from] DateError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// A map key did not serialize to a JSON string.
    #[error("canonical form requires string keys: {0}")]
    NonStringKey(String),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// A fixed-width digit string check failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DigitError {
    /// The input contained something other than ASCII decimal digits.
    #[error("must contain only digits, got {literal:?}")]
    NonDigit {
        /// The offending input.
        literal: String,
    },

    /// The input was all digits but of the wrong length.
    #[error("must contain exactly {expected} digits, got {actual} digits")]
    WrongLength {
        /// Required digit count.
        expected: usize,
        /// Digit count of the input.
        actual: usize,
    },
}

/// A `DD MM YYYY` date failed to parse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    /// The input did not split into exactly three components.
    #[error("expected DD MM YYYY, got {literal:?}")]
    Layout {
        /// The offending input.
        literal: String,
    },

    /// A component was not a decimal number.
    #[error("non-numeric date component {component:?} in {literal:?}")]
    NonNumeric {
        /// The offending component.
        component: String,
        /// The full input.
        literal: String,
    },

    /// The components do not name a real calendar day.
    #[error("no such calendar date: {literal:?}")]
    Nonexistent {
        /// The offending input.
        literal: String,
    },
}
