//! # r9-core — Foundational Types for the R9 Stack
//!
//! This crate is the leaf of the R9 workspace. It defines the primitives
//! every other crate builds on: the canonical byte form used for hashing,
//! content digests, the fixed-width numeric identifiers, and the
//! `DD MM YYYY` calendar date used throughout R9 documents.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** All record digests flow through
//!    `CanonicalBytes::new()`. No raw `serde_json::to_vec()` for digests.
//!    Key order and whitespace can never leak into a digest.
//!
//! 2. **`sha256_digest()` accepts only `&CanonicalBytes`.** Raw artifact
//!    bytes are hashed through a separate, explicitly named path in
//!    `r9-crypto`, so the two digest kinds cannot be confused.
//!
//! 3. **Validated newtypes for identifiers.** `ObjectId` (16 digits) and
//!    `ModelId` (12 digits) can only be built through their checked
//!    constructors.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `r9-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, ContentDigest};
pub use error::{CanonicalizationError, DateError, DigitError, R9Error};
pub use identity::{check_fixed_digits, ModelId, ObjectId};
pub use temporal::CalendarDate;
