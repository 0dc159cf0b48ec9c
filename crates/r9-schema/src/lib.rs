//! # r9-schema — Field Schemas and the Validation Engine
//!
//! The core of the R9 stack. Given an opaque property source and a static
//! [`FieldSchema`], this crate:
//!
//! 1. looks up every field, probing ordered alternate names
//!    ([`extract::resolve_property`]);
//! 2. validates and normalizes each value ([`validate`]);
//! 3. returns a [`ValidatedRecord`] or, if anything failed, a
//!    [`RejectionReport`] listing every failure;
//! 4. seals a validated record with its artifact and record digests
//!    ([`SealedRecord`]).
//!
//! [`document`] generates the JSON Schema contract for persisted documents.
//!
//! ## Crate Policy
//!
//! - Pure: no filesystem or network access.
//! - Entity-level failures are values, never panics.

pub mod document;
pub mod extract;
pub mod field;
pub mod seal;
pub mod validate;
pub mod value;

pub use document::{document_schema, ContractError, DocumentContract, ValidationViolations, Violation};
pub use extract::{extract_record, DuplicateOrigin, Rejection, RejectionReport, ValidatedRecord};
pub use field::{
    DigestFields, FieldSchema, FieldSpec, FormatKind, ValueType, R9_MODEL_SCHEMA, R9_OBJECT_SCHEMA,
    USAGE_STATUSES,
};
pub use seal::{IntegrityError, SealedRecord};
pub use validate::{validate_field, FieldError, FormatError};
pub use value::{FieldValue, PropertySource, RawValue};
