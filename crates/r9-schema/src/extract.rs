//! # Record Extraction
//!
//! Turns one property source into a [`ValidatedRecord`] or a
//! [`RejectionReport`]. Extraction is all-or-nothing: every field of the
//! schema is looked up and validated, every failure is collected, and a
//! single failure discards the whole record.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::field::{FieldSchema, FieldSpec};
use crate::validate::{validate_field, FieldError};
use crate::value::{FieldValue, PropertySource, RawValue};

/// Where a duplicate identifier was already seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateOrigin {
    /// Accepted earlier in the same run.
    Run,
    /// Already registered on the ledger.
    Ledger,
}

impl std::fmt::Display for DuplicateOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplicateOrigin::Run => f.write_str("earlier in this run"),
            DuplicateOrigin::Ledger => f.write_str("on the ledger"),
        }
    }
}

/// One reason an entity was not accepted.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Rejection {
    /// A field was missing or malformed.
    #[error(transparent)]
    Field(#[from] FieldError),

    /// The record was valid but its identifier is already taken.
    #[error("duplicate identifier {identifier} (already accepted {origin})")]
    DuplicateIdentifier {
        /// The contested identifier.
        identifier: String,
        /// Where it was first seen.
        origin: DuplicateOrigin,
    },
}

impl Rejection {
    /// Short machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::Field(FieldError::Missing { .. }) => "missing_field",
            Rejection::Field(FieldError::Malformed { .. }) => "malformed_field",
            Rejection::DuplicateIdentifier { .. } => "duplicate_identifier",
        }
    }
}

/// Ordered failures for one entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RejectionReport {
    failures: Vec<Rejection>,
}

impl RejectionReport {
    /// An empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// A report holding a single rejection.
    pub fn single(rejection: Rejection) -> Self {
        Self {
            failures: vec![rejection],
        }
    }

    /// Append a failure.
    pub fn push(&mut self, rejection: impl Into<Rejection>) {
        self.failures.push(rejection.into());
    }

    /// The failures, in field order.
    pub fn failures(&self) -> &[Rejection] {
        &self.failures
    }

    /// Number of failures.
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// True if nothing failed.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Human-readable rendering of each failure.
    pub fn messages(&self) -> Vec<String> {
        self.failures.iter().map(ToString::to_string).collect()
    }
}

impl std::fmt::Display for RejectionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

/// A record whose every field passed validation.
///
/// Only [`extract_record`] builds one, so holding a `ValidatedRecord`
/// proves the schema's full field set is present and well-formed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRecord {
    schema: &'static str,
    values: BTreeMap<String, FieldValue>,
}

impl ValidatedRecord {
    /// Name of the schema the record was validated against.
    pub fn schema_name(&self) -> &'static str {
        self.schema
    }

    /// Value of a field.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    /// Text value of a field.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_text)
    }

    /// Numeric value of a field.
    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_number)
    }

    /// All values, keyed by field name.
    pub fn values(&self) -> &BTreeMap<String, FieldValue> {
        &self.values
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn into_values(self) -> BTreeMap<String, FieldValue> {
        self.values
    }
}

/// Find a field's raw value, probing its lookup keys in order.
///
/// Returns the key that matched alongside the value.
pub fn resolve_property<S>(spec: &FieldSpec, source: &S) -> Option<(&'static str, RawValue)>
where
    S: PropertySource + ?Sized,
{
    spec.lookup_keys()
        .into_iter()
        .find_map(|key| source.property(key).map(|value| (key, value)))
}

/// Extract and validate every field of `schema` from `source`.
///
/// # Errors
///
/// Returns the full [`RejectionReport`] if any field is missing or
/// malformed. The report lists failures in schema order.
pub fn extract_record<S>(schema: &FieldSchema, source: &S) -> Result<ValidatedRecord, RejectionReport>
where
    S: PropertySource + ?Sized,
{
    let mut values = BTreeMap::new();
    let mut report = RejectionReport::new();

    for spec in schema.fields {
        let resolved = resolve_property(spec, source);
        if let Some((key, _)) = &resolved {
            if *key != spec.source_name {
                tracing::trace!(field = spec.name, key, "field resolved under alternate name");
            }
        }
        match validate_field(spec, resolved.as_ref().map(|(_, value)| value)) {
            Ok(value) => {
                values.insert(spec.name.to_string(), value);
            }
            Err(err) => report.push(err),
        }
    }

    if !report.is_empty() {
        return Err(report);
    }
    Ok(ValidatedRecord {
        schema: schema.name,
        values,
    })
}
