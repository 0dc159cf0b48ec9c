//! # Sealing — Two-Pass Digests
//!
//! A [`ValidatedRecord`] becomes a [`SealedRecord`] by attaching two
//! digests, in a fixed order:
//!
//! 1. the artifact digest (SHA-256 of the raw source file bytes) is stored
//!    under the schema's artifact digest field, e.g. `hash_ifc`;
//! 2. the record digest is SHA-256 of the canonical form of the record
//!    *including* the artifact digest field, stored under e.g. `hash_json`.
//!
//! The record digest never covers itself. Verification recomputes it from
//! the persisted document with the record digest field removed.

use std::collections::BTreeMap;

use r9_core::{sha256_digest, CanonicalBytes, CanonicalizationError, ContentDigest};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::extract::{extract_record, RejectionReport, ValidatedRecord};
use crate::field::{DigestFields, FieldSchema};
use crate::value::FieldValue;

/// A persisted document failed verification.
#[derive(Error, Debug)]
pub enum IntegrityError {
    /// The document is not a JSON object.
    #[error("document is not a JSON object")]
    NotAnObject,

    /// A digest field is absent or not a 64-hex string.
    #[error("digest field '{field}' is missing or malformed")]
    BadDigestField {
        /// The digest field name.
        field: &'static str,
    },

    /// The document carries keys the schema does not declare.
    #[error("unexpected fields: {}", .0.join(", "))]
    UnexpectedFields(Vec<String>),

    /// A field no longer validates.
    #[error("fields do not validate: {0}")]
    Invalid(RejectionReport),

    /// A field value is not in canonical form.
    #[error("field '{field}' is not in canonical form")]
    NotCanonical {
        /// The field name.
        field: String,
    },

    /// The stored record digest does not match the recomputed one.
    #[error("{field} mismatch: stored {stored}, computed {computed}")]
    DigestMismatch {
        /// The digest field name.
        field: &'static str,
        /// Digest found in the document.
        stored: ContentDigest,
        /// Digest recomputed from the content.
        computed: ContentDigest,
    },

    /// Canonicalization failed while recomputing.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),
}

/// A validated record with both digests attached. Immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct SealedRecord {
    values: BTreeMap<String, FieldValue>,
    digests: DigestFields,
    artifact_digest: ContentDigest,
    record_digest: ContentDigest,
}

impl SealedRecord {
    /// Seal a validated record.
    pub fn seal(
        record: ValidatedRecord,
        schema: &FieldSchema,
        artifact_digest: ContentDigest,
    ) -> Result<Self, CanonicalizationError> {
        let values = record.into_values();
        let record_digest = record_digest(&values, &schema.digests, &artifact_digest)?;
        Ok(Self {
            values,
            digests: schema.digests,
            artifact_digest,
            record_digest,
        })
    }

    /// Digest of the source artifact bytes.
    pub fn artifact_digest(&self) -> ContentDigest {
        self.artifact_digest
    }

    /// Digest of the canonical record (including the artifact digest).
    pub fn record_digest(&self) -> ContentDigest {
        self.record_digest
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

    /// The persisted document: every field plus both digest fields.
    pub fn to_document(&self) -> Value {
        let mut doc = content_map(&self.values, &self.digests, &self.artifact_digest);
        doc.insert(
            self.digests.record.to_string(),
            Value::String(self.record_digest.to_hex()),
        );
        Value::Object(doc)
    }

    /// Re-read a persisted document and check it end to end.
    ///
    /// The document must carry exactly the schema's fields plus the two
    /// digest fields, every field must re-validate to the value stored,
    /// and the stored record digest must match the recomputed one.
    pub fn verify_document(schema: &FieldSchema, document: &Value) -> Result<Self, IntegrityError> {
        let map = document.as_object().ok_or(IntegrityError::NotAnObject)?;

        let expected = schema.document_keys();
        let unexpected: Vec<String> = map
            .keys()
            .filter(|k| !expected.contains(&k.as_str()))
            .cloned()
            .collect();
        if !unexpected.is_empty() {
            return Err(IntegrityError::UnexpectedFields(unexpected));
        }

        let artifact_digest = digest_field(map, schema.digests.artifact)?;
        let stored = digest_field(map, schema.digests.record)?;

        let mut fields = map.clone();
        fields.remove(schema.digests.artifact);
        fields.remove(schema.digests.record);
        let record = extract_record(schema, &fields).map_err(IntegrityError::Invalid)?;
        for (name, value) in record.values() {
            if !fields.get(name).is_some_and(|stored| same_value(stored, value)) {
                return Err(IntegrityError::NotCanonical { field: name.clone() });
            }
        }

        let sealed = Self::seal(record, schema, artifact_digest)?;
        if sealed.record_digest != stored {
            return Err(IntegrityError::DigestMismatch {
                field: schema.digests.record,
                stored,
                computed: sealed.record_digest,
            });
        }
        Ok(sealed)
    }
}

fn same_value(stored: &Value, value: &FieldValue) -> bool {
    match (stored, value) {
        (Value::String(s), FieldValue::Text(t)) => s == t,
        (Value::Number(n), FieldValue::Number(x)) => n.as_f64() == Some(*x),
        _ => false,
    }
}

fn digest_field(map: &Map<String, Value>, field: &'static str) -> Result<ContentDigest, IntegrityError> {
    map.get(field)
        .and_then(Value::as_str)
        .and_then(|s| ContentDigest::from_hex(s).ok())
        .ok_or(IntegrityError::BadDigestField { field })
}

fn content_map(
    values: &BTreeMap<String, FieldValue>,
    digests: &DigestFields,
    artifact_digest: &ContentDigest,
) -> Map<String, Value> {
    let mut doc: Map<String, Value> = values
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect();
    doc.insert(
        digests.artifact.to_string(),
        Value::String(artifact_digest.to_hex()),
    );
    doc
}

fn record_digest(
    values: &BTreeMap<String, FieldValue>,
    digests: &DigestFields,
    artifact_digest: &ContentDigest,
) -> Result<ContentDigest, CanonicalizationError> {
    let content = content_map(values, digests, artifact_digest);
    let canonical = CanonicalBytes::new(&content)?;
    Ok(sha256_digest(&canonical))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{R9_MODEL_SCHEMA, R9_OBJECT_SCHEMA};
    use crate::value::RawValue;
    use serde_json::json;

    fn raw() -> BTreeMap<String, RawValue> {
        let doc = json!({
            "NOM": "poutre IPE 200",
            "ID": "1111111111111111",
            "ID_maquette": "123456789123",
            "Longueur_m": 12.23,
            "Caracteristique_Materiau": "S355",
            "Materiau": "acier",
            "Statut usage": "réemployé",
            "Date de fabrication": "13 01 2001",
            "date mise en service": "13 01 2011",
            "Date de réemploye": "13 01 2025",
            "Empreinte Carbonne": 400
        });
        serde_json::from_value(doc).unwrap()
    }

    fn sealed() -> SealedRecord {
        let record = extract_record(&R9_OBJECT_SCHEMA, &raw()).unwrap();
        SealedRecord::seal(record, &R9_OBJECT_SCHEMA, ContentDigest::from_bytes([7; 32])).unwrap()
    }

    #[test]
    fn document_has_fields_and_both_digests() {
        let doc = sealed().to_document();
        let map = doc.as_object().unwrap();
        assert_eq!(map.len(), 13);
        assert_eq!(map["hash_ifc"], json!("07".repeat(32)));
        let hash_json = map["hash_json"].as_str().unwrap();
        assert_eq!(hash_json.len(), 64);
    }

    #[test]
    fn record_digest_covers_artifact_digest_but_not_itself() {
        let s = sealed();
        let mut doc = s.to_document();
        doc.as_object_mut().unwrap().remove("hash_json");
        let recomputed = sha256_digest(&CanonicalBytes::new(&doc).unwrap());
        assert_eq!(recomputed, s.record_digest());

        let record = extract_record(&R9_OBJECT_SCHEMA, &raw()).unwrap();
        let other =
            SealedRecord::seal(record, &R9_OBJECT_SCHEMA, ContentDigest::from_bytes([8; 32])).unwrap();
        assert_ne!(other.record_digest(), s.record_digest());
    }

    #[test]
    fn verify_round_trip() {
        let s = sealed();
        let verified = SealedRecord::verify_document(&R9_OBJECT_SCHEMA, &s.to_document()).unwrap();
        assert_eq!(verified, s);
    }

    #[test]
    fn verify_survives_pretty_printing() {
        let s = sealed();
        let text = serde_json::to_string_pretty(&s.to_document()).unwrap();
        let reread: Value = serde_json::from_str(&text).unwrap();
        assert!(SealedRecord::verify_document(&R9_OBJECT_SCHEMA, &reread).is_ok());
    }

    #[test]
    fn tampered_field_is_detected() {
        let mut doc = sealed().to_document();
        doc["Materiau"] = json!("bois");
        assert!(matches!(
            SealedRecord::verify_document(&R9_OBJECT_SCHEMA, &doc),
            Err(IntegrityError::DigestMismatch { field: "hash_json", .. })
        ));
    }

    #[test]
    fn tampered_artifact_digest_is_detected() {
        let mut doc = sealed().to_document();
        doc["hash_ifc"] = json!("00".repeat(32));
        assert!(matches!(
            SealedRecord::verify_document(&R9_OBJECT_SCHEMA, &doc),
            Err(IntegrityError::DigestMismatch { .. })
        ));
    }

    #[test]
    fn extra_and_missing_fields_are_detected() {
        let mut doc = sealed().to_document();
        doc["extra"] = json!(1);
        assert!(matches!(
            SealedRecord::verify_document(&R9_OBJECT_SCHEMA, &doc),
            Err(IntegrityError::UnexpectedFields(_))
        ));

        let mut doc = sealed().to_document();
        doc.as_object_mut().unwrap().remove("Materiau");
        assert!(matches!(
            SealedRecord::verify_document(&R9_OBJECT_SCHEMA, &doc),
            Err(IntegrityError::Invalid(_))
        ));
    }

    #[test]
    fn non_canonical_value_is_detected() {
        let mut doc = sealed().to_document();
        doc["Statut usage"] = json!("RÉEMPLOYÉ");
        assert!(matches!(
            SealedRecord::verify_document(&R9_OBJECT_SCHEMA, &doc),
            Err(IntegrityError::NotCanonical { .. })
        ));
    }

    #[test]
    fn wrong_schema_is_rejected() {
        let doc = sealed().to_document();
        assert!(SealedRecord::verify_document(&R9_MODEL_SCHEMA, &doc).is_err());
    }
}
