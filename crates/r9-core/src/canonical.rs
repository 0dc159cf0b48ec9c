//! # Canonical Serialization — JCS Byte Production
//!
//! This module defines `CanonicalBytes`, the sole construction path for bytes
//! used in record digest computation.
//!
//! ## Invariant
//!
//! The `CanonicalBytes` newtype has a private inner field. The only way to
//! construct it is through `CanonicalBytes::new()`, which serializes through
//! RFC 8785 (JSON Canonicalization Scheme):
//!
//! - object keys sorted by UTF-16 code unit order, recursively,
//! - compact separators, no insignificant whitespace,
//! - UTF-8 output with non-ASCII characters emitted verbatim (no `\u` escapes),
//! - numbers rendered with the ECMAScript shortest round-trip form, so
//!   `400.0` and `400` canonicalize identically.
//!
//! Two values with the same key→value mapping produce byte-identical output
//! regardless of insertion order, and re-canonicalizing a parsed document
//! reproduces the same bytes.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization.
///
/// # Invariants
///
/// - The only constructor is `CanonicalBytes::new()`.
/// - The bytes are valid UTF-8 and valid JSON.
/// - Object keys are sorted; separators are compact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::NonStringKey` if a map key does not
    /// serialize to a JSON string, and `CanonicalizationError::SerializationFailed`
    /// if the value cannot be represented as JSON.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj).map_err(|e| {
            if e.to_string().contains("key must be a string") {
                CanonicalizationError::NonStringKey(e.to_string())
            } else {
                CanonicalizationError::SerializationFailed(e)
            }
        })?;
        let bytes = serialize_canonical(&value)?;
        Ok(Self(bytes))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// View the canonical form as text. Canonical bytes are always UTF-8.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn serialize_canonical(value: &Value) -> Result<Vec<u8>, CanonicalizationError> {
    let s = serde_jcs::to_string(value)?;
    Ok(s.into_bytes())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn flat_record() -> impl Strategy<Value = Vec<(String, Value)>> {
        let leaf = prop_oneof![
            "[a-zA-Zéè ]{0,20}".prop_map(Value::String),
            any::<i32>().prop_map(|n| serde_json::json!(n)),
            (-1.0e6f64..1.0e6f64).prop_map(|f| serde_json::json!(f)),
        ];
        prop::collection::vec(("[a-zA-Z_ ]{1,12}", leaf), 0..12)
    }

    proptest! {
        /// Reversing insertion order never changes the canonical bytes.
        #[test]
        fn order_independent(entries in flat_record()) {
            let forward: serde_json::Map<String, Value> = entries.iter().cloned().collect();
            let backward: serde_json::Map<String, Value> = entries.iter().rev().cloned().collect();
            // Later duplicates win in both maps, so compare only when keys are unique.
            prop_assume!(forward.len() == entries.len());
            let a = CanonicalBytes::new(&forward).unwrap();
            let b = CanonicalBytes::new(&backward).unwrap();
            prop_assert_eq!(a.as_bytes(), b.as_bytes());
        }

        /// Parsing the canonical output and canonicalizing again is a fixed point.
        #[test]
        fn canonicalization_is_idempotent(entries in flat_record()) {
            let map: serde_json::Map<String, Value> = entries.into_iter().collect();
            let once = CanonicalBytes::new(&map).unwrap();
            let parsed: Value = serde_json::from_slice(once.as_bytes()).unwrap();
            let twice = CanonicalBytes::new(&parsed).unwrap();
            prop_assert_eq!(once.as_bytes(), twice.as_bytes());
        }
    }
}
