//! # Content Digest — Content-Addressed Fingerprints
//!
//! Defines `ContentDigest`, the 32-byte SHA-256 fingerprint attached to R9
//! documents as `hash_json` / `hash_ifc` and submitted to the ledger.
//!
//! ## Invariant
//!
//! Record digests can only be computed from `CanonicalBytes`, ensuring that
//! every `hash_json` is produced through the canonicalization pipeline. This
//! is enforced by the signature of `sha256_digest()`. Digests render as 64
//! lowercase hex characters and serialize as that string.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;
use crate::error::R9Error;

/// A SHA-256 content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// Wrap a raw 32-byte digest value.
    ///
    /// Prefer [`sha256_digest()`] for record digests.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a digest from its 64-character hex rendering.
    ///
    /// Uppercase input is accepted; the digest always renders lowercase.
    ///
    /// # Errors
    ///
    /// Returns `R9Error::InvalidDigest` if the string is not exactly 64 hex
    /// characters.
    pub fn from_hex(s: &str) -> Result<Self, R9Error> {
        let s = s.trim();
        if s.len() != 64 {
            return Err(R9Error::InvalidDigest(format!(
                "expected 64 hex chars, got {}",
                s.len()
            )));
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk)
                .map_err(|_| R9Error::InvalidDigest("digest is not ASCII".into()))?;
            bytes[i] = u8::from_str_radix(pair, 16).map_err(|_| {
                R9Error::InvalidDigest(format!("non-hex characters in {pair:?}"))
            })?;
        }
        Ok(Self(bytes))
    }

    /// The raw 32-byte digest value.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ContentDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Compute a SHA-256 content digest from canonical bytes.
///
/// Accepts only `&CanonicalBytes`, not raw `&[u8]`: a record digest can
/// never be computed over a non-canonical serialization.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    let hash = Sha256::digest(data.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest(bytes)
}

/// Compute a SHA-256 hex string from canonical bytes.
pub fn sha256_hex(data: &CanonicalBytes) -> String {
    sha256_digest(data).to_hex()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn deterministic() {
        let mut data = BTreeMap::new();
        data.insert("a", 1);
        data.insert("b", 2);
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(sha256_digest(&cb), sha256_digest(&cb));
    }

    #[test]
    fn hex_format() {
        let cb = CanonicalBytes::new(&serde_json::json!({"key": "value"})).unwrap();
        let hex = sha256_hex(&cb);
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn known_vector_empty_object() {
        let cb = CanonicalBytes::new(&serde_json::json!({})).unwrap();
        assert_eq!(
            sha256_hex(&cb),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn single_field_edit_changes_digest() {
        let a = CanonicalBytes::new(&serde_json::json!({"ID": "1111111111111111"})).unwrap();
        let b = CanonicalBytes::new(&serde_json::json!({"ID": "1111111111111112"})).unwrap();
        assert_ne!(sha256_digest(&a), sha256_digest(&b));
    }

    #[test]
    fn hex_round_trip() {
        let cb = CanonicalBytes::new(&serde_json::json!({"a": 1})).unwrap();
        let digest = sha256_digest(&cb);
        let parsed = ContentDigest::from_hex(&digest.to_hex()).unwrap();
        assert_eq!(parsed, digest);
        let upper = ContentDigest::from_hex(&digest.to_hex().to_uppercase()).unwrap();
        assert_eq!(upper, digest);
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert!(ContentDigest::from_hex("abc").is_err());
        assert!(ContentDigest::from_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn serializes_as_hex_string() {
        let digest = ContentDigest::from_bytes([0xab; 32]);
        let json = serde_json::to_string(&digest).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));
        let back: ContentDigest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, digest);
    }
}
