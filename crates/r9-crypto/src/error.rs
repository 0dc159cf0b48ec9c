//! # Store Error Types

use std::path::PathBuf;

use r9_core::ContentDigest;
use thiserror::Error;

/// Errors from the output store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A name has nothing left after filtering to `[\w-]`.
    #[error("name {0:?} has no usable characters for a file name")]
    InvalidName(String),

    /// Filesystem operation failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// The file or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A stored document is not valid JSON.
    #[error("document at {} is not valid JSON: {source}", path.display())]
    Json {
        /// The document path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// A stored document or artifact does not match its recorded digest.
    #[error("integrity violation at {}: {field} is {stored} but content digests to {computed}", path.display())]
    IntegrityViolation {
        /// The document path.
        path: PathBuf,
        /// Digest field that disagrees.
        field: String,
        /// Digest recorded in the document.
        stored: ContentDigest,
        /// Digest recomputed from content.
        computed: ContentDigest,
    },

    /// A stored document lacks a digest field or carries a bad one.
    #[error("document at {} has no valid {field}", path.display())]
    MissingDigest {
        /// The document path.
        path: PathBuf,
        /// Digest field name.
        field: String,
    },

    /// No artifact copy sits next to a stored document.
    #[error("no artifact copy found for {stem} under {}", dir.display())]
    MissingArtifact {
        /// File stem searched for.
        stem: String,
        /// Directory searched.
        dir: PathBuf,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_display_names_path() {
        let err = StoreError::io("/tmp/x.json", std::io::Error::other("disk full"));
        let msg = err.to_string();
        assert!(msg.contains("/tmp/x.json"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn integrity_display_names_both_digests() {
        let err = StoreError::IntegrityViolation {
            path: "a.json".into(),
            field: "hash_ifc".into(),
            stored: ContentDigest::from_bytes([0; 32]),
            computed: ContentDigest::from_bytes([1; 32]),
        };
        let msg = err.to_string();
        assert!(msg.contains("hash_ifc"));
        assert!(msg.contains(&"00".repeat(32)));
        assert!(msg.contains(&"01".repeat(32)));
    }
}
