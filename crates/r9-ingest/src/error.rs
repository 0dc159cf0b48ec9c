//! # Ingestion Error Types
//!
//! File-level and collaborator faults. Entity-level failures (missing,
//! malformed, duplicate) are never errors here: they are carried as
//! `r9_schema::Rejection` values in the file report.

use std::path::PathBuf;

use r9_core::{CanonicalizationError, DigitError};
use r9_crypto::StoreError;
use thiserror::Error;

/// A source file could not be processed at all.
#[derive(Error, Debug)]
pub enum IngestError {
    /// The element-graph provider could not open or parse the source.
    #[error("source unreadable: {}: {reason}", path.display())]
    SourceUnreadable {
        /// The source path.
        path: PathBuf,
        /// Provider message.
        reason: String,
    },

    /// The materials index could not be parsed or serialized.
    #[error("materials index {}: {reason}", path.display())]
    Index {
        /// Index path.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// The batched registry query failed.
    #[error("identifier registry unavailable: {0}")]
    Registry(#[from] RegistryError),

    /// Writing outputs failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Sealing could not canonicalize a record.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),

    /// A sealed model record carries a malformed `ID_maquette`.
    #[error("model identifier: {0}")]
    ModelId(#[from] DigitError),

    /// The ledger failed for a reason other than a duplicate.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// The identifier registry could not answer.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The backing store could not be read.
    #[error("registry backend failed: {0}")]
    Backend(String),
}

/// A ledger registration failed.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The identifier is already registered.
    #[error("identifier {id} is already registered")]
    Duplicate {
        /// The contested identifier.
        id: String,
    },

    /// The record lacks a field the registration needs.
    #[error("record cannot be registered: missing {field}")]
    Incomplete {
        /// The absent field.
        field: &'static str,
    },

    /// The staging file could not be read or written.
    #[error("ledger staging file: {0}")]
    Store(#[from] StoreError),

    /// The staging file is not a list of registrations.
    #[error("ledger staging file {} is malformed: {source}", path.display())]
    Malformed {
        /// Staging file path.
        path: PathBuf,
        /// Parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// Configuration could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        /// Config path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The YAML did not parse into a pipeline config.
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        /// Config path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_yaml::Error,
    },

    /// A parsed value is unusable.
    #[error("invalid config value for {key}: {reason}")]
    Invalid {
        /// Config key.
        key: &'static str,
        /// What is wrong.
        reason: String,
    },
}
