//! # r9-crypto — Artifact Digests and the Output Store
//!
//! - **Artifact digests** over raw source file bytes ([`artifact_digest`],
//!   [`file_digest`]). Record digests are *not* computed here: they flow
//!   through `r9_core::sha256_digest(&CanonicalBytes)`.
//! - **Output store** ([`OutputStore`]) laying sealed documents and
//!   artifact copies out under a base directory with deterministic names,
//!   writing every file atomically, and re-verifying digests on read.

pub mod error;
pub mod sha256;
pub mod store;

pub use error::StoreError;
pub use sha256::{artifact_digest, file_digest};
pub use store::{
    clean_name, object_stem, read_json, write_atomic, write_json, OutputStore, StoredModel,
    StoredObject,
};
