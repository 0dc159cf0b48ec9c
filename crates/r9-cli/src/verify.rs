//! # Verify Subcommand
//!
//! Re-checks a stored document:
//!
//! 1. its shape against the generated JSON Schema contract;
//! 2. its fields and record digest, by re-validating and re-sealing;
//! 3. its artifact digest, against `--artifact` or the copy the store
//!    wrote next to it.
//!
//! ```bash
//! r9 verify data/processed/objets_json/1111111111111111_poutre_IPE.json
//! r9 verify --schema model data/processed/maquettes/maquette_X_123456789123/X.json
//! ```
//!
//! Exits `2` on any mismatch.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use r9_crypto::{read_json, OutputStore, StoreError};
use r9_schema::{ContractError, DocumentContract, SealedRecord};

use crate::{SchemaKind, EXIT_MISMATCH};

/// Arguments for the `r9 verify` subcommand.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Stored document to verify.
    pub document: PathBuf,

    /// Document kind.
    #[arg(long, value_enum, default_value = "object")]
    pub schema: SchemaKind,

    /// Artifact to check the artifact digest against. Defaults to the
    /// copy stored alongside the document.
    #[arg(long)]
    pub artifact: Option<PathBuf>,
}

/// Execute the verify subcommand.
pub fn run_verify(args: &VerifyArgs) -> Result<u8> {
    let schema = args.schema.field_schema();
    let document = read_json(&args.document)
        .with_context(|| format!("failed to read {}", args.document.display()))?;
    println!("{}:", args.document.display());

    let mut mismatch = false;

    let contract = DocumentContract::new(schema)?;
    match contract.validate(&document) {
        Ok(()) => println!("  contract: ok"),
        Err(ContractError::ValidationFailed { violations, .. }) => {
            mismatch = true;
            println!("  contract: INVALID");
            println!("{violations}");
        }
        Err(e) => return Err(e.into()),
    }

    match SealedRecord::verify_document(schema, &document) {
        Ok(record) => println!("  {}: ok {}", schema.digests.record, record.record_digest()),
        Err(e) => {
            mismatch = true;
            println!("  {}: FAILED {e}", schema.digests.record);
        }
    }

    let artifact = match &args.artifact {
        Some(path) => Some(path.clone()),
        None => match locate_artifact(args.schema, &args.document) {
            Ok(found) => found,
            Err(StoreError::MissingArtifact { stem, dir }) => {
                mismatch = true;
                println!("  {}: FAILED no artifact '{stem}' in {}", schema.digests.artifact, dir.display());
                None
            }
            Err(e) => return Err(e.into()),
        },
    };
    match artifact {
        Some(path) => {
            let store = OutputStore::new(args.document.parent().unwrap_or_else(|| Path::new(".")));
            match store.verify_artifact(&args.document, &path, schema.digests.artifact) {
                Ok(digest) => println!("  {}: ok {digest} ({})", schema.digests.artifact, path.display()),
                Err(e @ (StoreError::IntegrityViolation { .. } | StoreError::MissingDigest { .. })) => {
                    mismatch = true;
                    println!("  {}: FAILED {e}", schema.digests.artifact);
                }
                Err(e) => return Err(e.into()),
            }
        }
        None if !mismatch => println!("  {}: not checked (no artifact)", schema.digests.artifact),
        None => {}
    }

    if mismatch {
        tracing::warn!(document = %args.document.display(), "verification failed");
        return Ok(EXIT_MISMATCH);
    }
    Ok(0)
}

/// Find the artifact copy the store wrote for `document`.
///
/// Objects live in `objets_json/` with their copy in `objets_ifc/`; a model
/// document shares its directory with its copy, named `{stem}.*`.
/// `Ok(None)` when the document is not in a store layout.
fn locate_artifact(kind: SchemaKind, document: &Path) -> Result<Option<PathBuf>, StoreError> {
    let Some(stem) = document.file_stem().and_then(|s| s.to_str()) else {
        return Ok(None);
    };
    let Some(parent) = document.parent() else {
        return Ok(None);
    };
    match kind {
        SchemaKind::Object => {
            let in_store = parent.file_name().and_then(|n| n.to_str()) == Some(OutputStore::OBJECTS_JSON);
            match parent.parent() {
                Some(base) if in_store => OutputStore::new(base).object_artifact(stem).map(Some),
                _ => Ok(None),
            }
        }
        SchemaKind::Model => {
            let entries = std::fs::read_dir(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
            let prefix = format!("{stem}.");
            let mut siblings = Vec::new();
            for entry in entries {
                let path = entry
                    .map_err(|source| StoreError::Io {
                        path: parent.to_path_buf(),
                        source,
                    })?
                    .path();
                let named_after = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&prefix));
                if path != document && named_after {
                    siblings.push(path);
                }
            }
            siblings.sort();
            Ok(siblings.into_iter().next())
        }
    }
}
