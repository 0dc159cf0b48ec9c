//! # r9-cli — Command-Line Interface for the R9 Stack
//!
//! Provides the `r9` binary. Handlers live here so they can be driven from
//! tests without spawning a process; `main.rs` only parses arguments,
//! installs logging and maps results to exit codes.
//!
//! ## Subcommands
//!
//! - `r9 extract`: validate, seal and store component records from one or
//!   more model exports.
//! - `r9 verify`: recompute the digests of a stored document.
//! - `r9 search`: filter the materials index.
//! - `r9 schema`: print the JSON Schema of a persisted document.
//!
//! ## Exit codes
//!
//! `0` when everything succeeded, `1` when any file failed or an error
//! occurred, `2` when a verified document does not match its digests.

pub mod extract;
pub mod schema;
pub mod search;
pub mod verify;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use r9_ingest::PipelineConfig;
use r9_schema::{FieldSchema, R9_MODEL_SCHEMA, R9_OBJECT_SCHEMA};

/// Exit code for a verification mismatch.
pub const EXIT_MISMATCH: u8 = 2;

/// Which persisted document a command works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SchemaKind {
    /// A building component (`objets_json/*.json`).
    Object,
    /// A building model (`maquettes/*/*.json`).
    Model,
}

impl SchemaKind {
    /// The field schema behind this kind.
    pub fn field_schema(self) -> &'static FieldSchema {
        match self {
            SchemaKind::Object => &R9_OBJECT_SCHEMA,
            SchemaKind::Model => &R9_MODEL_SCHEMA,
        }
    }
}

/// Load the configuration file (or defaults) and apply the global
/// `--output-dir` override.
pub fn resolve_config(config: Option<&Path>, output_dir: Option<PathBuf>) -> Result<PipelineConfig> {
    let mut resolved = PipelineConfig::load_or_default(config).with_context(|| match config {
        Some(path) => format!("failed to load configuration from {}", path.display()),
        None => "failed to build default configuration".to_string(),
    })?;
    if let Some(dir) = output_dir {
        resolved.output_dir = dir;
    }
    tracing::debug!(output_dir = %resolved.output_dir.display(), "configuration resolved");
    Ok(resolved)
}
