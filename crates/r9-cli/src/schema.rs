//! # Schema Subcommand
//!
//! Prints the Draft 2020-12 JSON Schema a stored document must satisfy.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use r9_crypto::write_json;
use r9_schema::document_schema;

use crate::SchemaKind;

/// Arguments for the `r9 schema` subcommand.
#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Document kind.
    #[arg(value_enum, default_value = "object")]
    pub kind: SchemaKind,

    /// Write to this file instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Execute the schema subcommand.
pub fn run_schema(args: &SchemaArgs) -> Result<u8> {
    let schema = document_schema(args.kind.field_schema());
    match &args.out {
        Some(path) => {
            write_json(path, &schema)?;
            tracing::info!(path = %path.display(), "schema written");
        }
        None => println!("{}", serde_json::to_string_pretty(&schema)?),
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_schema_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("r9-model.schema.json");
        let args = SchemaArgs {
            kind: SchemaKind::Model,
            out: Some(out.clone()),
        };
        assert_eq!(run_schema(&args).unwrap(), 0);

        let written = r9_crypto::read_json(&out).unwrap();
        assert_eq!(written["$id"], "urn:r9:schema:r9-model");
        assert!(written["properties"]["hash_maquette_json"].is_object());
    }
}
