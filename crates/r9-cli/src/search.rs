//! # Search Subcommand
//!
//! Filters the materials index of an output directory.
//!
//! ```bash
//! r9 search --where "Materiau=acier" --where "Longueur_m=>4"
//! r9 --output-dir out search --where "Statut usage=réemployé" --json
//! ```

use anyhow::{bail, Context, Result};
use clap::Args;

use r9_crypto::{read_json, OutputStore};
use r9_ingest::{Filter, IndexEntry, MaterialIndex, PipelineConfig};

/// Arguments for the `r9 search` subcommand.
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Filter as `field=value`. Numeric fields take `>x`, `<x` or a number;
    /// text fields match case-insensitive substrings. Repeat to combine.
    #[arg(long = "where", value_name = "FIELD=VALUE")]
    pub filters: Vec<String>,

    /// Print matches as a JSON array.
    #[arg(long)]
    pub json: bool,
}

/// Parse every filter, dropping those on unindexed fields.
pub fn parse_filters(exprs: &[String]) -> Result<Vec<Filter>> {
    let mut filters = Vec::with_capacity(exprs.len());
    for expr in exprs {
        match Filter::parse(expr)? {
            Some(filter) => filters.push(filter),
            None => tracing::warn!(filter = %expr, "ignoring filter on a field the index does not carry"),
        }
    }
    Ok(filters)
}

/// Execute the search subcommand.
pub fn run_search(args: &SearchArgs, config: &PipelineConfig) -> Result<u8> {
    let store = OutputStore::new(&config.output_dir);
    let path = store.index_path();
    if !path.exists() {
        bail!("no materials index at {}; run `r9 extract` first", path.display());
    }
    let index = MaterialIndex::from_json(read_json(&path)?)
        .with_context(|| format!("malformed materials index {}", path.display()))?;

    let filters = parse_filters(&args.filters)?;
    let matches: Vec<&IndexEntry> = index.search(&filters).collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&matches)?);
    } else {
        for entry in &matches {
            println!(
                "{}  {:<24} {:<12} {:<10} {:>8} m  {:<10} {:>8}  {}",
                entry.id,
                entry.nom,
                entry.materiau,
                entry.caracteristique_materiau,
                entry.longueur_m,
                entry.statut_usage,
                entry.empreinte_carbonne,
                entry.hash_json
            );
        }
        println!();
        println!("{} of {} entries match", matches.len(), index.len());
    }
    Ok(0)
}
