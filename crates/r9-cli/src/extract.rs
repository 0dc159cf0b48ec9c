//! # Extract Subcommand
//!
//! Runs the ingestion pipeline over model exports:
//!
//! ```bash
//! r9 extract maquette.json
//! r9 extract exports/ --ledger data/ledger.json --category IfcBeam --category IfcColumn
//! r9 --config r9.yaml extract exports/ --nom-maquette "Residence Les Tilleuls"
//! r9 extract --mode object objets/
//! ```
//!
//! Flags override the configuration file. The exit code is `0` only if
//! every file produced at least one accepted record.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};

use r9_ingest::{
    expand_inputs, BatchReport, FileLedger, IdentifierRegistry, InMemoryLedger, JsonModelProvider,
    Ledger, ModelInputs, ModelStatus, Pipeline, PipelineConfig, ProcessingMode, RunContext,
};

/// What one input file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExtractMode {
    /// A model, split into all its components.
    Model,
    /// A single component.
    Object,
}

impl From<ExtractMode> for ProcessingMode {
    fn from(mode: ExtractMode) -> Self {
        match mode {
            ExtractMode::Model => ProcessingMode::Model,
            ExtractMode::Object => ProcessingMode::Object,
        }
    }
}

/// Arguments for the `r9 extract` subcommand.
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Model exports, or directories of `*.json` exports.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Whether each input is a whole model or a single object. Defaults
    /// to the configuration file, then `model`.
    #[arg(long, value_enum)]
    pub mode: Option<ExtractMode>,

    /// Ledger staging file. Registrations are appended and duplicates refused.
    #[arg(long)]
    pub ledger: Option<PathBuf>,

    /// Element category to enumerate. Repeat to list several, in order.
    #[arg(long = "category")]
    pub categories: Vec<String>,

    /// Model name.
    #[arg(long)]
    pub nom_maquette: Option<String>,

    /// Architect name.
    #[arg(long)]
    pub nom_architecte: Option<String>,

    /// Site coordinates, e.g. "48.8566, 2.3522".
    #[arg(long)]
    pub coordonnees_geographiques: Option<String>,

    /// Building programme.
    #[arg(long)]
    pub programme: Option<String>,

    /// Delivery date (DD MM YYYY).
    #[arg(long)]
    pub date_livraison: Option<String>,

    /// Deposit date (DD MM YYYY). Defaults to today.
    #[arg(long)]
    pub date_depot: Option<String>,
}

impl ExtractArgs {
    /// Fold the flags into `config`.
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(mode) = self.mode {
            config.mode = mode.into();
        }
        if !self.categories.is_empty() {
            config.categories = self.categories.clone();
        }
        if self.ledger.is_some() {
            config.ledger = self.ledger.clone();
        }
        config.model.merge(ModelInputs {
            nom_maquette: self.nom_maquette.clone(),
            nom_architecte: self.nom_architecte.clone(),
            coordonnees_geographiques: self.coordonnees_geographiques.clone(),
            programme: self.programme.clone(),
            date_livraison: self.date_livraison.clone(),
            date_depot: self.date_depot.clone(),
        });
    }
}

/// Execute the extract subcommand.
pub fn run_extract(args: &ExtractArgs, mut config: PipelineConfig) -> Result<u8> {
    args.apply(&mut config);

    let files = expand_inputs(&args.inputs)?;
    if files.is_empty() {
        bail!("no model exports found in the given inputs");
    }
    tracing::info!(files = files.len(), output_dir = %config.output_dir.display(), "extracting");

    let batch = match &config.ledger {
        Some(path) => {
            let ledger = FileLedger::open(path)
                .with_context(|| format!("failed to open ledger {}", path.display()))?;
            run_batch(Pipeline::new(JsonModelProvider, &config, Some(ledger))?, &files)
        }
        None => run_batch(
            Pipeline::<_, InMemoryLedger>::new(JsonModelProvider, &config, None)?,
            &files,
        ),
    };

    print_report(&batch);
    Ok(if batch.all_succeeded() { 0 } else { 1 })
}

fn run_batch<L: Ledger + IdentifierRegistry>(
    mut pipeline: Pipeline<JsonModelProvider, L>,
    files: &[PathBuf],
) -> BatchReport {
    let (_, batch) = pipeline.process_batch(files, RunContext::new());
    batch
}

fn print_report(batch: &BatchReport) {
    for file in &batch.files {
        println!("{}: {}", file.source.display(), file.status);
        for entity in &file.accepted {
            println!(
                "  + {} [{}] {} {}",
                entity.element,
                entity.category,
                entity.record.text("ID").unwrap_or_default(),
                entity.record.record_digest()
            );
        }
        for entity in &file.rejected {
            println!("  - {} [{}]", entity.element, entity.category);
            for reason in entity.reasons.messages() {
                println!("      {reason}");
            }
        }
        for entity in &file.unwritten {
            println!("  ! {} [{}] {} not written: {}", entity.element, entity.category, entity.id, entity.reason);
        }
        match &file.model {
            Some(ModelStatus::Stored(path)) => println!("  model: {}", path.display()),
            Some(ModelStatus::Rejected(reasons)) => println!("  model rejected: {reasons}"),
            None => {}
        }
    }
    let stats = batch.stats;
    println!();
    println!(
        "files: {} succeeded, {} failed; entities: {} accepted, {} rejected, {} unwritten",
        stats.files_succeeded, stats.files_failed, stats.accepted, stats.rejected, stats.unwritten
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> ExtractArgs {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: ExtractArgs,
        }

        let mut argv = vec!["r9", "model.json"];
        argv.extend_from_slice(extra);
        Wrapper::try_parse_from(argv).unwrap().args
    }

    #[test]
    fn flags_override_config() {
        let mut config = PipelineConfig::default();
        config.model.nom_maquette = Some("from file".into());
        config.model.programme = Some("bureaux".into());

        args(&[
            "--mode",
            "object",
            "--category",
            "IfcBeam",
            "--category",
            "IfcColumn",
            "--ledger",
            "ledger.json",
            "--nom-maquette",
            "from flag",
        ])
        .apply(&mut config);

        assert_eq!(config.mode, ProcessingMode::Object);
        assert_eq!(config.categories, vec!["IfcBeam", "IfcColumn"]);
        assert_eq!(config.ledger, Some(PathBuf::from("ledger.json")));
        assert_eq!(config.model.nom_maquette.as_deref(), Some("from flag"));
        assert_eq!(config.model.programme.as_deref(), Some("bureaux"));
    }

    #[test]
    fn absent_flags_keep_config() {
        let mut config = PipelineConfig::default();
        let before = config.clone();
        args(&[]).apply(&mut config);
        assert_eq!(config, before);
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = args(&[]);
        a.inputs = vec![dir.path().to_path_buf()];
        let config = PipelineConfig {
            output_dir: dir.path().join("out"),
            ..PipelineConfig::default()
        };
        assert!(run_extract(&a, config).is_err());
    }
}
