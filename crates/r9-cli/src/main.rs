//! # r9 CLI entry point
//!
//! Parses command-line arguments, installs the tracing subscriber and
//! dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use r9_cli::extract::{run_extract, ExtractArgs};
use r9_cli::resolve_config;
use r9_cli::schema::{run_schema, SchemaArgs};
use r9_cli::search::{run_search, SearchArgs};
use r9_cli::verify::{run_verify, VerifyArgs};

/// R9 stack CLI.
///
/// Extracts the R9 metadata of building components from BIM model exports,
/// validates and seals it with SHA-256 digests, and verifies and searches
/// the sealed documents.
#[derive(Parser, Debug)]
#[command(name = "r9", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output directory for sealed documents.
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Log line format.
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate, seal and store component records from model exports.
    Extract(ExtractArgs),

    /// Recompute and check the digests of a stored document.
    Verify(VerifyArgs),

    /// Filter the materials index.
    Search(SearchArgs),

    /// Print the JSON Schema of a stored document.
    Schema(SchemaArgs),
}

/// Level for `-v` repetition; `RUST_LOG` wins when set.
fn env_filter(verbose: u8) -> EnvFilter {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn init_tracing(verbose: u8, format: LogFormat) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn main() -> ExitCode {
    let Cli {
        verbose,
        config,
        output_dir,
        log_format,
        command,
    } = Cli::parse();

    init_tracing(verbose, log_format);
    tracing::debug!("r9 CLI starting");

    let result = match command {
        Commands::Extract(args) => {
            resolve_config(config.as_deref(), output_dir).and_then(|c| run_extract(&args, c))
        }
        Commands::Search(args) => {
            resolve_config(config.as_deref(), output_dir).and_then(|c| run_search(&args, &c))
        }
        Commands::Verify(args) => run_verify(&args),
        Commands::Schema(args) => run_schema(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
