//! # Pipeline Configuration
//!
//! Optional YAML file read with `serde_yaml`. Every key has a default, so
//! an empty file (or no file) is a valid configuration:
//!
//! ```yaml
//! output_dir: data/processed
//! mode: model
//! categories: [IfcWall, IfcBeam, IfcColumn]
//! ledger: data/ledger.json
//! registered_ids: ["2222222222222222"]
//! model:
//!   nom_maquette: Residence Les Tilleuls
//!   nom_architecte: A. Martin
//!   coordonnees_geographiques: "48.8566, 2.3522"
//!   programme: logements
//!   date_livraison: 01 06 2026
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::metadata::ModelInputs;
use crate::model::DEFAULT_CATEGORIES;
use crate::processor::ProcessingMode;

/// Default output directory.
pub const DEFAULT_OUTPUT_DIR: &str = "data/processed";

/// Pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Where sealed documents are written.
    pub output_dir: PathBuf,
    /// Whether a source file is a whole model or a single object.
    pub mode: ProcessingMode,
    /// Element categories to enumerate, in order.
    pub categories: Vec<String>,
    /// Model description.
    pub model: ModelInputs,
    /// Ledger staging file. No ledger registration when unset.
    pub ledger: Option<PathBuf>,
    /// Identifiers to treat as already registered.
    pub registered_ids: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            mode: ProcessingMode::Model,
            categories: DEFAULT_CATEGORIES.iter().map(|c| (*c).to_string()).collect(),
            model: ModelInputs::default(),
            ledger: None,
            registered_ids: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Parse YAML text.
    pub fn from_yaml(yaml: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.check()?;
        Ok(config)
    }

    /// Load a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text, path)
    }

    /// Load `path` if given, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.categories.is_empty() {
            return Err(ConfigError::Invalid {
                key: "categories",
                reason: "at least one category is required".into(),
            });
        }
        if let Some(bad) = self.registered_ids.iter().find(|id| r9_core::ObjectId::parse(id).is_err()) {
            return Err(ConfigError::Invalid {
                key: "registered_ids",
                reason: format!("{bad:?} is not a 16-digit identifier"),
            });
        }
        Ok(())
    }
}
