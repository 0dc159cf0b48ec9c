//! # r9-ingest — The R9 Ingestion Pipeline
//!
//! Connects the validation engine (`r9-schema`) to source files and output
//! collaborators:
//!
//! - [`model`]: the element-graph provider seam and the JSON property-bag
//!   provider.
//! - [`processor`]: per-file entity processing, in model or single-object
//!   mode, with run-wide identifier uniqueness carried in an explicit
//!   [`RunContext`].
//! - [`metadata`]: the model metadata record.
//! - [`registry`] and [`ledger`]: "already registered" lookups and ledger
//!   staging.
//! - [`index`]: the searchable materials index.
//! - [`config`]: YAML pipeline configuration.
//! - [`pipeline`]: file and batch orchestration.
//!
//! Processing is single-threaded and synchronous: each source file is
//! processed start to finish before the next.

pub mod config;
pub mod error;
pub mod index;
pub mod ledger;
pub mod metadata;
pub mod model;
pub mod pipeline;
pub mod processor;
pub mod registry;

pub use config::PipelineConfig;
pub use error::{ConfigError, IngestError, LedgerError, RegistryError};
pub use index::{Filter, FilterError, IndexEntry, MaterialIndex};
pub use ledger::{FileLedger, InMemoryLedger, Ledger, LedgerRegistration};
pub use metadata::{build_model_metadata, ModelInputs};
pub use model::{
    Element, JsonModel, JsonModelProvider, Model, ModelProvider, DEFAULT_CATEGORIES,
    SINGLE_OBJECT_CATEGORIES,
};
pub use pipeline::{expand_inputs, BatchReport, Pipeline};
pub use processor::{
    AcceptedEntity, EntityProcessor, FileReport, FileStatus, ModelStatus, ProcessingMode,
    RejectedEntity, RunContext, RunStats, UnwrittenEntity,
};
pub use registry::{IdentifierRegistry, InMemoryRegistry, RegistryChain};
