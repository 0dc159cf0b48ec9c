//! # Pipeline
//!
//! Drives whole source files through the stack, one at a time:
//!
//! 1. read the artifact bytes and digest them once;
//! 2. open the model through the provider;
//! 3. run the [`EntityProcessor`] in the configured mode, with the
//!    configured registry and any ledger as the "already registered"
//!    oracle;
//! 4. register each accepted object with the ledger, turning a ledger
//!    duplicate into a rejection;
//! 5. write the object document and artifact copy, withdrawing the
//!    registration and releasing the identifier if the write fails;
//! 6. in model mode, if anything was accepted, build, seal and write the
//!    model metadata;
//! 7. write the materials index.
//!
//! The index is written whatever the model metadata outcome, so it always
//! lists the object documents present on disk. A failing file never
//! aborts the batch.

use std::path::{Path, PathBuf};

use r9_core::{ContentDigest, ModelId};
use r9_crypto::{artifact_digest, object_stem, OutputStore};
use r9_schema::{DuplicateOrigin, Rejection, RejectionReport, SealedRecord, R9_OBJECT_SCHEMA};

use crate::config::PipelineConfig;
use crate::error::{IngestError, LedgerError};
use crate::index::{IndexEntry, MaterialIndex};
use crate::ledger::{InMemoryLedger, Ledger, LedgerRegistration};
use crate::metadata::{build_model_metadata, ModelInputs};
use crate::model::{Model, ModelProvider};
use crate::processor::{
    EntityProcessor, FileReport, FileStatus, ModelStatus, ProcessingMode,
    RejectedEntity, RunContext, RunStats, UnwrittenEntity,
};
use crate::registry::{IdentifierRegistry, InMemoryRegistry, RegistryChain};

/// Extension used for artifact copies when the source has none.
const DEFAULT_ARTIFACT_EXTENSION: &str = "ifc";

/// Outcome of a batch.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// One report per input file, in input order.
    pub files: Vec<FileReport>,
    /// Totals.
    pub stats: RunStats,
}

impl BatchReport {
    /// True if every file produced at least one accepted entity.
    pub fn all_succeeded(&self) -> bool {
        !self.files.is_empty() && self.files.iter().all(|f| f.status.is_success())
    }
}

/// Expand inputs: files are kept as given, directories contribute their
/// `*.json` entries in sorted order.
pub fn expand_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, IngestError> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let unreadable = |e: std::io::Error| IngestError::SourceUnreadable {
                path: input.clone(),
                reason: e.to_string(),
            };
            let mut found = Vec::new();
            for entry in std::fs::read_dir(input).map_err(unreadable)? {
                let path = entry.map_err(unreadable)?.path();
                if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json") {
                    found.push(path);
                }
            }
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

/// The ingestion pipeline.
pub struct Pipeline<P: ModelProvider, L: Ledger + IdentifierRegistry = InMemoryLedger> {
    provider: P,
    mode: ProcessingMode,
    categories: Vec<String>,
    inputs: ModelInputs,
    store: OutputStore,
    registry: InMemoryRegistry,
    ledger: Option<L>,
    index: MaterialIndex,
}

impl<P: ModelProvider, L: Ledger + IdentifierRegistry> Pipeline<P, L> {
    /// Build a pipeline from configuration. An existing materials index in
    /// the output directory is loaded and extended.
    pub fn new(provider: P, config: &PipelineConfig, ledger: Option<L>) -> Result<Self, IngestError> {
        let store = OutputStore::new(&config.output_dir);
        let index_path = store.index_path();
        let index = if index_path.exists() {
            let value = r9_crypto::read_json(&index_path)?;
            MaterialIndex::from_json(value).map_err(|e| IngestError::Index {
                path: index_path.clone(),
                reason: e.to_string(),
            })?
        } else {
            MaterialIndex::new()
        };
        Ok(Self {
            provider,
            mode: config.mode,
            categories: config.categories.clone(),
            inputs: config.model.clone(),
            store,
            registry: config.registered_ids.iter().cloned().collect(),
            ledger,
            index,
        })
    }

    /// The output store.
    pub fn store(&self) -> &OutputStore {
        &self.store
    }

    /// The ledger, if one is attached.
    pub fn ledger(&self) -> Option<&L> {
        self.ledger.as_ref()
    }

    /// The materials index as it stands.
    pub fn index(&self) -> &MaterialIndex {
        &self.index
    }

    /// Process every file in order, threading one run context through.
    pub fn process_batch(&mut self, files: &[PathBuf], mut ctx: RunContext) -> (RunContext, BatchReport) {
        let mut reports = Vec::with_capacity(files.len());
        for file in files {
            let (next, report) = self.process_file(file, ctx);
            ctx = next;
            reports.push(report);
        }
        let stats = ctx.stats();
        tracing::info!(
            files_succeeded = stats.files_succeeded,
            files_failed = stats.files_failed,
            accepted = stats.accepted,
            rejected = stats.rejected,
            unwritten = stats.unwritten,
            "batch complete"
        );
        (ctx, BatchReport { files: reports, stats })
    }

    /// Process one source file.
    pub fn process_file(&mut self, path: &Path, ctx: RunContext) -> (RunContext, FileReport) {
        let (mut ctx, report) = self.run_file(path, ctx);
        ctx.record_file(&report);
        match &report.status {
            FileStatus::Succeeded => tracing::info!(
                source = %path.display(),
                accepted = report.accepted.len(),
                rejected = report.rejected.len(),
                "file processed"
            ),
            status => tracing::warn!(
                source = %path.display(),
                accepted = report.accepted.len(),
                rejected = report.rejected.len(),
                unwritten = report.unwritten.len(),
                %status,
                "file failed"
            ),
        }
        (ctx, report)
    }

    fn run_file(&mut self, path: &Path, ctx: RunContext) -> (RunContext, FileReport) {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                return (ctx, FileReport::failed(path, FileStatus::SourceUnreadable(e.to_string())));
            }
        };
        let digest = artifact_digest(&bytes);
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(DEFAULT_ARTIFACT_EXTENSION)
            .to_string();

        let model = match self.provider.open(path) {
            Ok(model) => model,
            Err(e) => {
                let reason = match e {
                    IngestError::SourceUnreadable { reason, .. } => reason,
                    other => other.to_string(),
                };
                return (ctx, FileReport::failed(path, FileStatus::SourceUnreadable(reason)));
            }
        };

        let (mut ctx, mut report) = {
            let mut registries: Vec<&dyn IdentifierRegistry> = Vec::with_capacity(2);
            registries.push(&self.registry);
            if let Some(ledger) = &self.ledger {
                registries.push(ledger);
            }
            let chain = RegistryChain::new(registries);
            let processor =
                EntityProcessor::new(&R9_OBJECT_SCHEMA, &self.categories, &chain).with_mode(self.mode);
            processor.process(path, &model, digest, ctx)
        };
        if !matches!(report.status, FileStatus::Succeeded | FileStatus::EmptyResult) {
            return (ctx, report);
        }

        self.persist_objects(&mut report, &mut ctx, &bytes, &extension);
        report.settle();
        if let Some(first) = report.unwritten.first() {
            report.status = FileStatus::Failed(format!(
                "{} object(s) could not be written, first {}: {}",
                report.unwritten.len(),
                first.id,
                first.reason
            ));
        }

        if report.status.is_success() && self.mode == ProcessingMode::Model {
            if let Err(e) = self.store_model(path, &model, digest, &bytes, &extension, &mut report) {
                report.status = FileStatus::Failed(e.to_string());
            }
        }

        if let Err(e) = self.flush_index() {
            report.status = FileStatus::Failed(e.to_string());
        }
        (ctx, report)
    }

    /// Build, seal and write the model metadata of a file.
    fn store_model<M: Model>(
        &self,
        path: &Path,
        model: &M,
        digest: ContentDigest,
        bytes: &[u8],
        extension: &str,
        report: &mut FileReport,
    ) -> Result<(), IngestError> {
        match build_model_metadata(&self.inputs, model, digest)? {
            Ok(sealed) => {
                let name = sealed.text("nom_maquette").unwrap_or_default();
                let id = ModelId::parse(sealed.text("ID_maquette").unwrap_or_default())?;
                let stored = self
                    .store
                    .put_model(name, &id, &sealed.to_document(), bytes, extension)?;
                report.model = Some(ModelStatus::Stored(stored.document));
            }
            Err(reasons) => {
                tracing::warn!(source = %path.display(), %reasons, "model metadata rejected");
                report.model = Some(ModelStatus::Rejected(reasons));
            }
        }
        Ok(())
    }

    /// Register and write each accepted object. A ledger duplicate moves
    /// the entity to the rejected set; a failed write moves it to the
    /// unwritten set. Either way its identifier is released from `ctx`.
    fn persist_objects(&mut self, report: &mut FileReport, ctx: &mut RunContext, bytes: &[u8], extension: &str) {
        for entity in std::mem::take(&mut report.accepted) {
            let id = entity.record.text("ID").unwrap_or_default().to_string();
            match self.persist_object(&entity.record, bytes, extension) {
                Ok(()) => report.accepted.push(entity),
                Err(IngestError::Ledger(LedgerError::Duplicate { id })) => {
                    tracing::warn!(element = %entity.element, id = %id, "ledger refused duplicate identifier");
                    ctx.release(&id);
                    report.rejected.push(RejectedEntity {
                        element: entity.element,
                        category: entity.category,
                        reasons: RejectionReport::single(Rejection::DuplicateIdentifier {
                            identifier: id,
                            origin: DuplicateOrigin::Ledger,
                        }),
                    });
                }
                Err(err) => {
                    tracing::error!(element = %entity.element, id = %id, error = %err, "object not written");
                    ctx.release(&id);
                    report.unwritten.push(UnwrittenEntity {
                        element: entity.element,
                        category: entity.category,
                        id,
                        reason: err.to_string(),
                    });
                }
            }
        }
    }

    fn persist_object(&mut self, record: &SealedRecord, bytes: &[u8], extension: &str) -> Result<(), IngestError> {
        let stem = object_stem(
            record.text("ID").unwrap_or_default(),
            record.text("NOM").unwrap_or_default(),
        )?;
        let registered = match self.ledger.as_mut() {
            Some(ledger) => {
                ledger.register(LedgerRegistration::from_sealed(record)?)?;
                true
            }
            None => false,
        };
        if let Err(err) = self.store.put_object(&stem, &record.to_document(), bytes, extension) {
            if registered {
                if let Some(ledger) = self.ledger.as_mut() {
                    let id = record.text("ID").unwrap_or_default();
                    if let Err(withdraw) = ledger.withdraw(id) {
                        tracing::error!(id, error = %err, "write failed and registration could not be withdrawn");
                        return Err(withdraw.into());
                    }
                }
            }
            return Err(err.into());
        }
        if let Some(entry) = IndexEntry::from_sealed(record) {
            self.index.upsert(entry);
        }
        Ok(())
    }

    fn flush_index(&self) -> Result<(), IngestError> {
        let value = self.index.to_json().map_err(|e| IngestError::Index {
            path: self.store.index_path(),
            reason: e.to_string(),
        })?;
        self.store.put_index(&value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::JsonModelProvider;

    #[test]
    fn expand_inputs_sorts_directory_entries() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.json", "a.json", "notes.txt"] {
            std::fs::write(dir.path().join(name), "{}").unwrap();
        }
        let single = dir.path().join("notes.txt");
        let files = expand_inputs(&[dir.path().to_path_buf(), single.clone()]).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("a.json"), dir.path().join("b.json"), single]
        );
    }

    #[test]
    fn unreadable_file_does_not_abort_batch() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            output_dir: dir.path().join("out"),
            ..PipelineConfig::default()
        };
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "not json").unwrap();
        let missing = dir.path().join("missing.json");

        let mut pipeline: Pipeline<_, InMemoryLedger> = Pipeline::new(JsonModelProvider, &config, None).unwrap();
        let (_, batch) = pipeline.process_batch(&[bad, missing], RunContext::new());
        assert_eq!(batch.files.len(), 2);
        assert!(batch
            .files
            .iter()
            .all(|f| matches!(f.status, FileStatus::SourceUnreadable(_))));
        assert_eq!(batch.stats.files_failed, 2);
        assert!(!batch.all_succeeded());
    }
}
