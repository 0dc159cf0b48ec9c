//! # Entity Processing
//!
//! Runs extraction and sealing over every element of one opened model and
//! partitions the elements into accepted and rejected sets.
//!
//! ## Per-run state
//!
//! Identifier uniqueness spans a whole run. The set of identifiers accepted
//! so far lives in a [`RunContext`] value that is passed into
//! [`EntityProcessor::process`] and handed back with the file's result,
//! so there is no hidden global state and a run can be replayed.
//!
//! ## Order
//!
//! Categories are enumerated in configured order, elements in encounter
//! order within a category. The first element to claim an identifier wins.
//! Rejections are reported in that same order, whether they come from
//! extraction or from a duplicate identifier.
//!
//! ## Modes
//!
//! [`ProcessingMode::Model`] splits a model into every element of the
//! configured categories. [`ProcessingMode::Object`] treats the file as
//! one component: only the first element of [`SINGLE_OBJECT_CATEGORIES`]
//! (or, failing that, the first element of the model) is processed.

use std::collections::BTreeSet;
use std::path::PathBuf;

use r9_core::ContentDigest;
use r9_schema::{
    extract_record, DuplicateOrigin, FieldSchema, Rejection, RejectionReport, SealedRecord,
    ValidatedRecord,
};
use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::model::{Element, Model, SINGLE_OBJECT_CATEGORIES};
use crate::registry::IdentifierRegistry;

/// Counters for a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Files with at least one accepted entity.
    pub files_succeeded: usize,
    /// Files that failed or accepted nothing.
    pub files_failed: usize,
    /// Entities accepted.
    pub accepted: usize,
    /// Entities rejected.
    pub rejected: usize,
    /// Entities accepted but whose outputs could not be written.
    pub unwritten: usize,
}

/// How a source file maps to components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// A model to split into all its components.
    #[default]
    Model,
    /// A file describing a single component.
    Object,
}

/// State carried from one file to the next within a run.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    accepted_ids: BTreeSet<String>,
    stats: RunStats,
}

impl RunContext {
    /// A fresh run.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `id` was accepted earlier in the run.
    pub fn is_accepted(&self, id: &str) -> bool {
        self.accepted_ids.contains(id)
    }

    /// Identifiers accepted so far.
    pub fn accepted_ids(&self) -> &BTreeSet<String> {
        &self.accepted_ids
    }

    /// Run counters.
    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Forget that `id` was accepted, after its outputs failed to be
    /// written. Returns false if it was not accepted.
    pub fn release(&mut self, id: &str) -> bool {
        self.accepted_ids.remove(id)
    }

    /// Fold a finished file into the counters.
    pub fn record_file(&mut self, report: &FileReport) {
        if report.status.is_success() {
            self.stats.files_succeeded += 1;
        } else {
            self.stats.files_failed += 1;
        }
        self.stats.accepted += report.accepted.len();
        self.stats.rejected += report.rejected.len();
        self.stats.unwritten += report.unwritten.len();
    }
}

/// Terminal status of one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum FileStatus {
    /// At least one entity was accepted.
    Succeeded,
    /// Processing finished but nothing was accepted.
    EmptyResult,
    /// The provider could not open the file.
    SourceUnreadable(String),
    /// The batched registry query failed.
    RegistryUnavailable(String),
    /// Sealing or writing outputs failed.
    Failed(String),
}

impl FileStatus {
    /// True only for [`FileStatus::Succeeded`].
    pub fn is_success(&self) -> bool {
        matches!(self, FileStatus::Succeeded)
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileStatus::Succeeded => f.write_str("succeeded"),
            FileStatus::EmptyResult => f.write_str("failed: no entity accepted"),
            FileStatus::SourceUnreadable(r) => write!(f, "failed: source unreadable: {r}"),
            FileStatus::RegistryUnavailable(r) => write!(f, "failed: registry unavailable: {r}"),
            FileStatus::Failed(r) => write!(f, "failed: {r}"),
        }
    }
}

/// An accepted, sealed entity.
#[derive(Debug, Clone)]
pub struct AcceptedEntity {
    /// Provider identifier of the source element.
    pub element: String,
    /// Element category.
    pub category: String,
    /// The sealed record.
    pub record: SealedRecord,
}

/// A rejected entity and every reason.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedEntity {
    /// Provider identifier of the source element.
    pub element: String,
    /// Element category.
    pub category: String,
    /// Why it was rejected.
    pub reasons: RejectionReport,
}

/// An accepted entity whose outputs could not be written. Its ledger
/// registration, if any, was withdrawn.
#[derive(Debug, Clone, Serialize)]
pub struct UnwrittenEntity {
    /// Provider identifier of the source element.
    pub element: String,
    /// Element category.
    pub category: String,
    /// The record identifier.
    pub id: String,
    /// Why the write failed.
    pub reason: String,
}

/// What became of the model metadata record of a file.
#[derive(Debug, Clone)]
pub enum ModelStatus {
    /// Sealed and written to this path.
    Stored(PathBuf),
    /// Failed validation.
    Rejected(RejectionReport),
}

/// Result of processing one source file.
#[derive(Debug, Clone)]
pub struct FileReport {
    /// The source path.
    pub source: PathBuf,
    /// Terminal status.
    pub status: FileStatus,
    /// Accepted entities, in processing order.
    pub accepted: Vec<AcceptedEntity>,
    /// Rejected entities, in encounter order. Refusals by the ledger at
    /// registration time follow the processor's rejections.
    pub rejected: Vec<RejectedEntity>,
    /// Accepted entities whose outputs failed to be written.
    pub unwritten: Vec<UnwrittenEntity>,
    /// Model metadata outcome; `None` unless the file succeeded in model
    /// mode.
    pub model: Option<ModelStatus>,
}

impl FileReport {
    /// A report for a file that failed before any entity was examined.
    pub fn failed(source: impl Into<PathBuf>, status: FileStatus) -> Self {
        Self {
            source: source.into(),
            status,
            accepted: Vec::new(),
            rejected: Vec::new(),
            unwritten: Vec::new(),
            model: None,
        }
    }

    /// Recompute the status from the accepted set.
    pub fn settle(&mut self) {
        if matches!(self.status, FileStatus::Succeeded | FileStatus::EmptyResult) {
            self.status = if self.accepted.is_empty() {
                FileStatus::EmptyResult
            } else {
                FileStatus::Succeeded
            };
        }
    }
}

/// Validates, deduplicates and seals the elements of one model.
pub struct EntityProcessor<'a> {
    schema: &'a FieldSchema,
    categories: &'a [String],
    registry: &'a dyn IdentifierRegistry,
    mode: ProcessingMode,
}

impl<'a> EntityProcessor<'a> {
    /// A processor enumerating `categories` and consulting `registry`.
    pub fn new(
        schema: &'a FieldSchema,
        categories: &'a [String],
        registry: &'a dyn IdentifierRegistry,
    ) -> Self {
        Self {
            schema,
            categories,
            registry,
            mode: ProcessingMode::Model,
        }
    }

    /// Switch the processing mode.
    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }

    /// The elements to process, in processing order.
    fn select<'m, M: Model>(&self, model: &'m M) -> Vec<&'m M::Element> {
        match self.mode {
            ProcessingMode::Model => self
                .categories
                .iter()
                .flat_map(|category| model.elements_of_category(category))
                .collect(),
            ProcessingMode::Object => SINGLE_OBJECT_CATEGORIES
                .iter()
                .find_map(|category| model.elements_of_category(category).into_iter().next())
                .or_else(|| model.elements().into_iter().next())
                .into_iter()
                .collect(),
        }
    }

    /// Process the elements of `model`.
    ///
    /// `artifact_digest` is the digest of the source file, computed once
    /// and shared by every record sealed from it.
    pub fn process<M: Model>(
        &self,
        source: impl Into<PathBuf>,
        model: &M,
        artifact_digest: ContentDigest,
        mut ctx: RunContext,
    ) -> (RunContext, FileReport) {
        let mut report = FileReport::failed(source, FileStatus::EmptyResult);

        let extracted: Vec<(&M::Element, Result<ValidatedRecord, RejectionReport>)> = self
            .select(model)
            .into_iter()
            .map(|element| (element, extract_record(self.schema, element)))
            .collect();

        let ids: Vec<String> = extracted
            .iter()
            .filter_map(|(_, outcome)| outcome.as_ref().ok())
            .filter_map(|record| record.text(self.schema.identifier).map(str::to_string))
            .collect();
        let registered = if ids.is_empty() {
            BTreeSet::new()
        } else {
            match self.registry.registered(&ids) {
                Ok(found) => found,
                Err(err) => {
                    report.status = FileStatus::RegistryUnavailable(err.to_string());
                    report.rejected = extracted
                        .into_iter()
                        .filter_map(|(element, outcome)| outcome.err().map(|reasons| rejected(element, reasons)))
                        .collect();
                    return (ctx, report);
                }
            }
        };

        for (element, outcome) in extracted {
            let record = match outcome {
                Ok(record) => record,
                Err(reasons) => {
                    tracing::warn!(
                        element = element.identifier(),
                        category = element.category(),
                        reasons = %reasons,
                        "entity rejected"
                    );
                    report.rejected.push(rejected(element, reasons));
                    continue;
                }
            };
            let id = record
                .text(self.schema.identifier)
                .unwrap_or_default()
                .to_string();
            let origin = if ctx.accepted_ids.contains(&id) {
                Some(DuplicateOrigin::Run)
            } else if registered.contains(&id) {
                Some(DuplicateOrigin::Ledger)
            } else {
                None
            };
            if let Some(origin) = origin {
                tracing::warn!(element = element.identifier(), id = %id, %origin, "duplicate identifier");
                report.rejected.push(rejected(
                    element,
                    RejectionReport::single(Rejection::DuplicateIdentifier {
                        identifier: id,
                        origin,
                    }),
                ));
                continue;
            }

            match SealedRecord::seal(record, self.schema, artifact_digest) {
                Ok(sealed) => {
                    tracing::debug!(element = element.identifier(), id = %id, "entity accepted");
                    ctx.accepted_ids.insert(id);
                    report.accepted.push(AcceptedEntity {
                        element: element.identifier().to_string(),
                        category: element.category().to_string(),
                        record: sealed,
                    });
                }
                Err(err) => {
                    report.status = FileStatus::Failed(IngestError::from(err).to_string());
                    return (ctx, report);
                }
            }
        }

        report.settle();
        (ctx, report)
    }
}

fn rejected<E: Element>(element: &E, reasons: RejectionReport) -> RejectedEntity {
    RejectedEntity {
        element: element.identifier().to_string(),
        category: element.category().to_string(),
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::JsonModel;
    use crate::registry::InMemoryRegistry;
    use crate::error::RegistryError;
    use r9_schema::R9_OBJECT_SCHEMA;
    use serde_json::{json, Value};

    fn props(id: &str, status: &str) -> Value {
        json!({
            "NOM": "poutre IPE 200",
            "ID": id,
            "ID_maquette": "123456789123",
            "Longueur_m": 12.23,
            "Caracteristique_Materiau": "S355",
            "Materiau": "acier",
            "Statut usage": status,
            "Date de fabrication": "13 01 2001",
            "date mise en service": "13 01 2011",
            "Date de réemploye": "13 01 2025",
            "Empreinte Carbonne": 400
        })
    }

    fn model(elements: Vec<(&str, &str, Value)>) -> JsonModel {
        let elements: Vec<Value> = elements
            .into_iter()
            .map(|(id, cat, p)| json!({"id": id, "category": cat, "properties": p}))
            .collect();
        serde_json::from_value(json!({"elements": elements})).unwrap()
    }

    fn categories() -> Vec<String> {
        crate::model::DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect()
    }

    fn digest() -> ContentDigest {
        ContentDigest::from_bytes([5; 32])
    }

    #[test]
    fn single_valid_element_is_accepted() {
        let cats = categories();
        let registry = InMemoryRegistry::new();
        let processor = EntityProcessor::new(&R9_OBJECT_SCHEMA, &cats, &registry);
        let m = model(vec![("b1", "IfcBeam", props("1111111111111111", "réemployé"))]);
        let (ctx, report) = processor.process("m.json", &m, digest(), RunContext::new());
        assert_eq!(report.status, FileStatus::Succeeded);
        assert_eq!(report.accepted.len(), 1);
        assert!(report.rejected.is_empty());
        assert!(ctx.is_accepted("1111111111111111"));
        assert_eq!(report.accepted[0].record.artifact_digest(), digest());
    }

    #[test]
    fn second_claim_on_identifier_is_rejected() {
        let cats = categories();
        let registry = InMemoryRegistry::new();
        let processor = EntityProcessor::new(&R9_OBJECT_SCHEMA, &cats, &registry);
        let m = model(vec![
            ("b1", "IfcBeam", props("1111111111111111", "neuf")),
            ("b2", "IfcBeam", props("1111111111111111", "en usage")),
        ]);
        let (_, report) = processor.process("m.json", &m, digest(), RunContext::new());
        assert_eq!(report.accepted.len(), 1);
        assert_eq!(report.accepted[0].element, "b1");
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].element, "b2");
        assert_eq!(report.rejected[0].reasons.failures()[0].kind(), "duplicate_identifier");
    }

    #[test]
    fn category_order_decides_first_claim() {
        let cats = categories();
        let registry = InMemoryRegistry::new();
        let processor = EntityProcessor::new(&R9_OBJECT_SCHEMA, &cats, &registry);
        // IfcWall is enumerated before IfcBeam.
        let m = model(vec![
            ("b1", "IfcBeam", props("1111111111111111", "neuf")),
            ("w1", "IfcWall", props("1111111111111111", "neuf")),
        ]);
        let (_, report) = processor.process("m.json", &m, digest(), RunContext::new());
        assert_eq!(report.accepted[0].element, "w1");
    }

    #[test]
    fn uniqueness_spans_files_through_context() {
        let cats = categories();
        let registry = InMemoryRegistry::new();
        let processor = EntityProcessor::new(&R9_OBJECT_SCHEMA, &cats, &registry);
        let m = model(vec![("b1", "IfcBeam", props("1111111111111111", "neuf"))]);
        let (ctx, first) = processor.process("a.json", &m, digest(), RunContext::new());
        let (_, second) = processor.process("b.json", &m, digest(), ctx);
        assert_eq!(first.status, FileStatus::Succeeded);
        assert_eq!(second.status, FileStatus::EmptyResult);
        assert!(matches!(
            second.rejected[0].reasons.failures()[0],
            Rejection::DuplicateIdentifier { origin: DuplicateOrigin::Run, .. }
        ));
    }

    #[test]
    fn registered_identifier_is_rejected() {
        let cats = categories();
        let registry: InMemoryRegistry = ["1111111111111111"].into_iter().collect();
        let processor = EntityProcessor::new(&R9_OBJECT_SCHEMA, &cats, &registry);
        let m = model(vec![("b1", "IfcBeam", props("1111111111111111", "neuf"))]);
        let (ctx, report) = processor.process("m.json", &m, digest(), RunContext::new());
        assert_eq!(report.status, FileStatus::EmptyResult);
        assert!(!ctx.is_accepted("1111111111111111"));
        assert!(matches!(
            report.rejected[0].reasons.failures()[0],
            Rejection::DuplicateIdentifier { origin: DuplicateOrigin::Ledger, .. }
        ));
    }

    #[test]
    fn uncategorized_elements_are_ignored() {
        let cats = categories();
        let registry = InMemoryRegistry::new();
        let processor = EntityProcessor::new(&R9_OBJECT_SCHEMA, &cats, &registry);
        let m = model(vec![("s1", "IfcSpace", props("1111111111111111", "neuf"))]);
        let (_, report) = processor.process("m.json", &m, digest(), RunContext::new());
        assert_eq!(report.status, FileStatus::EmptyResult);
        assert!(report.rejected.is_empty());
    }

    #[test]
    fn registry_failure_fails_the_file_only() {
        struct Down;
        impl IdentifierRegistry for Down {
            fn registered(&self, _: &[String]) -> Result<BTreeSet<String>, RegistryError> {
                Err(RegistryError::Backend("unreachable".into()))
            }
        }
        let cats = categories();
        let processor = EntityProcessor::new(&R9_OBJECT_SCHEMA, &cats, &Down);
        let m = model(vec![("b1", "IfcBeam", props("1111111111111111", "neuf"))]);
        let (ctx, report) = processor.process("m.json", &m, digest(), RunContext::new());
        assert!(matches!(report.status, FileStatus::RegistryUnavailable(_)));
        assert!(report.accepted.is_empty());
        assert!(ctx.accepted_ids().is_empty());
    }

    #[test]
    fn rejections_keep_encounter_order() {
        let cats = categories();
        let registry = InMemoryRegistry::new();
        let processor = EntityProcessor::new(&R9_OBJECT_SCHEMA, &cats, &registry);
        let mut incomplete = props("3333333333333333", "neuf");
        incomplete.as_object_mut().unwrap().remove("Materiau");
        let m = model(vec![
            ("b1", "IfcBeam", props("1111111111111111", "neuf")),
            ("b2", "IfcBeam", props("1111111111111111", "neuf")),
            ("b3", "IfcBeam", incomplete),
        ]);
        let (_, report) = processor.process("m.json", &m, digest(), RunContext::new());
        let order: Vec<_> = report.rejected.iter().map(|r| r.element.as_str()).collect();
        assert_eq!(order, vec!["b2", "b3"]);
        assert_eq!(report.rejected[1].reasons.failures()[0].kind(), "missing_field");
    }

    #[test]
    fn object_mode_takes_first_preferred_element() {
        let cats = categories();
        let registry = InMemoryRegistry::new();
        let processor =
            EntityProcessor::new(&R9_OBJECT_SCHEMA, &cats, &registry).with_mode(ProcessingMode::Object);
        let m = model(vec![
            ("w1", "IfcWall", props("1111111111111111", "neuf")),
            ("b1", "IfcBeam", props("2222222222222222", "neuf")),
            ("p1", "IfcBuildingElementProxy", props("3333333333333333", "neuf")),
        ]);
        let (ctx, report) = processor.process("o.json", &m, digest(), RunContext::new());
        assert_eq!(report.status, FileStatus::Succeeded);
        assert_eq!(report.accepted.len(), 1);
        assert_eq!(report.accepted[0].element, "p1");
        assert!(report.rejected.is_empty());
        assert_eq!(ctx.accepted_ids().len(), 1);
    }

    #[test]
    fn object_mode_falls_back_to_first_element() {
        let cats = categories();
        let registry = InMemoryRegistry::new();
        let processor =
            EntityProcessor::new(&R9_OBJECT_SCHEMA, &cats, &registry).with_mode(ProcessingMode::Object);
        let m = model(vec![
            ("s1", "IfcSpace", props("1111111111111111", "neuf")),
            ("w1", "IfcWall", props("2222222222222222", "neuf")),
        ]);
        let (_, report) = processor.process("o.json", &m, digest(), RunContext::new());
        assert_eq!(report.accepted.len(), 1);
        assert_eq!(report.accepted[0].element, "s1");
        assert_eq!(report.accepted[0].category, "IfcSpace");

        let (_, empty) = processor.process("e.json", &model(vec![]), digest(), RunContext::new());
        assert_eq!(empty.status, FileStatus::EmptyResult);
        assert!(empty.rejected.is_empty());
    }

    #[test]
    fn object_mode_invalid_element_is_not_replaced() {
        let cats = categories();
        let registry = InMemoryRegistry::new();
        let processor =
            EntityProcessor::new(&R9_OBJECT_SCHEMA, &cats, &registry).with_mode(ProcessingMode::Object);
        let m = model(vec![
            ("b1", "IfcBeam", props("1111111111111111", "demoli")),
            ("b2", "IfcBeam", props("2222222222222222", "neuf")),
        ]);
        let (_, report) = processor.process("o.json", &m, digest(), RunContext::new());
        assert_eq!(report.status, FileStatus::EmptyResult);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].element, "b1");
    }

    #[test]
    fn release_forgets_an_identifier() {
        let cats = categories();
        let registry = InMemoryRegistry::new();
        let processor = EntityProcessor::new(&R9_OBJECT_SCHEMA, &cats, &registry);
        let m = model(vec![("b1", "IfcBeam", props("1111111111111111", "neuf"))]);
        let (mut ctx, _) = processor.process("a.json", &m, digest(), RunContext::new());
        assert!(ctx.release("1111111111111111"));
        assert!(!ctx.release("1111111111111111"));
        let (_, again) = processor.process("a.json", &m, digest(), ctx);
        assert_eq!(again.status, FileStatus::Succeeded);
    }

    #[test]
    fn record_file_updates_counters() {
        let mut ctx = RunContext::new();
        let mut report = FileReport::failed("x.json", FileStatus::EmptyResult);
        report.rejected.push(RejectedEntity {
            element: "e".into(),
            category: "IfcBeam".into(),
            reasons: RejectionReport::new(),
        });
        ctx.record_file(&report);
        assert_eq!(
            ctx.stats(),
            RunStats {
                files_succeeded: 0,
                files_failed: 1,
                accepted: 0,
                rejected: 1,
                unwritten: 0
            }
        );
    }
}
