//! Model metadata: the aggregate record describing one source file.
//!
//! Descriptive fields (name, architect, coordinates, programme, dates) come
//! from [`ModelInputs`]; `ID_maquette` is located model-wide through
//! [`Model::find_property`]. The record is validated against
//! `R9_MODEL_SCHEMA` and sealed like an object record.

use std::collections::BTreeMap;

use r9_core::{CalendarDate, ContentDigest};
use r9_schema::{
    extract_record, PropertySource, RawValue, RejectionReport, SealedRecord, R9_MODEL_SCHEMA,
};
use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::model::Model;

/// Operator-supplied model description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelInputs {
    /// Model name.
    pub nom_maquette: Option<String>,
    /// Architect name.
    pub nom_architecte: Option<String>,
    /// Site coordinates, `latitude, longitude`.
    pub coordonnees_geographiques: Option<String>,
    /// Building programme.
    pub programme: Option<String>,
    /// Delivery date, `DD MM YYYY`.
    pub date_livraison: Option<String>,
    /// Deposit date, `DD MM YYYY`. Defaults to today.
    pub date_depot: Option<String>,
}

impl ModelInputs {
    /// The inputs as raw properties, filling `date_depot` with today's
    /// local date when unset.
    pub fn to_properties(&self) -> BTreeMap<String, RawValue> {
        let date_depot = self
            .date_depot
            .clone()
            .unwrap_or_else(|| CalendarDate::today().canonical());
        [
            ("nom_maquette", self.nom_maquette.clone()),
            ("nom_architecte", self.nom_architecte.clone()),
            ("coordonnees_geographiques", self.coordonnees_geographiques.clone()),
            ("programme", self.programme.clone()),
            ("date_livraison", self.date_livraison.clone()),
            ("date_depot", Some(date_depot)),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k.to_string(), RawValue::Text(v))))
        .collect()
    }

    /// Overlay non-empty values from `other`.
    pub fn merge(&mut self, other: ModelInputs) {
        let ModelInputs {
            nom_maquette,
            nom_architecte,
            coordonnees_geographiques,
            programme,
            date_livraison,
            date_depot,
        } = other;
        for (slot, value) in [
            (&mut self.nom_maquette, nom_maquette),
            (&mut self.nom_architecte, nom_architecte),
            (&mut self.coordonnees_geographiques, coordonnees_geographiques),
            (&mut self.programme, programme),
            (&mut self.date_livraison, date_livraison),
            (&mut self.date_depot, date_depot),
        ] {
            if value.is_some() {
                *slot = value;
            }
        }
    }
}

/// Inputs first, then a model-wide search.
struct ModelSource<'a, M: Model> {
    inputs: BTreeMap<String, RawValue>,
    model: &'a M,
}

impl<M: Model> PropertySource for ModelSource<'_, M> {
    fn property(&self, name: &str) -> Option<RawValue> {
        self.inputs
            .get(name)
            .cloned()
            .or_else(|| self.model.find_property(name))
    }
}

/// Outcome of building the model metadata.
pub type ModelOutcome = Result<SealedRecord, RejectionReport>;

/// Validate and seal the metadata record of `model`.
pub fn build_model_metadata<M: Model>(
    inputs: &ModelInputs,
    model: &M,
    artifact_digest: ContentDigest,
) -> Result<ModelOutcome, IngestError> {
    let source = ModelSource {
        inputs: inputs.to_properties(),
        model,
    };
    match extract_record(&R9_MODEL_SCHEMA, &source) {
        Ok(record) => Ok(Ok(SealedRecord::seal(record, &R9_MODEL_SCHEMA, artifact_digest)?)),
        Err(report) => Ok(Err(report)),
    }
}
