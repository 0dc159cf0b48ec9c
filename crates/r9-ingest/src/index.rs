//! # Materials Index
//!
//! A summary of every accepted object, persisted as
//! `r9_materials_index.json` (an array sorted by `ID`) and searchable by
//! field. Re-indexing an identifier replaces its entry.
//!
//! ## Search filters
//!
//! A filter is `field=value`. On the numeric fields (`Longueur_m`,
//! `Empreinte Carbonne`) the value is `>x`, `<x` or an exact number. On
//! text fields it is a case-insensitive substring. Filters on fields the
//! index does not carry are ignored.

use std::collections::BTreeMap;

use r9_core::ContentDigest;
use r9_schema::SealedRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One object in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Object identifier.
    #[serde(rename = "ID")]
    pub id: String,
    /// Object name.
    #[serde(rename = "NOM")]
    pub nom: String,
    /// Material type.
    #[serde(rename = "Materiau")]
    pub materiau: String,
    /// Material characteristic.
    #[serde(rename = "Caracteristique_Materiau")]
    pub caracteristique_materiau: String,
    /// Length in metres.
    #[serde(rename = "Longueur_m")]
    pub longueur_m: f64,
    /// Usage status.
    #[serde(rename = "Statut usage")]
    pub statut_usage: String,
    /// Carbon footprint.
    #[serde(rename = "Empreinte Carbonne")]
    pub empreinte_carbonne: f64,
    /// Record digest.
    pub hash_json: ContentDigest,
    /// Artifact digest.
    pub hash_ifc: ContentDigest,
}

impl IndexEntry {
    /// Summarize a sealed object record. `None` if a summary field is absent.
    pub fn from_sealed(record: &SealedRecord) -> Option<Self> {
        let text = |f: &str| record.text(f).map(str::to_string);
        Some(Self {
            id: text("ID")?,
            nom: text("NOM")?,
            materiau: text("Materiau")?,
            caracteristique_materiau: text("Caracteristique_Materiau")?,
            longueur_m: record.number("Longueur_m")?,
            statut_usage: text("Statut usage")?,
            empreinte_carbonne: record.number("Empreinte Carbonne")?,
            hash_json: record.record_digest(),
            hash_ifc: record.artifact_digest(),
        })
    }

    fn text_field(&self, field: &str) -> Option<&str> {
        match field {
            "ID" => Some(&self.id),
            "NOM" => Some(&self.nom),
            "Materiau" => Some(&self.materiau),
            "Caracteristique_Materiau" => Some(&self.caracteristique_materiau),
            "Statut usage" => Some(&self.statut_usage),
            _ => None,
        }
    }

    fn numeric_field(&self, field: &str) -> Option<f64> {
        match field {
            "Longueur_m" => Some(self.longueur_m),
            "Empreinte Carbonne" => Some(self.empreinte_carbonne),
            _ => None,
        }
    }
}

/// A search filter could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// No `=` separating field and value.
    #[error("filter {0:?} is not of the form field=value")]
    Syntax(String),

    /// A numeric field was given a non-numeric bound.
    #[error("filter on {field} needs a number, got {value:?}")]
    NotANumber {
        /// Filtered field.
        field: String,
        /// Offending value.
        value: String,
    },
}

/// Comparison on a numeric field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericOp {
    /// Strictly greater.
    Above(f64),
    /// Strictly less.
    Below(f64),
    /// Equal.
    Exactly(f64),
}

/// One parsed search filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Numeric comparison.
    Numeric {
        /// Field name.
        field: String,
        /// Comparison.
        op: NumericOp,
    },
    /// Case-insensitive substring.
    Text {
        /// Field name.
        field: String,
        /// Lowercased needle.
        needle: String,
    },
}

const NUMERIC_FIELDS: &[&str] = &["Longueur_m", "Empreinte Carbonne"];
const TEXT_FIELDS: &[&str] = &["ID", "NOM", "Materiau", "Caracteristique_Materiau", "Statut usage"];

impl Filter {
    /// Parse `field=value`. Unknown fields yield `Ok(None)`.
    pub fn parse(expr: &str) -> Result<Option<Self>, FilterError> {
        let (field, value) = expr
            .split_once('=')
            .ok_or_else(|| FilterError::Syntax(expr.to_string()))?;
        let field = field.trim();
        let value = value.trim();

        if NUMERIC_FIELDS.contains(&field) {
            let not_a_number = || FilterError::NotANumber {
                field: field.to_string(),
                value: value.to_string(),
            };
            let parse = |s: &str| s.trim().parse::<f64>().map_err(|_| not_a_number());
            let op = if let Some(rest) = value.strip_prefix('>') {
                NumericOp::Above(parse(rest)?)
            } else if let Some(rest) = value.strip_prefix('<') {
                NumericOp::Below(parse(rest)?)
            } else {
                NumericOp::Exactly(parse(value)?)
            };
            return Ok(Some(Filter::Numeric {
                field: field.to_string(),
                op,
            }));
        }
        if TEXT_FIELDS.contains(&field) {
            return Ok(Some(Filter::Text {
                field: field.to_string(),
                needle: value.to_lowercase(),
            }));
        }
        tracing::debug!(field, "ignoring filter on unindexed field");
        Ok(None)
    }

    /// True if `entry` satisfies the filter.
    pub fn matches(&self, entry: &IndexEntry) -> bool {
        match self {
            Filter::Numeric { field, op } => match entry.numeric_field(field) {
                Some(x) => match op {
                    NumericOp::Above(bound) => x > *bound,
                    NumericOp::Below(bound) => x < *bound,
                    NumericOp::Exactly(v) => x == *v,
                },
                None => false,
            },
            Filter::Text { field, needle } => entry
                .text_field(field)
                .is_some_and(|s| s.to_lowercase().contains(needle.as_str())),
        }
    }
}

/// The materials index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialIndex {
    entries: BTreeMap<String, IndexEntry>,
}

impl MaterialIndex {
    /// An empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a persisted JSON array.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let entries: Vec<IndexEntry> = serde_json::from_value(value)?;
        Ok(entries.into_iter().collect())
    }

    /// The persisted form: a JSON array sorted by `ID`.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self.entries.values().collect::<Vec<_>>())
    }

    /// Add or replace an entry.
    pub fn upsert(&mut self, entry: IndexEntry) {
        self.entries.insert(entry.id.clone(), entry);
    }

    /// Entries, sorted by `ID`.
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries satisfying every filter.
    pub fn search<'a>(&'a self, filters: &'a [Filter]) -> impl Iterator<Item = &'a IndexEntry> + 'a {
        self.entries
            .values()
            .filter(move |entry| filters.iter().all(|f| f.matches(entry)))
    }
}

impl FromIterator<IndexEntry> for MaterialIndex {
    fn from_iter<I: IntoIterator<Item = IndexEntry>>(iter: I) -> Self {
        let mut index = Self::new();
        for entry in iter {
            index.upsert(entry);
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, nom: &str, materiau: &str, longueur: f64, carbone: f64) -> IndexEntry {
        IndexEntry {
            id: id.into(),
            nom: nom.into(),
            materiau: materiau.into(),
            caracteristique_materiau: "S355".into(),
            longueur_m: longueur,
            statut_usage: "neuf".into(),
            empreinte_carbonne: carbone,
            hash_json: ContentDigest::from_bytes([1; 32]),
            hash_ifc: ContentDigest::from_bytes([2; 32]),
        }
    }

    fn index() -> MaterialIndex {
        [
            entry("1111111111111111", "poutre IPE", "acier", 12.23, 400.0),
            entry("2222222222222222", "poteau", "Béton", 3.0, 900.0),
            entry("3333333333333333", "solive", "bois", 4.5, 20.0),
        ]
        .into_iter()
        .collect()
    }

    fn search(filters: &[&str]) -> Vec<String> {
        let filters: Vec<Filter> = filters
            .iter()
            .filter_map(|f| Filter::parse(f).unwrap())
            .collect();
        index().search(&filters).map(|e| e.id.clone()).collect()
    }

    #[test]
    fn numeric_bounds_and_exact() {
        assert_eq!(search(&["Longueur_m=>4"]), vec!["1111111111111111", "3333333333333333"]);
        assert_eq!(search(&["Empreinte Carbonne=<100"]), vec!["3333333333333333"]);
        assert_eq!(search(&["Longueur_m=3"]), vec!["2222222222222222"]);
    }

    #[test]
    fn text_is_case_insensitive_substring() {
        assert_eq!(search(&["Materiau=BÉT"]), vec!["2222222222222222"]);
        assert_eq!(search(&["NOM=ipe"]), vec!["1111111111111111"]);
    }

    #[test]
    fn filters_combine_and_unknown_fields_are_ignored() {
        assert_eq!(search(&["Longueur_m=>4", "Materiau=bois", "couleur=rouge"]), vec!["3333333333333333"]);
        assert_eq!(search(&[]).len(), 3);
    }

    #[test]
    fn bad_filters() {
        assert!(matches!(Filter::parse("Longueur_m"), Err(FilterError::Syntax(_))));
        assert!(matches!(Filter::parse("Longueur_m=>long"), Err(FilterError::NotANumber { .. })));
    }

    #[test]
    fn json_round_trip_keeps_r9_field_names() {
        let idx = index();
        let json = idx.to_json().unwrap();
        assert_eq!(json[0]["ID"], "1111111111111111");
        assert_eq!(json[0]["Empreinte Carbonne"], 400.0);
        assert_eq!(MaterialIndex::from_json(json).unwrap(), idx);
    }

    #[test]
    fn upsert_replaces() {
        let mut idx = index();
        idx.upsert(entry("1111111111111111", "poutre HEA", "acier", 6.0, 200.0));
        assert_eq!(idx.len(), 3);
        assert_eq!(idx.entries().next().unwrap().nom, "poutre HEA");
    }
}
