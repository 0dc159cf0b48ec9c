//! # Element-Graph Provider
//!
//! The seam between the pipeline and whatever reads BIM files. A provider
//! opens a source path into a [`Model`]; a model enumerates its
//! [`Element`]s by category and can search for a property model-wide.
//! Nothing downstream of this module knows the native file format.
//!
//! [`JsonModelProvider`] reads JSON property-bag exports:
//!
//! ```json
//! {
//!   "schema": "IFC4",
//!   "properties": { "ID_maquette": "123456789123" },
//!   "elements": [
//!     { "id": "2O2Fr$t4X7Zf8NOew3FLOH", "category": "IfcBeam",
//!       "properties": { "NOM": "poutre IPE 200", "...": "..." } }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use r9_schema::{PropertySource, RawValue};
use serde::Deserialize;

use crate::error::IngestError;

/// Element categories enumerated by default, in enumeration order.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "IfcProxy",
    "IfcWall",
    "IfcSlab",
    "IfcBeam",
    "IfcColumn",
    "IfcDoor",
    "IfcWindow",
    "IfcRoof",
    "IfcStair",
    "IfcRailing",
    "IfcBuildingElementProxy",
    "IfcFurnishingElement",
    "IfcPlate",
    "IfcMember",
];

/// Categories searched, in order, for the element of a single-object file.
pub const SINGLE_OBJECT_CATEGORIES: &[&str] = &[
    "IfcProxy",
    "IfcBuildingElementProxy",
    "IfcBeam",
    "IfcColumn",
];

/// A property-bearing node of a model.
pub trait Element: PropertySource {
    /// The provider's identifier for the element (not the R9 `ID`).
    fn identifier(&self) -> &str;

    /// The element's category, e.g. `IfcBeam`.
    fn category(&self) -> &str;
}

/// An opened source file.
pub trait Model {
    /// Element type.
    type Element: Element;

    /// Elements of one category, in encounter order.
    fn elements_of_category(&self, category: &str) -> Vec<&Self::Element>;

    /// Every element, in encounter order.
    fn elements(&self) -> Vec<&Self::Element>;

    /// First value of `name` found anywhere in the model.
    fn find_property(&self, name: &str) -> Option<RawValue>;
}

/// Opens source files.
pub trait ModelProvider {
    /// Model type.
    type Model: Model;

    /// Open and parse `path`.
    ///
    /// # Errors
    ///
    /// [`IngestError::SourceUnreadable`] if the file cannot be read or is
    /// not in the provider's format.
    fn open(&self, path: &Path) -> Result<Self::Model, IngestError>;
}

/// One element of a JSON property-bag export.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonElement {
    id: String,
    category: String,
    #[serde(default)]
    properties: BTreeMap<String, Option<RawValue>>,
}

impl PropertySource for JsonElement {
    fn property(&self, name: &str) -> Option<RawValue> {
        self.properties.property(name)
    }
}

impl Element for JsonElement {
    fn identifier(&self) -> &str {
        &self.id
    }

    fn category(&self) -> &str {
        &self.category
    }
}

/// A JSON property-bag export.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonModel {
    #[serde(default)]
    schema: Option<String>,
    #[serde(default)]
    properties: BTreeMap<String, Option<RawValue>>,
    #[serde(default)]
    elements: Vec<JsonElement>,
}

impl JsonModel {
    /// Parse an export from bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Declared schema of the source, e.g. `IFC4`.
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True if the export has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl Model for JsonModel {
    type Element = JsonElement;

    fn elements_of_category(&self, category: &str) -> Vec<&JsonElement> {
        self.elements
            .iter()
            .filter(|e| e.category == category)
            .collect()
    }

    fn elements(&self) -> Vec<&JsonElement> {
        self.elements.iter().collect()
    }

    fn find_property(&self, name: &str) -> Option<RawValue> {
        self.properties
            .property(name)
            .or_else(|| self.elements.iter().find_map(|e| e.property(name)))
    }
}

/// Reads [`JsonModel`]s from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonModelProvider;

impl ModelProvider for JsonModelProvider {
    type Model = JsonModel;

    fn open(&self, path: &Path) -> Result<JsonModel, IngestError> {
        let unreadable = |reason: String| IngestError::SourceUnreadable {
            path: path.to_path_buf(),
            reason,
        };
        let bytes = std::fs::read(path).map_err(|e| unreadable(e.to_string()))?;
        JsonModel::from_slice(&bytes).map_err(|e| unreadable(e.to_string()))
    }
}
