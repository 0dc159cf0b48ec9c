//! # Field Schemas
//!
//! Static, process-wide description of the R9 documents: which fields a
//! record carries, in which order they are extracted, how each is
//! validated, and under which property names the element-graph provider is
//! asked for them.
//!
//! Both schemas are `const` values. Nothing can mutate them during a run, so
//! every record validated in a process is checked against the same field set.
//!
//! ## Lookup keys
//!
//! Source data is inconsistently punctuated (`Statut usage` vs
//! `Statut_usage`) and older exports use legacy names (`Empreinte_Carbone`).
//! Each field lists its alternates explicitly; [`FieldSpec::lookup_keys`]
//! yields the source name, then the record name, then the alternates, in
//! that order. The probing rule is data, not string munging at lookup time.

use serde::Serialize;

/// The three usage statuses a component may carry (new, in use, reused).
pub const USAGE_STATUSES: &[&str] = &["neuf", "en usage", "réemployé"];

/// How a raw value is checked and normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    /// Exactly `n` ASCII decimal digits.
    FixedDigits(usize),
    /// Letters and whitespace only; everything else is stripped.
    LettersOnly,
    /// A finite decimal number.
    Decimal,
    /// Any text that is not blank.
    NonEmptyText,
    /// One of a fixed set of literals, compared case-insensitively.
    Enumerated(&'static [&'static str]),
    /// A `DD MM YYYY`-family calendar date.
    Date,
}

impl FormatKind {
    /// JSON type of the normalized value.
    pub fn value_type(&self) -> ValueType {
        match self {
            FormatKind::Decimal => ValueType::Number,
            _ => ValueType::Text,
        }
    }
}

/// JSON type of a normalized field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// A JSON string.
    Text,
    /// A JSON number.
    Number,
}

/// One required field of a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Key under which the normalized value is stored in the record.
    pub name: &'static str,
    /// Property name requested from the provider first.
    pub source_name: &'static str,
    /// Validation rule.
    pub format: FormatKind,
    /// Human-readable description, quoted in "missing" failures.
    pub description: &'static str,
    /// Ordered fallback property names.
    pub alternates: &'static [&'static str],
}

impl FieldSpec {
    /// Property names to try, in order, without repeats.
    pub fn lookup_keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::with_capacity(2 + self.alternates.len());
        for key in [self.source_name, self.name]
            .into_iter()
            .chain(self.alternates.iter().copied())
        {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }
}

/// Names of the two digest fields attached when a record is sealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestFields {
    /// Digest of the raw source artifact bytes.
    pub artifact: &'static str,
    /// Digest of the canonical record (including the artifact digest).
    pub record: &'static str,
}

/// An immutable, ordered set of required fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSchema {
    /// Schema name, used in logs and generated JSON Schemas.
    pub name: &'static str,
    /// Fields in extraction order.
    pub fields: &'static [FieldSpec],
    /// Field holding the record's unique identifier.
    pub identifier: &'static str,
    /// Digest field names.
    pub digests: DigestFields,
}

impl FieldSchema {
    /// Look up a field by record name.
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Number of substantive (non-digest) fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if the schema declares no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Record names of every field, in extraction order.
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    /// Every key a sealed document carries: the fields plus both digests.
    pub fn document_keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<&'static str> = self.field_names().collect();
        keys.push(self.digests.artifact);
        keys.push(self.digests.record);
        keys
    }
}

const fn field(
    name: &'static str,
    format: FormatKind,
    description: &'static str,
    alternates: &'static [&'static str],
) -> FieldSpec {
    FieldSpec {
        name,
        source_name: name,
        format,
        description,
        alternates,
    }
}

/// The eleven mandatory properties of one building component.
pub const R9_OBJECT_FIELDS: &[FieldSpec] = &[
    field("NOM", FormatKind::LettersOnly, "object name (letters only)", &[]),
    field("ID", FormatKind::FixedDigits(16), "16-digit object identifier", &[]),
    field(
        "ID_maquette",
        FormatKind::FixedDigits(12),
        "12-digit model identifier",
        &["ID maquette"],
    ),
    field("Longueur_m", FormatKind::Decimal, "length in metres", &["Longueur m"]),
    field(
        "Caracteristique_Materiau",
        FormatKind::NonEmptyText,
        "material characteristic (grade, class)",
        &["Caracteristique Materiau"],
    ),
    field("Materiau", FormatKind::NonEmptyText, "material type", &[]),
    field(
        "Statut usage",
        FormatKind::Enumerated(USAGE_STATUSES),
        "usage status (neuf / en usage / réemployé)",
        &["Statut_usage"],
    ),
    field(
        "Date de fabrication",
        FormatKind::Date,
        "manufacturing date (DD MM YYYY)",
        &["Date_de_fabrication", "Date_fabrication"],
    ),
    field(
        "date mise en service",
        FormatKind::Date,
        "commissioning date (DD MM YYYY)",
        &["date_mise_en_service", "Date_mise_en_service", "Date_mise_service"],
    ),
    field(
        "Date de réemploye",
        FormatKind::Date,
        "reuse date (DD MM YYYY)",
        &["Date_de_réemploye", "Date de reemploye", "Date_reemploi"],
    ),
    field(
        "Empreinte Carbonne",
        FormatKind::Decimal,
        "carbon footprint (kg CO2 equivalent)",
        &["Empreinte_Carbonne", "Empreinte_Carbone"],
    ),
];

/// Schema of one building component document.
pub const R9_OBJECT_SCHEMA: FieldSchema = FieldSchema {
    name: "r9-object",
    fields: R9_OBJECT_FIELDS,
    identifier: "ID",
    digests: DigestFields {
        artifact: "hash_ifc",
        record: "hash_json",
    },
};

/// The aggregate properties of one building model.
///
/// The two dates are requested under their configuration spelling
/// (`date_livraison`, `date_depot`) and stored under the document spelling.
pub const R9_MODEL_FIELDS: &[FieldSpec] = &[
    field("ID_maquette", FormatKind::FixedDigits(12), "12-digit model identifier", &["ID maquette"]),
    field("nom_maquette", FormatKind::NonEmptyText, "model name", &["nom maquette"]),
    field("nom_architecte", FormatKind::NonEmptyText, "architect name", &["nom architecte"]),
    field(
        "coordonnees_geographiques",
        FormatKind::NonEmptyText,
        "site coordinates (latitude, longitude)",
        &["coordonnees geographiques"],
    ),
    field("programme", FormatKind::NonEmptyText, "building programme", &[]),
    FieldSpec {
        name: "date livraison",
        source_name: "date_livraison",
        format: FormatKind::Date,
        description: "delivery date (DD MM YYYY)",
        alternates: &[],
    },
    FieldSpec {
        name: "date depot",
        source_name: "date_depot",
        format: FormatKind::Date,
        description: "deposit date (DD MM YYYY)",
        alternates: &[],
    },
];

/// Schema of one building model document.
pub const R9_MODEL_SCHEMA: FieldSchema = FieldSchema {
    name: "r9-model",
    fields: R9_MODEL_FIELDS,
    identifier: "ID_maquette",
    digests: DigestFields {
        artifact: "hash_maquette_ifc",
        record: "hash_maquette_json",
    },
};
