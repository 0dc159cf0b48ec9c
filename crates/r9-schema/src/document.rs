//! # Document Contract — JSON Schema for Persisted Records
//!
//! Generates a Draft 2020-12 JSON Schema from a [`FieldSchema`] and checks
//! persisted documents against it. The generated schema is what downstream
//! consumers validate against: exact field set, per-field JSON types,
//! identifier patterns, the usage-status enumeration and 64-hex digests.
//!
//! The contract checks shape only. Digest recomputation lives in
//! [`SealedRecord::verify_document`](crate::seal::SealedRecord::verify_document).

use std::fmt;

use jsonschema::Validator;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::field::{FieldSchema, FormatKind};

/// Error from building or applying a document contract.
#[derive(Error, Debug)]
pub enum ContractError {
    /// The generated schema did not compile.
    #[error("failed to build validator for '{schema_name}': {reason}")]
    ValidatorBuildError {
        /// Schema name.
        schema_name: String,
        /// Compiler message.
        reason: String,
    },

    /// The document violates the contract.
    #[error("document violates '{schema_name}' ({} violation(s)):\n{violations}", violations.len())]
    ValidationFailed {
        /// Schema name.
        schema_name: String,
        /// Every violation found.
        violations: ValidationViolations,
    },
}

/// A single violation with structured context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// JSON Pointer path to the violating field in the instance.
    pub instance_path: String,
    /// JSON Pointer path within the schema that triggered the error.
    pub schema_path: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "  (root): {}", self.message)
        } else {
            write!(f, "  {}: {}", self.instance_path, self.message)
        }
    }
}

/// Collection of contract violations.
#[derive(Debug, Clone)]
pub struct ValidationViolations {
    violations: Vec<Violation>,
}

impl ValidationViolations {
    /// Number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// True if there are no violations.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// All violations.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

const DIGEST_PATTERN: &str = "^[0-9a-f]{64}$";

fn property_schema(format: &FormatKind, description: &str) -> Value {
    let mut prop = match format {
        FormatKind::FixedDigits(n) => json!({"type": "string", "pattern": format!("^[0-9]{{{n}}}$")}),
        FormatKind::LettersOnly => json!({"type": "string", "minLength": 1}),
        FormatKind::Decimal => json!({"type": "number"}),
        FormatKind::NonEmptyText => json!({"type": "string", "pattern": "\\S"}),
        FormatKind::Enumerated(allowed) => json!({"type": "string", "enum": allowed}),
        FormatKind::Date => json!({"type": "string", "pattern": "^[0-9]+ [0-9]+ [0-9]+$"}),
    };
    prop["description"] = Value::String(description.to_string());
    prop
}

/// The Draft 2020-12 JSON Schema describing sealed documents of `schema`.
pub fn document_schema(schema: &FieldSchema) -> Value {
    let mut properties = Map::new();
    for spec in schema.fields {
        properties.insert(spec.name.to_string(), property_schema(&spec.format, spec.description));
    }
    properties.insert(
        schema.digests.artifact.to_string(),
        json!({"type": "string", "pattern": DIGEST_PATTERN, "description": "SHA-256 of the source artifact bytes"}),
    );
    properties.insert(
        schema.digests.record.to_string(),
        json!({"type": "string", "pattern": DIGEST_PATTERN, "description": "SHA-256 of the canonical record, artifact digest included"}),
    );

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": format!("urn:r9:schema:{}", schema.name),
        "title": schema.name,
        "type": "object",
        "required": schema.document_keys(),
        "properties": properties,
        "additionalProperties": false,
    })
}

/// A compiled contract for one field schema.
pub struct DocumentContract {
    schema_name: &'static str,
    validator: Validator,
}

impl DocumentContract {
    /// Compile the contract for `schema`.
    pub fn new(schema: &FieldSchema) -> Result<Self, ContractError> {
        let mut opts = jsonschema::options();
        opts.with_draft(jsonschema::Draft::Draft202012);
        let validator = opts
            .build(&document_schema(schema))
            .map_err(|e| ContractError::ValidatorBuildError {
                schema_name: schema.name.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            schema_name: schema.name,
            validator,
        })
    }

    /// Check a document's shape.
    pub fn validate(&self, instance: &Value) -> Result<(), ContractError> {
        let violations: Vec<Violation> = self
            .validator
            .iter_errors(instance)
            .map(|e| Violation {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ContractError::ValidationFailed {
                schema_name: self.schema_name.to_string(),
                violations: ValidationViolations { violations },
            })
        }
    }
}

impl fmt::Debug for DocumentContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentContract")
            .field("schema_name", &self.schema_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{R9_MODEL_SCHEMA, R9_OBJECT_SCHEMA};

    fn valid_object() -> Value {
        json!({
            "NOM": "poutre IPE",
            "ID": "1111111111111111",
            "ID_maquette": "123456789123",
            "Longueur_m": 12.23,
            "Caracteristique_Materiau": "S355",
            "Materiau": "acier",
            "Statut usage": "réemployé",
            "Date de fabrication": "13 01 2001",
            "date mise en service": "13 01 2011",
            "Date de réemploye": "13 01 2025",
            "Empreinte Carbonne": 400.0,
            "hash_ifc": "ab".repeat(32),
            "hash_json": "cd".repeat(32),
        })
    }

    #[test]
    fn generated_schema_lists_every_key() {
        let schema = document_schema(&R9_OBJECT_SCHEMA);
        assert_eq!(schema["required"].as_array().unwrap().len(), 13);
        assert_eq!(schema["properties"]["ID"]["pattern"], "^[0-9]{16}$");
        assert_eq!(schema["properties"]["Longueur_m"]["type"], "number");
        assert_eq!(schema["additionalProperties"], false);
    }

    #[test]
    fn valid_document_passes() {
        let contract = DocumentContract::new(&R9_OBJECT_SCHEMA).unwrap();
        contract.validate(&valid_object()).unwrap();
    }

    #[test]
    fn wrong_types_and_extra_keys_fail() {
        let contract = DocumentContract::new(&R9_OBJECT_SCHEMA).unwrap();
        let mut doc = valid_object();
        doc["Longueur_m"] = json!("12.23");
        doc["ID"] = json!("123");
        doc["extra"] = json!(true);
        match contract.validate(&doc) {
            Err(ContractError::ValidationFailed { violations, .. }) => {
                assert!(violations.len() >= 3, "{violations}");
                let paths: Vec<_> = violations
                    .violations()
                    .iter()
                    .map(|v| v.instance_path.as_str())
                    .collect();
                assert!(paths.contains(&"/Longueur_m"));
                assert!(paths.contains(&"/ID"));
            }
            other => panic!("expected violations, got {other:?}"),
        }
    }

    #[test]
    fn unknown_status_fails() {
        let contract = DocumentContract::new(&R9_OBJECT_SCHEMA).unwrap();
        let mut doc = valid_object();
        doc["Statut usage"] = json!("demoli");
        assert!(contract.validate(&doc).is_err());
    }

    #[test]
    fn uppercase_digest_fails() {
        let contract = DocumentContract::new(&R9_OBJECT_SCHEMA).unwrap();
        let mut doc = valid_object();
        doc["hash_json"] = json!("CD".repeat(32));
        assert!(contract.validate(&doc).is_err());
    }

    #[test]
    fn model_contract_compiles() {
        let schema = document_schema(&R9_MODEL_SCHEMA);
        assert!(schema["properties"].get("hash_maquette_json").is_some());
        assert!(DocumentContract::new(&R9_MODEL_SCHEMA).is_ok());
    }
}
