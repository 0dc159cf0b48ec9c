//! End-to-end checks of extraction and sealing against the R9 object schema.

use std::collections::BTreeMap;

use r9_core::ContentDigest;
use r9_schema::{
    extract_record, DocumentContract, FieldError, RawValue, Rejection, SealedRecord,
    R9_OBJECT_SCHEMA, USAGE_STATUSES,
};

fn poutre_ipe_200() -> BTreeMap<String, Option<RawValue>> {
    serde_json::from_value(serde_json::json!({
        "NOM": "poutre IPE 200",
        "ID": "1111111111111111",
        "ID_maquette": "123456789123",
        "Longueur_m": 12.23,
        "Caracteristique_Materiau": "S355",
        "Materiau": "acier",
        "Statut usage": "réemployé",
        "Date de fabrication": "13 01 2001",
        "date mise en service": "13 01 2011",
        "Date de réemploye": "13 01 2025",
        "Empreinte Carbonne": 400,
        "GlobalId": "2O2Fr$t4X7Zf8NOew3FLOH"
    }))
    .unwrap()
}

#[test]
fn every_single_missing_field_is_reported_alone() {
    for field in R9_OBJECT_SCHEMA.field_names() {
        let mut element = poutre_ipe_200();
        element.remove(field);
        let report = extract_record(&R9_OBJECT_SCHEMA, &element).unwrap_err();
        assert_eq!(report.len(), 1, "{field}");
        match &report.failures()[0] {
            Rejection::Field(FieldError::Missing { field: f, .. }) => assert_eq!(f, field),
            other => panic!("expected missing {field}, got {other}"),
        }
    }
}

#[test]
fn null_counts_as_missing() {
    let mut element = poutre_ipe_200();
    element.insert("Materiau".into(), None);
    let report = extract_record(&R9_OBJECT_SCHEMA, &element).unwrap_err();
    assert_eq!(report.failures()[0].kind(), "missing_field");
}

#[test]
fn demolished_status_cites_allowed_set() {
    let mut element = poutre_ipe_200();
    element.insert("Statut usage".into(), Some("demoli".into()));
    let report = extract_record(&R9_OBJECT_SCHEMA, &element).unwrap_err();
    assert_eq!(report.len(), 1);
    let message = report.messages().remove(0);
    assert!(message.contains("demoli"), "{message}");
    for allowed in USAGE_STATUSES {
        assert!(message.contains(allowed), "{message}");
    }
}

#[test]
fn sealed_document_matches_contract_and_verifies() {
    let record = extract_record(&R9_OBJECT_SCHEMA, &poutre_ipe_200()).unwrap();
    let sealed = SealedRecord::seal(record, &R9_OBJECT_SCHEMA, ContentDigest::from_bytes([1; 32])).unwrap();
    let document = sealed.to_document();

    let contract = DocumentContract::new(&R9_OBJECT_SCHEMA).unwrap();
    contract.validate(&document).unwrap();

    let text = serde_json::to_string_pretty(&document).unwrap();
    let reread: serde_json::Value = serde_json::from_str(&text).unwrap();
    let verified = SealedRecord::verify_document(&R9_OBJECT_SCHEMA, &reread).unwrap();
    assert_eq!(verified.record_digest(), sealed.record_digest());
}

#[test]
fn sealing_is_reproducible() {
    let digest = ContentDigest::from_bytes([9; 32]);
    let a = SealedRecord::seal(
        extract_record(&R9_OBJECT_SCHEMA, &poutre_ipe_200()).unwrap(),
        &R9_OBJECT_SCHEMA,
        digest,
    )
    .unwrap();
    let b = SealedRecord::seal(
        extract_record(&R9_OBJECT_SCHEMA, &poutre_ipe_200()).unwrap(),
        &R9_OBJECT_SCHEMA,
        digest,
    )
    .unwrap();
    assert_eq!(a.record_digest(), b.record_digest());
    assert_eq!(a.record_digest().to_hex().len(), 64);
}
