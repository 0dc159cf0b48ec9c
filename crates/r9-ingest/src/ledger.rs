//! # Ledger Staging
//!
//! The ledger collaborator receives one [`LedgerRegistration`] per
//! accepted object and refuses a second registration of the same
//! identifier. Quantities are submitted as integers: length in
//! millimetres and carbon footprint in hundredths, both rounded to the
//! nearest sub-unit (halves away from zero), so `0.29` becomes `29` and
//! not the `28` its binary representation would truncate to.
//!
//! A registration whose outputs could not be written is taken back with
//! [`Ledger::withdraw`].
//!
//! [`FileLedger`] stages registrations in a JSON file (a sorted array)
//! rewritten atomically after each registration or withdrawal. Both ledgers also serve
//! as an [`IdentifierRegistry`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use r9_core::ContentDigest;
use r9_schema::SealedRecord;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, RegistryError};
use crate::registry::IdentifierRegistry;

/// What the ledger records for one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRegistration {
    /// 16-digit object identifier.
    pub id: String,
    /// Object name.
    pub name: String,
    /// Material type.
    pub material_type: String,
    /// Usage status.
    pub status: String,
    /// Length in millimetres.
    pub length_mm: i64,
    /// Carbon footprint in hundredths.
    pub carbon_centi: i64,
    /// Record digest.
    pub hash_json: ContentDigest,
    /// Artifact digest.
    pub hash_ifc: ContentDigest,
}

impl LedgerRegistration {
    /// Build the registration for a sealed object record.
    pub fn from_sealed(record: &SealedRecord) -> Result<Self, LedgerError> {
        let text = |field: &'static str| {
            record
                .text(field)
                .map(str::to_string)
                .ok_or(LedgerError::Incomplete { field })
        };
        let number = |field: &'static str| record.number(field).ok_or(LedgerError::Incomplete { field });
        Ok(Self {
            id: text("ID")?,
            name: text("NOM")?,
            material_type: text("Materiau")?,
            status: text("Statut usage")?,
            length_mm: scaled(number("Longueur_m")?, 1000.0),
            carbon_centi: scaled(number("Empreinte Carbonne")?, 100.0),
            hash_json: record.record_digest(),
            hash_ifc: record.artifact_digest(),
        })
    }
}

/// `round(value * factor)`, saturating at the `i64` range.
fn scaled(value: f64, factor: f64) -> i64 {
    (value * factor).round() as i64
}

/// Accepts registrations, refusing duplicates.
pub trait Ledger {
    /// Register one object atomically.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Duplicate`] if the identifier is already registered;
    /// other variants if the ledger itself failed.
    fn register(&mut self, registration: LedgerRegistration) -> Result<(), LedgerError>;

    /// Take back the registration of `id`. Unknown identifiers are a no-op.
    fn withdraw(&mut self, id: &str) -> Result<(), LedgerError>;
}

/// A ledger held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    entries: BTreeMap<String, LedgerRegistration>,
}

impl InMemoryLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registration of `id`, if any.
    pub fn get(&self, id: &str) -> Option<&LedgerRegistration> {
        self.entries.get(id)
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, registration: LedgerRegistration) -> Result<(), LedgerError> {
        if self.entries.contains_key(&registration.id) {
            return Err(LedgerError::Duplicate {
                id: registration.id,
            });
        }
        self.entries.insert(registration.id.clone(), registration);
        Ok(())
    }
}

impl Ledger for InMemoryLedger {
    fn register(&mut self, registration: LedgerRegistration) -> Result<(), LedgerError> {
        self.insert(registration)
    }

    fn withdraw(&mut self, id: &str) -> Result<(), LedgerError> {
        self.entries.remove(id);
        Ok(())
    }
}

impl IdentifierRegistry for InMemoryLedger {
    fn registered(&self, candidates: &[String]) -> Result<BTreeSet<String>, RegistryError> {
        Ok(candidates
            .iter()
            .filter(|id| self.entries.contains_key(*id))
            .cloned()
            .collect())
    }
}

/// A ledger staged in a JSON file.
#[derive(Debug, Clone)]
pub struct FileLedger {
    path: PathBuf,
    inner: InMemoryLedger,
}

impl FileLedger {
    /// Open the staging file, starting empty if it does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        let mut inner = InMemoryLedger::new();
        if path.exists() {
            let value = r9_crypto::read_json(&path)?;
            let entries: Vec<LedgerRegistration> =
                serde_json::from_value(value).map_err(|source| LedgerError::Malformed {
                    path: path.clone(),
                    source,
                })?;
            for entry in entries {
                inner.insert(entry)?;
            }
        }
        Ok(Self { path, inner })
    }

    /// Path of the staging file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Registrations, by identifier.
    pub fn entries(&self) -> impl Iterator<Item = &LedgerRegistration> {
        self.inner.entries.values()
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn flush(&self) -> Result<(), LedgerError> {
        let entries: Vec<&LedgerRegistration> = self.entries().collect();
        let value = serde_json::to_value(entries).map_err(|source| LedgerError::Malformed {
            path: self.path.clone(),
            source,
        })?;
        r9_crypto::write_json(&self.path, &value)?;
        Ok(())
    }
}

impl Ledger for FileLedger {
    fn register(&mut self, registration: LedgerRegistration) -> Result<(), LedgerError> {
        let id = registration.id.clone();
        self.inner.insert(registration)?;
        if let Err(err) = self.flush() {
            self.inner.entries.remove(&id);
            return Err(err);
        }
        tracing::debug!(id = %id, path = %self.path.display(), "registration staged");
        Ok(())
    }

    fn withdraw(&mut self, id: &str) -> Result<(), LedgerError> {
        let Some(removed) = self.inner.entries.remove(id) else {
            return Ok(());
        };
        if let Err(err) = self.flush() {
            self.inner.entries.insert(removed.id.clone(), removed);
            return Err(err);
        }
        tracing::debug!(id = %id, path = %self.path.display(), "registration withdrawn");
        Ok(())
    }
}

impl IdentifierRegistry for FileLedger {
    fn registered(&self, candidates: &[String]) -> Result<BTreeSet<String>, RegistryError> {
        self.inner.registered(candidates)
    }
}
