//! # Output Store
//!
//! Filesystem layout for sealed R9 documents and their artifact copies:
//!
//! ```text
//! {base}/objets_json/{stem}.json
//! {base}/objets_ifc/{stem}.{ext}
//! {base}/maquettes/maquette_{name}_{ID_maquette}/{name}.json
//! {base}/maquettes/maquette_{name}_{ID_maquette}/{name}.{ext}   (ext != json)
//! {base}/maquettes/maquette_{name}_{ID_maquette}/{name}.source.json
//! {base}/r9_materials_index.json
//! ```
//!
//! ## Write Invariant
//!
//! Every file is written to a temporary sibling and renamed into place, so
//! a reader never observes a half-written document. Re-running over the
//! same input regenerates byte-identical files.
//!
//! ## Integrity
//!
//! [`OutputStore::verify_artifact`] recomputes the digest of a stored
//! artifact copy and compares it with the digest recorded in its document.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use r9_core::{ContentDigest, ModelId};
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::error::StoreError;
use crate::sha256::file_digest;

/// Keep only characters that are alphanumeric, `_` or `-`.
pub fn clean_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// File stem of an object document: `{ID}_{NOM}` with spaces turned into
/// underscores, then filtered to `[\w-]`.
pub fn object_stem(id: &str, nom: &str) -> Result<String, StoreError> {
    let stem = clean_name(&format!("{id}_{}", nom.replace(' ', "_")));
    if stem.is_empty() {
        return Err(StoreError::InvalidName(format!("{id}_{nom}")));
    }
    Ok(stem)
}

/// Paths of one stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// The sealed JSON document.
    pub document: PathBuf,
    /// The artifact copy.
    pub artifact: PathBuf,
}

/// Paths of one stored model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredModel {
    /// The model directory.
    pub dir: PathBuf,
    /// The sealed model document.
    pub document: PathBuf,
    /// The model artifact copy.
    pub artifact: PathBuf,
}

/// Output directory for sealed documents.
#[derive(Debug, Clone)]
pub struct OutputStore {
    base_dir: PathBuf,
}

impl OutputStore {
    /// Object documents.
    pub const OBJECTS_JSON: &'static str = "objets_json";
    /// Object artifact copies.
    pub const OBJECTS_ARTIFACTS: &'static str = "objets_ifc";
    /// Model directories.
    pub const MODELS: &'static str = "maquettes";
    /// Materials index file name.
    pub const INDEX_FILE: &'static str = "r9_materials_index.json";

    /// A store rooted at `base_dir`. Directories are created on first write.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// The root directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory holding object documents.
    pub fn objects_dir(&self) -> PathBuf {
        self.base_dir.join(Self::OBJECTS_JSON)
    }

    /// Directory holding object artifact copies.
    pub fn object_artifacts_dir(&self) -> PathBuf {
        self.base_dir.join(Self::OBJECTS_ARTIFACTS)
    }

    /// Path of the materials index.
    pub fn index_path(&self) -> PathBuf {
        self.base_dir.join(Self::INDEX_FILE)
    }

    /// Directory of one model.
    pub fn model_dir(&self, model_name: &str, model_id: &ModelId) -> Result<(PathBuf, String), StoreError> {
        let name = clean_name(model_name);
        if name.is_empty() {
            return Err(StoreError::InvalidName(model_name.to_string()));
        }
        let dir = self
            .base_dir
            .join(Self::MODELS)
            .join(format!("maquette_{name}_{model_id}"));
        Ok((dir, name))
    }

    /// Write an object document and its artifact copy.
    pub fn put_object(
        &self,
        stem: &str,
        document: &Value,
        artifact: &[u8],
        extension: &str,
    ) -> Result<StoredObject, StoreError> {
        let document_path = self.objects_dir().join(format!("{stem}.json"));
        let artifact_path = self
            .object_artifacts_dir()
            .join(format!("{stem}.{extension}"));
        let existed = artifact_path.exists();
        write_atomic(&artifact_path, artifact)?;
        if let Err(err) = write_json(&document_path, document) {
            // A copy without its document would be an orphan.
            if !existed {
                let _ = fs::remove_file(&artifact_path);
            }
            return Err(err);
        }
        tracing::debug!(document = %document_path.display(), "object stored");
        Ok(StoredObject {
            document: document_path,
            artifact: artifact_path,
        })
    }

    /// Write a model document and its artifact copy.
    pub fn put_model(
        &self,
        model_name: &str,
        model_id: &ModelId,
        document: &Value,
        artifact: &[u8],
        extension: &str,
    ) -> Result<StoredModel, StoreError> {
        let (dir, name) = self.model_dir(model_name, model_id)?;
        let document_path = dir.join(format!("{name}.json"));
        let artifact_path = dir.join(model_artifact_name(&name, extension));
        write_json(&document_path, document)?;
        write_atomic(&artifact_path, artifact)?;
        tracing::debug!(document = %document_path.display(), "model stored");
        Ok(StoredModel {
            dir,
            document: document_path,
            artifact: artifact_path,
        })
    }

    /// Write the materials index.
    pub fn put_index(&self, index: &Value) -> Result<PathBuf, StoreError> {
        let path = self.index_path();
        write_json(&path, index)?;
        Ok(path)
    }

    /// Stored object documents, sorted by path.
    pub fn list_objects(&self) -> Result<Vec<PathBuf>, StoreError> {
        let dir = self.objects_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut paths = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| StoreError::io(&dir, e))? {
            let path = entry.map_err(|e| StoreError::io(&dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Artifact copy stored next to an object document, whatever its
    /// extension.
    pub fn object_artifact(&self, stem: &str) -> Result<PathBuf, StoreError> {
        let dir = self.object_artifacts_dir();
        let missing = || StoreError::MissingArtifact {
            stem: stem.to_string(),
            dir: dir.clone(),
        };
        if !dir.exists() {
            return Err(missing());
        }
        let mut matches = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| StoreError::io(&dir, e))? {
            let path = entry.map_err(|e| StoreError::io(&dir, e))?.path();
            if path.file_stem().and_then(|s| s.to_str()) == Some(stem) {
                matches.push(path);
            }
        }
        matches.sort();
        matches.into_iter().next().ok_or_else(missing)
    }

    /// Check that an artifact still digests to the value recorded in its
    /// document under `field`.
    pub fn verify_artifact(
        &self,
        document_path: &Path,
        artifact_path: &Path,
        field: &str,
    ) -> Result<ContentDigest, StoreError> {
        let document = read_json(document_path)?;
        let stored = document
            .get(field)
            .and_then(Value::as_str)
            .and_then(|s| ContentDigest::from_hex(s).ok())
            .ok_or_else(|| StoreError::MissingDigest {
                path: document_path.to_path_buf(),
                field: field.to_string(),
            })?;
        let computed = file_digest(artifact_path).map_err(|e| StoreError::io(artifact_path, e))?;
        if computed != stored {
            return Err(StoreError::IntegrityViolation {
                path: artifact_path.to_path_buf(),
                field: field.to_string(),
                stored,
                computed,
            });
        }
        Ok(computed)
    }
}

/// File name of a model artifact copy. A JSON export would collide with the
/// model document, so it gets a `.source` infix.
fn model_artifact_name(name: &str, extension: &str) -> String {
    if extension.eq_ignore_ascii_case("json") {
        format!("{name}.source.{extension}")
    } else {
        format!("{name}.{extension}")
    }
}

/// Read and parse a JSON document.
pub fn read_json(path: &Path) -> Result<Value, StoreError> {
    let bytes = fs::read(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a JSON document as UTF-8 with two-space indentation.
pub fn write_json(path: &Path, value: &Value) -> Result<(), StoreError> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    bytes.push(b'\n');
    write_atomic(path, &bytes)
}

/// Write bytes through a temporary sibling file and rename into place.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}
