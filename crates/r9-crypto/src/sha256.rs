//! # Artifact Digests
//!
//! SHA-256 over raw source file bytes, stored as `hash_ifc` /
//! `hash_maquette_ifc`. Kept apart from the record digest path
//! (`r9_core::sha256_digest`, canonical bytes only) so that the two kinds
//! of digest cannot be confused at a call site.

use std::fs::File;
use std::io;
use std::path::Path;

use r9_core::ContentDigest;
use sha2::{Digest, Sha256};

/// SHA-256 of raw artifact bytes.
pub fn artifact_digest(bytes: &[u8]) -> ContentDigest {
    let hash = Sha256::digest(bytes);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash);
    ContentDigest::from_bytes(out)
}

/// SHA-256 of a file's bytes, streamed.
pub fn file_digest(path: &Path) -> io::Result<ContentDigest> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    Ok(ContentDigest::from_bytes(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_input_vector() {
        assert_eq!(
            artifact_digest(b"").to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn abc_vector() {
        assert_eq!(
            artifact_digest(b"abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn file_digest_matches_in_memory_digest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let bytes: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        file.write_all(&bytes).unwrap();
        file.flush().unwrap();
        assert_eq!(file_digest(file.path()).unwrap(), artifact_digest(&bytes));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(file_digest(Path::new("/nonexistent/r9/model.ifc")).is_err());
    }
}
