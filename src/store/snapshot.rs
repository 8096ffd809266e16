//! Collection snapshot files
//!
//! A snapshot is a single JSON file holding every document of one
//! collection together with a CRC32 of the serialized documents:
//!
//! ```text
//! { "checksum": 1234567890, "documents": [ {...}, {...} ] }
//! ```
//!
//! Writes go to `<name>.json.tmp`, are fsynced, then renamed over the live
//! file so a crash never leaves a half-written snapshot behind.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::checksum::{compute_checksum, verify_checksum};
use super::errors::{StoreError, StoreResult};

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotBody {
    checksum: u32,
    documents: Vec<Value>,
}

/// Snapshot file for one collection
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    /// Snapshot for `collection` inside `dir`.
    pub fn new(dir: &Path, collection: &str) -> Self {
        Self {
            path: dir.join(format!("{}.json", collection)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads all documents. A missing file is an empty collection.
    pub fn load(&self) -> StoreResult<Vec<Value>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        let body: SnapshotBody =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Malformed {
                path: self.path.clone(),
                source,
            })?;

        let payload = serde_json::to_vec(&body.documents).map_err(|source| {
            StoreError::Malformed {
                path: self.path.clone(),
                source,
            }
        })?;
        verify_checksum(&payload, body.checksum).map_err(|actual| StoreError::Corruption {
            path: self.path.clone(),
            expected: body.checksum,
            actual,
        })?;

        Ok(body.documents)
    }

    /// Atomically replaces the snapshot with `documents`.
    pub fn save(&self, documents: &[Value]) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let payload = serde_json::to_vec(documents).map_err(|source| StoreError::Malformed {
            path: self.path.clone(),
            source,
        })?;
        let body = SnapshotBody {
            checksum: compute_checksum(&payload),
            documents: documents.to_vec(),
        };
        let bytes = serde_json::to_vec(&body).map_err(|source| StoreError::Malformed {
            path: self.path.clone(),
            source,
        })?;

        let tmp_path = self.path.with_extension("json.tmp");
        let mut file = File::create(&tmp_path).map_err(|e| StoreError::io(&tmp_path, e))?;
        file.write_all(&bytes)
            .map_err(|e| StoreError::io(&tmp_path, e))?;
        file.sync_all().map_err(|e| StoreError::io(&tmp_path, e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::io(&self.path, e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_missing_snapshot_is_empty() {
        let tmp = TempDir::new().unwrap();
        let snapshot = SnapshotFile::new(tmp.path(), "tours");
        assert!(snapshot.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let snapshot = SnapshotFile::new(tmp.path(), "tours");
        let docs = vec![json!({"_id": "a", "name": "The Park Camper"})];

        snapshot.save(&docs).unwrap();
        assert_eq!(snapshot.load().unwrap(), docs);
        assert!(!tmp.path().join("tours.json.tmp").exists());
    }

    #[test]
    fn test_tampered_snapshot_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let snapshot = SnapshotFile::new(tmp.path(), "tours");
        snapshot.save(&[json!({"price": 497})]).unwrap();

        let text = fs::read_to_string(snapshot.path()).unwrap();
        fs::write(snapshot.path(), text.replace("497", "1")).unwrap();

        assert!(matches!(
            snapshot.load(),
            Err(StoreError::Corruption { .. })
        ));
    }
}
