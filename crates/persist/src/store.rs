//! Key-value save storage.
//!
//! Layout of a [`FileBackend`] directory:
//! ```text
//! <key>.json               - one save blob per key
//! integrity/
//!   manifest.json          - sha256 of every blob
//! ```
//!
//! A write first records the new digest as `pending`, then renames the blob
//! into place, then promotes `pending` to `sha256`. Both files are replaced
//! by rename, so an interrupted write leaves either the old or the new blob
//! loadable.

use gridmerge_kernel::{GameState, OverrideStore, PlayerState};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::codec::{self, PersistError};

/// Errors from a save backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("integrity check failed for {key}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        key: String,
        expected: String,
        actual: String,
    },
    #[error("stored blob for {0} is not valid UTF-8")]
    Encoding(String),
    #[error("invalid save key {0:?}")]
    InvalidKey(String),
}

/// The storage contract: string blobs under string keys.
pub trait SaveBackend {
    /// `Ok(None)` when nothing is stored under `key`.
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn write(&mut self, key: &str, blob: &str) -> Result<(), StoreError>;

    /// Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// In-process backend. Nothing survives the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    entries: HashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SaveBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, blob: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), blob.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One entry in the integrity manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub key: String,
    pub sha256: String,
    pub bytes: u64,
    /// Digest of a write that has not been confirmed yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<String>,
}

impl ManifestEntry {
    fn accepts(&self, digest: &str) -> bool {
        self.sha256 == digest || self.pending.as_deref() == Some(digest)
    }
}

/// Digest of every blob currently stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrityManifest {
    pub entries: Vec<ManifestEntry>,
}

impl IntegrityManifest {
    pub fn get(&self, key: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    fn upsert(&mut self, entry: ManifestEntry) {
        match self.entries.iter_mut().find(|e| e.key == entry.key) {
            Some(slot) => *slot = entry,
            None => self.entries.push(entry),
        }
    }

    fn remove(&mut self, key: &str) {
        self.entries.retain(|e| e.key != key);
    }
}

/// Directory-backed store with a sha256 manifest.
pub struct FileBackend {
    root: PathBuf,
    manifest: IntegrityManifest,
}

impl FileBackend {
    /// Open or create a store at `path`.
    ///
    /// An unreadable manifest is replaced by an empty one: blobs then load
    /// unverified rather than blocking the game.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        std::fs::create_dir_all(root.join("integrity"))?;

        let manifest_path = root.join("integrity").join("manifest.json");
        let manifest = if manifest_path.exists() {
            match std::fs::File::open(&manifest_path)
                .map_err(StoreError::from)
                .and_then(|f| serde_json::from_reader(f).map_err(StoreError::from))
            {
                Ok(manifest) => manifest,
                Err(e) => {
                    tracing::warn!(path = %manifest_path.display(), error = %e, "discarding unreadable manifest");
                    IntegrityManifest::default()
                }
            }
        } else {
            IntegrityManifest::default()
        };

        let mut store = Self { root, manifest };
        store.settle_pending()?;
        store.save_manifest()?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest(&self) -> &IntegrityManifest {
        &self.manifest
    }

    /// Re-hash every blob named in the manifest.
    pub fn verify_integrity(&self) -> Result<(), StoreError> {
        for entry in &self.manifest.entries {
            let data = std::fs::read(self.blob_path(&entry.key)?)?;
            let actual = sha256_hex(&data);
            if !entry.accepts(&actual) {
                return Err(StoreError::IntegrityMismatch {
                    key: entry.key.clone(),
                    expected: entry.sha256.clone(),
                    actual,
                });
            }
        }
        Ok(())
    }

    fn blob_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }

    fn save_manifest(&self) -> Result<(), StoreError> {
        let path = self.root.join("integrity").join("manifest.json");
        let tmp = path.with_extension("json.tmp");
        serde_json::to_writer_pretty(std::fs::File::create(&tmp)?, &self.manifest)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Resolve entries left pending by an interrupted write: keep whichever
    /// digest the blob on disk matches.
    fn settle_pending(&mut self) -> Result<(), StoreError> {
        for entry in &mut self.manifest.entries {
            let Some(pending) = entry.pending.take() else {
                continue;
            };
            let path = self.root.join(format!("{}.json", entry.key));
            if !path.exists() {
                continue;
            }
            let data = std::fs::read(&path)?;
            if sha256_hex(&data) == pending {
                tracing::info!(key = %entry.key, "completing interrupted save");
                entry.sha256 = pending;
                entry.bytes = data.len() as u64;
            }
        }
        Ok(())
    }

    /// Record `digest` as pending for `key` before the blob is replaced.
    fn stage(&mut self, key: &str, digest: &str) -> Result<PathBuf, StoreError> {
        let path = self.blob_path(key)?;
        let entry = match self.manifest.get(key) {
            Some(entry) => ManifestEntry {
                pending: Some(digest.to_string()),
                ..entry.clone()
            },
            None => {
                // An unverified blob already on disk stays readable meanwhile.
                let (sha256, bytes) = if path.exists() {
                    let data = std::fs::read(&path)?;
                    (sha256_hex(&data), data.len() as u64)
                } else {
                    (digest.to_string(), 0)
                };
                ManifestEntry {
                    key: key.to_string(),
                    sha256,
                    bytes,
                    pending: Some(digest.to_string()),
                }
            }
        };
        self.manifest.upsert(entry);
        self.save_manifest()?;
        Ok(path)
    }

    /// Atomically put `blob` at `path`.
    fn replace_blob(path: &Path, blob: &str) -> Result<(), StoreError> {
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, blob)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Promote the pending digest once the blob is in place.
    fn confirm(&mut self, key: &str, digest: &str, bytes: u64) -> Result<(), StoreError> {
        self.manifest.upsert(ManifestEntry {
            key: key.to_string(),
            sha256: digest.to_string(),
            bytes,
            pending: None,
        });
        self.save_manifest()
    }
}

impl SaveBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.blob_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read(&path)?;
        // A blob missing from the manifest is accepted unverified.
        if let Some(entry) = self.manifest.get(key) {
            let actual = sha256_hex(&data);
            if !entry.accepts(&actual) {
                return Err(StoreError::IntegrityMismatch {
                    key: key.to_string(),
                    expected: entry.sha256.clone(),
                    actual,
                });
            }
        }
        String::from_utf8(data)
            .map(Some)
            .map_err(|_| StoreError::Encoding(key.to_string()))
    }

    fn write(&mut self, key: &str, blob: &str) -> Result<(), StoreError> {
        let digest = sha256_hex(blob.as_bytes());
        let path = self.stage(key, &digest)?;
        Self::replace_blob(&path, blob)?;
        self.confirm(key, &digest, blob.len() as u64)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let path = self.blob_path(key)?;
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        self.manifest.remove(key);
        self.save_manifest()
    }
}

/// A backend paired with the key the game saves under.
pub struct SaveSlot {
    backend: Box<dyn SaveBackend>,
    key: String,
}

impl SaveSlot {
    pub fn new(backend: Box<dyn SaveBackend>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// In-memory slot, for tests and throwaway sessions.
    pub fn in_memory(key: impl Into<String>) -> Self {
        Self::new(Box::new(MemoryBackend::new()), key)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Encode `state` and write it through.
    pub fn save(&mut self, state: &GameState) -> Result<(), PersistError> {
        let blob = codec::serialize(state)?;
        self.backend.write(&self.key, &blob)?;
        tracing::trace!(key = %self.key, bytes = blob.len(), "saved");
        Ok(())
    }

    /// `Ok(None)` when no save exists. A blob failing its integrity check
    /// is reported as [`PersistError::CorruptSave`].
    pub fn load(&self) -> Result<Option<(PlayerState, OverrideStore)>, PersistError> {
        let blob = match self.backend.read(&self.key) {
            Ok(Some(blob)) => blob,
            Ok(None) => return Ok(None),
            Err(e @ (StoreError::IntegrityMismatch { .. } | StoreError::Encoding(_))) => {
                return Err(PersistError::CorruptSave(e.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        codec::deserialize(&blob).map(Some)
    }

    /// Delete the save.
    pub fn clear(&mut self) -> Result<(), PersistError> {
        self.backend.remove(&self.key)?;
        Ok(())
    }

    /// Store a raw blob, bypassing the codec.
    pub fn write_raw(&mut self, blob: &str) -> Result<(), PersistError> {
        self.backend.write(&self.key, blob)?;
        Ok(())
    }
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
