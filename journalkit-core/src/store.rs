//! Blob storage for the persisted vault record.
//!
//! The vault treats its storage medium as an opaque get/set-by-key blob
//! store. This module defines that seam as the [`VaultStore`] trait and ships
//! two implementations: an in-memory map for tests and embedding hosts, and a
//! filesystem store with crash-safe atomic replacement.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{VaultError, VaultResult};

/// Opaque blob storage for vault records.
///
/// Writes MUST be atomic from the reader's point of view: after a failed or
/// interrupted [`write_atomic`](VaultStore::write_atomic), a subsequent read
/// returns either the complete previous content or the complete new content,
/// never a partial state. The session controller relies on this to guarantee
/// that a failed save leaves the prior record intact.
pub trait VaultStore: Send + Sync {
    /// Reads a blob by key.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(bytes))` if the blob exists
    /// - `Ok(None)` if the blob does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails (other than not found).
    fn read(&self, key: &str) -> VaultResult<Option<Vec<u8>>>;

    /// Atomically writes a blob, replacing any existing content.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails at any stage; the previous content
    /// must remain readable in that case.
    fn write_atomic(&self, key: &str, bytes: &[u8]) -> VaultResult<()>;

    /// Deletes a blob. Deleting a missing blob is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error only for actual I/O failures.
    fn delete(&self, key: &str) -> VaultResult<()>;

    /// Checks whether a blob exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read operation fails.
    fn exists(&self, key: &str) -> VaultResult<bool> {
        Ok(self.read(key)?.is_some())
    }
}

// =============================================================================
// Memory store
// =============================================================================

/// In-memory [`VaultStore`] backed by a `HashMap`.
///
/// **FOR TESTING AND EMBEDDING ONLY**: contents vanish with the process.
/// Thread-safe so a test can hold one handle and inspect persisted bytes
/// while a session controller owns another.
#[derive(Default)]
pub struct MemoryVaultStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryVaultStore {
    /// Creates a new empty memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored blobs.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.read().unwrap().len()
    }

    /// Returns `true` if no blobs are stored.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.read().unwrap().is_empty()
    }

    /// Clears all stored blobs.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn clear(&self) {
        self.blobs.write().unwrap().clear();
    }
}

impl VaultStore for MemoryVaultStore {
    fn read(&self, key: &str) -> VaultResult<Option<Vec<u8>>> {
        Ok(self.blobs.read().unwrap().get(key).cloned())
    }

    fn write_atomic(&self, key: &str, bytes: &[u8]) -> VaultResult<()> {
        self.blobs
            .write()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> VaultResult<()> {
        self.blobs.write().unwrap().remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> VaultResult<bool> {
        Ok(self.blobs.read().unwrap().contains_key(key))
    }
}

// =============================================================================
// Filesystem store
// =============================================================================

/// Helper to create a storage error from an `std::io::Error`.
fn io_error<S: Into<String>>(context: S, err: std::io::Error) -> VaultError {
    VaultError::storage(context, err)
}

/// Filesystem-backed [`VaultStore`], one file per key inside a directory.
///
/// Writes follow the write-to-temp-then-rename pattern:
///
/// 1. Write data to a temporary file in the same directory
/// 2. `fsync` the temporary file
/// 3. Atomically rename it over the target name
/// 4. `fsync` the parent directory so the rename is durable
///
/// A crash at any point leaves either the complete old record or the complete
/// new record on disk.
#[derive(Debug, Clone)]
pub struct FsVaultStore {
    /// Directory holding the vault blobs.
    directory: PathBuf,
}

impl FsVaultStore {
    /// Creates a store rooted at `directory`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new<P: AsRef<Path>>(directory: P) -> VaultResult<Self> {
        let directory = directory.as_ref().to_path_buf();

        fs::create_dir_all(&directory).map_err(|e| {
            io_error(
                format!("creating vault directory '{}'", directory.display()),
                e,
            )
        })?;

        Ok(Self { directory })
    }

    /// Returns the directory this store writes into.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.directory.join(key)
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.directory.join(format!(".{key}.tmp"))
    }

    /// Syncs the directory so a completed rename survives a crash.
    fn sync_directory(&self) -> VaultResult<()> {
        #[cfg(unix)]
        {
            let dir = fs::File::open(&self.directory).map_err(|e| {
                io_error(
                    format!("opening directory for sync '{}'", self.directory.display()),
                    e,
                )
            })?;
            dir.sync_all()
                .map_err(|e| io_error("syncing vault directory", e))?;
        }
        Ok(())
    }
}

impl VaultStore for FsVaultStore {
    fn read(&self, key: &str) -> VaultResult<Option<Vec<u8>>> {
        let path = self.blob_path(key);

        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(format!("reading blob '{}'", path.display()), e)),
        }
    }

    fn write_atomic(&self, key: &str, bytes: &[u8]) -> VaultResult<()> {
        let final_path = self.blob_path(key);
        let temp_path = self.temp_path(key);

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| {
                io_error(
                    format!("creating temporary file '{}'", temp_path.display()),
                    e,
                )
            })?;

        file.write_all(bytes).map_err(|e| {
            io_error(
                format!("writing temporary file '{}'", temp_path.display()),
                e,
            )
        })?;

        file.sync_all()
            .map_err(|e| io_error("syncing temporary file", e))?;
        drop(file);

        fs::rename(&temp_path, &final_path).map_err(|e| {
            // Leave the previous record untouched; drop the temp file.
            let _ = fs::remove_file(&temp_path);
            io_error(
                format!(
                    "renaming '{}' to '{}'",
                    temp_path.display(),
                    final_path.display()
                ),
                e,
            )
        })?;

        self.sync_directory()
    }

    fn delete(&self, key: &str) -> VaultResult<()> {
        let path = self.blob_path(key);

        match fs::remove_file(&path) {
            Ok(()) => self.sync_directory(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(format!("deleting blob '{}'", path.display()), e)),
        }
    }

    fn exists(&self, key: &str) -> VaultResult<bool> {
        Ok(self.blob_path(key).exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_basic() {
        let store = MemoryVaultStore::new();

        assert!(store.is_empty());
        assert!(store.read("record").unwrap().is_none());
        assert!(!store.exists("record").unwrap());

        store.write_atomic("record", b"hello").unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.exists("record").unwrap());
        assert_eq!(store.read("record").unwrap(), Some(b"hello".to_vec()));

        store.write_atomic("record", b"world").unwrap();
        assert_eq!(store.read("record").unwrap(), Some(b"world".to_vec()));

        store.delete("record").unwrap();
        assert!(store.read("record").unwrap().is_none());
    }

    #[test]
    fn memory_store_delete_missing_is_ok() {
        let store = MemoryVaultStore::new();
        store.delete("never-written").unwrap();
    }

    #[test]
    fn fs_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsVaultStore::new(dir.path()).unwrap();

        assert!(store.read("record.json").unwrap().is_none());
        assert!(!store.exists("record.json").unwrap());

        store.write_atomic("record.json", b"{\"v\":1}").unwrap();
        assert!(store.exists("record.json").unwrap());
        assert_eq!(
            store.read("record.json").unwrap(),
            Some(b"{\"v\":1}".to_vec())
        );
    }

    #[test]
    fn fs_store_overwrite_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsVaultStore::new(dir.path()).unwrap();

        store.write_atomic("record.json", b"first").unwrap();
        store.write_atomic("record.json", b"second").unwrap();
        assert_eq!(store.read("record.json").unwrap(), Some(b"second".to_vec()));
    }

    #[test]
    fn fs_store_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsVaultStore::new(dir.path()).unwrap();

        store.write_atomic("record.json", b"data").unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
    }

    #[test]
    fn fs_store_delete_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsVaultStore::new(dir.path()).unwrap();
        store.delete("never-written").unwrap();
    }

    #[test]
    fn fs_store_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");

        let store = FsVaultStore::new(&nested).unwrap();
        store.write_atomic("record.json", b"data").unwrap();
        assert!(nested.join("record.json").exists());
    }
}
