//! Host store persisted as a single JSON object on disk

use super::{check_capacity, HostStore};
use hyvve_core::{Error, HostStoreError, Result};
use hyvve_utils::write_atomic_string;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A host store backed by a JSON file.
///
/// The whole map is rewritten atomically after every mutation, which keeps
/// the file valid across crashes. Suited to the small, single-document
/// workloads the engine produces.
#[derive(Debug)]
pub struct FileHostStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
    capacity: Option<u64>,
}

impl FileHostStore {
    /// Open the store at `path`, starting empty if the file does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| Error::file_system(&path, "read store file", e))?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)
                    .map_err(|e| Error::serialization("parse store file", e))?
            }
        } else {
            BTreeMap::new()
        };

        tracing::debug!(path = %path.display(), entries = entries.len(), "Opened file host store");

        Ok(Self {
            path,
            entries: RwLock::new(entries),
            capacity: None,
        })
    }

    /// Reject writes that would push the file past `bytes`
    #[must_use]
    pub fn with_capacity(mut self, bytes: u64) -> Self {
        self.capacity = Some(bytes);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> std::result::Result<(), HostStoreError> {
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| HostStoreError::backend(e.to_string()))?;
        write_atomic_string(&self.path, &content)
            .map_err(|e| HostStoreError::backend(e.to_string()))
    }
}

impl HostStore for FileHostStore {
    fn get_item(&self, key: &str) -> std::result::Result<Option<String>, HostStoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> std::result::Result<(), HostStoreError> {
        let mut entries = self.entries.write();
        check_capacity(&entries, self.capacity, key, value)?;

        let previous = entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush(&entries) {
            // Keep memory and disk in agreement
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> std::result::Result<(), HostStoreError> {
        let mut entries = self.entries.write();
        let Some(previous) = entries.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.flush(&entries) {
            entries.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }

    fn keys(&self) -> std::result::Result<Vec<String>, HostStoreError> {
        Ok(self.entries.read().keys().cloned().collect())
    }

    fn len(&self) -> std::result::Result<usize, HostStoreError> {
        Ok(self.entries.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");

        let store = FileHostStore::open(&path).unwrap();
        store.set_item("hyvve-state", "{}").unwrap();
        store.set_item("other", "x").unwrap();
        store.remove_item("other").unwrap();
        drop(store);

        let reopened = FileHostStore::open(&path).unwrap();
        assert_eq!(reopened.keys().unwrap(), vec!["hyvve-state".to_string()]);
        assert_eq!(
            reopened.get_item("hyvve-state").unwrap(),
            Some("{}".to_string())
        );
    }

    #[test]
    fn test_missing_and_empty_files_start_empty() {
        let dir = TempDir::new().unwrap();
        let missing = FileHostStore::open(dir.path().join("nope.json")).unwrap();
        assert!(missing.is_empty().unwrap());

        let empty_path = dir.path().join("empty.json");
        fs::write(&empty_path, "").unwrap();
        assert!(FileHostStore::open(&empty_path).unwrap().is_empty().unwrap());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "[1, 2").unwrap();

        assert!(matches!(
            FileHostStore::open(&path),
            Err(Error::Serialization { .. })
        ));
    }

    #[test]
    fn test_capacity() {
        let dir = TempDir::new().unwrap();
        let store = FileHostStore::open(dir.path().join("s.json"))
            .unwrap()
            .with_capacity(8);

        store.set_item("ab", "cd").unwrap();
        assert!(store.set_item("x", "y").unwrap_err().is_quota_exceeded());
        assert_eq!(store.len().unwrap(), 1);
    }
}
