//! In-memory host store with an optional byte capacity

use super::{check_capacity, HostStore};
use hyvve_core::HostStoreError;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// A host store that lives in process memory.
///
/// Capacity is enforced with the same two-bytes-per-unit accounting the
/// quota layer uses. Availability and failure switches let callers
/// reproduce disabled storage and flaky backends.
#[derive(Debug)]
pub struct InMemoryHostStore {
    entries: RwLock<BTreeMap<String, String>>,
    capacity: Option<u64>,
    available: AtomicBool,
    write_failure: RwLock<Option<(String, HostStoreError)>>,
    remove_failure: RwLock<Option<(String, HostStoreError)>>,
}

impl InMemoryHostStore {
    /// An unbounded store
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            capacity: None,
            available: AtomicBool::new(true),
            write_failure: RwLock::new(None),
            remove_failure: RwLock::new(None),
        }
    }

    /// A store that rejects writes past `bytes`
    pub fn with_capacity(bytes: u64) -> Self {
        Self {
            capacity: Some(bytes),
            ..Self::new()
        }
    }

    pub fn capacity(&self) -> Option<u64> {
        self.capacity
    }

    /// Toggle whether every operation fails with `Unavailable`
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    /// Make writes to keys starting with `key_prefix` fail with `error`
    pub fn fail_writes(&self, key_prefix: impl Into<String>, error: HostStoreError) {
        *self.write_failure.write() = Some((key_prefix.into(), error));
    }

    /// Make removals of keys starting with `key_prefix` fail with `error`
    pub fn fail_removals(&self, key_prefix: impl Into<String>, error: HostStoreError) {
        *self.remove_failure.write() = Some((key_prefix.into(), error));
    }

    /// Stop injecting write and removal failures
    pub fn clear_failures(&self) {
        *self.write_failure.write() = None;
        *self.remove_failure.write() = None;
    }

    fn ensure_available(&self) -> Result<(), HostStoreError> {
        if self.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(HostStoreError::unavailable("storage is disabled"))
        }
    }
}

fn injected(
    failure: &RwLock<Option<(String, HostStoreError)>>,
    key: &str,
) -> Option<HostStoreError> {
    match &*failure.read() {
        Some((prefix, err)) if key.starts_with(prefix.as_str()) => Some(err.clone()),
        _ => None,
    }
}

impl Default for InMemoryHostStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HostStore for InMemoryHostStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, HostStoreError> {
        self.ensure_available()?;
        Ok(self.entries.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), HostStoreError> {
        self.ensure_available()?;
        if let Some(err) = injected(&self.write_failure, key) {
            return Err(err);
        }

        let mut entries = self.entries.write();
        check_capacity(&entries, self.capacity, key, value)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), HostStoreError> {
        self.ensure_available()?;
        if let Some(err) = injected(&self.remove_failure, key) {
            return Err(err);
        }

        self.entries.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, HostStoreError> {
        self.ensure_available()?;
        Ok(self.entries.read().keys().cloned().collect())
    }

    fn len(&self) -> Result<usize, HostStoreError> {
        self.ensure_available()?;
        Ok(self.entries.read().len())
    }
}
