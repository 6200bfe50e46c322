//! The host key-value store the engine persists into
//!
//! The engine only needs string keys and string values with get, set,
//! remove and enumerate. `set_item` must report a full store as
//! [`HostStoreError::QuotaExceeded`] so the quota-aware layer can evict and
//! retry.

mod file;
mod memory;

pub use file::FileHostStore;
pub use memory::InMemoryHostStore;

use hyvve_core::{entry_size, HostStoreError};
use std::collections::BTreeMap;

/// A string-keyed, string-valued, capacity-bounded store.
///
/// Implementations use interior mutability so one store can be shared
/// behind an `Arc` by every component that writes to it.
pub trait HostStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, HostStoreError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), HostStoreError>;

    /// Removing a missing key is not an error
    fn remove_item(&self, key: &str) -> Result<(), HostStoreError>;

    /// Every key currently in the store, including ones the engine does not own
    fn keys(&self) -> Result<Vec<String>, HostStoreError>;

    fn len(&self) -> Result<usize, HostStoreError> {
        Ok(self.keys()?.len())
    }

    fn is_empty(&self) -> Result<bool, HostStoreError> {
        Ok(self.len()? == 0)
    }
}

/// Bytes the store would hold after writing `key = value`
fn projected_usage(entries: &BTreeMap<String, String>, key: &str, value: &str) -> u64 {
    let current: u64 = entries.iter().map(|(k, v)| entry_size(k, v)).sum();
    let replaced = entries.get(key).map(|old| entry_size(key, old)).unwrap_or(0);
    current - replaced + entry_size(key, value)
}

/// Reject a write that would push the store past `capacity`
fn check_capacity(
    entries: &BTreeMap<String, String>,
    capacity: Option<u64>,
    key: &str,
    value: &str,
) -> Result<(), HostStoreError> {
    match capacity {
        Some(limit) if projected_usage(entries, key, value) > limit => {
            Err(HostStoreError::QuotaExceeded {
                key: key.to_string(),
            })
        }
        _ => Ok(()),
    }
}
