//! Quota-aware wrapper around the host store
//!
//! Every write goes through [`QuotaAwareStore::safe_set_item`], which never
//! panics or returns `Err`: failures come back as a [`StorageResult`]. When
//! the host reports a full store the oldest engine-owned entries are evicted
//! and the write is retried exactly once. Keys without the engine prefix
//! count toward usage but are never evicted or cleared.

mod eviction;

use crate::config::PersistenceConfig;
use crate::host::HostStore;
use hyvve_core::constants::{AVAILABILITY_PROBE_KEY, COMPRESSED_FLAG_SUFFIX};
use hyvve_core::entry_size;
use serde::Serialize;
use std::sync::Arc;

/// Point-in-time measurement of the host store
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageUsage {
    pub bytes_used: u64,
    pub bytes_remaining: u64,
    /// Fraction of the assumed capacity in use, 0.0..=1.0
    pub percent_used: f64,
    pub item_count: usize,
}

/// Outcome of a guarded write
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StorageResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl StorageResult {
    pub fn ok(warning: Option<String>) -> Self {
        Self {
            success: true,
            error: None,
            warning,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            warning: None,
        }
    }
}

/// Host store access with usage measurement, warnings and eviction
#[derive(Clone)]
pub struct QuotaAwareStore {
    host: Option<Arc<dyn HostStore>>,
    key_prefix: String,
    max_storage_size: u64,
    warning_threshold: f64,
    critical_threshold: f64,
    cleanup_target: u64,
}

impl QuotaAwareStore {
    pub fn new(host: Arc<dyn HostStore>, config: &PersistenceConfig) -> Self {
        Self {
            host: Some(host),
            ..Self::detached(config)
        }
    }

    /// A store with no host attached, as in a context without storage.
    /// Every operation degrades to its "unavailable" result.
    pub fn detached(config: &PersistenceConfig) -> Self {
        Self {
            host: None,
            key_prefix: config.key_prefix.clone(),
            max_storage_size: config.max_storage_size,
            warning_threshold: config.warning_threshold,
            critical_threshold: config.critical_threshold,
            cleanup_target: config.cleanup_target,
        }
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// Minimum bytes evicted when a write hits the quota
    pub fn cleanup_target(&self) -> u64 {
        self.cleanup_target
    }

    pub fn is_engine_key(&self, key: &str) -> bool {
        key.starts_with(&self.key_prefix)
    }

    /// Probe the host with a throwaway write and delete.
    ///
    /// A quota error on the probe still means the store exists and answers,
    /// so it counts as available; eviction can make room afterwards.
    pub fn is_storage_available(&self) -> bool {
        let Some(host) = &self.host else {
            return false;
        };

        let probe = match host.set_item(AVAILABILITY_PROBE_KEY, AVAILABILITY_PROBE_KEY) {
            Ok(()) => host.remove_item(AVAILABILITY_PROBE_KEY),
            Err(e) if e.is_quota_exceeded() => Ok(()),
            Err(e) => Err(e),
        };

        match probe {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("Storage availability probe failed: {e}");
                false
            }
        }
    }

    fn available_host(&self) -> Option<&Arc<dyn HostStore>> {
        if self.is_storage_available() {
            self.host.as_ref()
        } else {
            None
        }
    }

    /// Measure every entry in the host store, engine-owned or not
    pub fn get_storage_usage(&self) -> StorageUsage {
        let Some(host) = self.available_host() else {
            return StorageUsage::default();
        };

        let keys = match host.keys() {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!("Failed to enumerate storage keys: {e}");
                return StorageUsage::default();
            }
        };

        let bytes_used: u64 = keys
            .iter()
            .filter_map(|key| match host.get_item(key) {
                Ok(Some(value)) => Some(entry_size(key, &value)),
                Ok(None) => None,
                Err(e) => {
                    tracing::warn!(key = %key, "Failed to read entry while measuring usage: {e}");
                    None
                }
            })
            .sum();

        StorageUsage {
            bytes_used,
            bytes_remaining: self.max_storage_size.saturating_sub(bytes_used),
            percent_used: (bytes_used as f64 / self.max_storage_size as f64).min(1.0),
            item_count: keys.len(),
        }
    }

    pub fn is_near_quota(&self, threshold: f64) -> bool {
        self.get_storage_usage().percent_used >= threshold
    }

    /// Near quota at the configured warning threshold
    pub fn is_above_warning(&self) -> bool {
        self.is_near_quota(self.warning_threshold)
    }

    pub fn is_critical_quota(&self) -> bool {
        self.is_near_quota(self.critical_threshold)
    }

    /// Write `key = value`, evicting old engine entries once if the host is full
    pub fn safe_set_item(&self, key: &str, value: &str) -> StorageResult {
        let Some(host) = self.available_host() else {
            tracing::warn!(key = %key, "Storage not available, skipping write");
            return StorageResult::failure("Storage not available");
        };

        match host.set_item(key, value) {
            Ok(()) => StorageResult::ok(self.usage_warning()),
            Err(e) if e.is_quota_exceeded() => self.retry_after_cleanup(host, key, value),
            Err(e) => {
                tracing::error!(key = %key, "Failed to write to storage: {e}");
                StorageResult::failure(e.to_string())
            }
        }
    }

    // One bounded retry. Looping here could evict entries the caller just
    // wrote if the host keeps signalling quota errors.
    fn retry_after_cleanup(
        &self,
        host: &Arc<dyn HostStore>,
        key: &str,
        value: &str,
    ) -> StorageResult {
        let target = (2 * entry_size(key, value)).max(self.cleanup_target);
        tracing::warn!(
            key = %key,
            bytes_to_free = target,
            "Storage quota exceeded, evicting old entries"
        );

        // A flag write must not evict the data entry it describes
        let freed = self.evict(target, key.strip_suffix(COMPRESSED_FLAG_SUFFIX));

        match host.set_item(key, value) {
            Ok(()) => {
                tracing::info!(key = %key, bytes_freed = freed, "Write succeeded after cleanup");
                StorageResult::ok(Some(format!(
                    "Storage was full; removed old entries to free {freed} bytes"
                )))
            }
            Err(e) => {
                tracing::error!(key = %key, bytes_freed = freed, "Write failed after cleanup: {e}");
                StorageResult::failure(format!(
                    "Storage quota exceeded even after cleanup (freed {freed} bytes)"
                ))
            }
        }
    }

    fn usage_warning(&self) -> Option<String> {
        let usage = self.get_storage_usage();
        let percent = usage.percent_used * 100.0;

        if usage.percent_used >= self.critical_threshold {
            tracing::error!(
                bytes_used = usage.bytes_used,
                bytes_remaining = usage.bytes_remaining,
                "Storage usage critical: {percent:.1}%"
            );
            Some(format!(
                "Storage critically full: {percent:.1}% used, {} bytes remaining",
                usage.bytes_remaining
            ))
        } else if usage.percent_used >= self.warning_threshold {
            tracing::warn!(
                bytes_used = usage.bytes_used,
                bytes_remaining = usage.bytes_remaining,
                "Storage usage high: {percent:.1}%"
            );
            Some(format!(
                "Storage usage high: {percent:.1}% used, {} bytes remaining",
                usage.bytes_remaining
            ))
        } else {
            None
        }
    }

    pub fn safe_get_item(&self, key: &str) -> Option<String> {
        let Some(host) = &self.host else {
            tracing::warn!(key = %key, "Storage not available, cannot read");
            return None;
        };

        match host.get_item(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, "Failed to read from storage: {e}");
                None
            }
        }
    }

    pub fn safe_remove_item(&self, key: &str) -> bool {
        let Some(host) = &self.host else {
            tracing::warn!(key = %key, "Storage not available, cannot remove");
            return false;
        };

        match host.remove_item(key) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key = %key, "Failed to remove from storage: {e}");
                false
            }
        }
    }

    /// Every key carrying the engine prefix
    pub fn get_hyvve_storage_keys(&self) -> Vec<String> {
        let Some(host) = &self.host else {
            return Vec::new();
        };

        match host.keys() {
            Ok(keys) => keys.into_iter().filter(|k| self.is_engine_key(k)).collect(),
            Err(e) => {
                tracing::warn!("Failed to enumerate storage keys: {e}");
                Vec::new()
            }
        }
    }

    /// Remove every engine-owned key, returning how many were removed
    pub fn clear_hyvve_storage(&self) -> usize {
        let removed = self
            .get_hyvve_storage_keys()
            .iter()
            .filter(|key| self.safe_remove_item(key))
            .count();
        tracing::info!(removed, "Cleared engine-owned storage");
        removed
    }
}

impl std::fmt::Debug for QuotaAwareStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaAwareStore")
            .field("attached", &self.host.is_some())
            .field("key_prefix", &self.key_prefix)
            .field("max_storage_size", &self.max_storage_size)
            .field("warning_threshold", &self.warning_threshold)
            .field("critical_threshold", &self.critical_threshold)
            .field("cleanup_target", &self.cleanup_target)
            .finish()
    }
}
