//! Age-based eviction of engine-owned entries

use super::QuotaAwareStore;
use crate::host::HostStore;
use hyvve_core::constants::COMPRESSED_FLAG_SUFFIX;
use hyvve_core::entry_size;
use hyvve_utils::parse_rfc3339_millis;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Timestamp assigned to entries that cannot report their own age
const OLDEST: i64 = 0;

/// An engine-owned entry ranked for eviction
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TimestampedEntry {
    pub key: String,
    pub size: u64,
    pub timestamp: i64,
    /// Compressed-flag sidecar removed together with this entry
    pub sidecar: Option<(String, u64)>,
}

/// The only two fields eviction reads from a stored record
#[derive(Debug, Deserialize)]
struct TimestampProbe {
    #[serde(rename = "_timestamp")]
    recorded: Option<Value>,
    timestamp: Option<Value>,
}

fn millis_from(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) => parse_rfc3339_millis(s).or_else(|| s.trim().parse().ok()),
        _ => None,
    }
}

/// Read the age of a stored value: `_timestamp`, then `timestamp`.
///
/// Returns `None` when the value is not a JSON object or neither field holds
/// a usable timestamp.
pub(crate) fn extract_timestamp(raw: &str) -> Option<i64> {
    let value: Value = serde_json::from_str(raw).ok()?;
    if !value.is_object() {
        return None;
    }
    let probe: TimestampProbe = serde_json::from_value(value).ok()?;

    probe
        .recorded
        .as_ref()
        .and_then(millis_from)
        .or_else(|| probe.timestamp.as_ref().and_then(millis_from))
}

impl QuotaAwareStore {
    /// Engine-owned entries, oldest first.
    ///
    /// Entries without a readable timestamp sort as oldest. A data entry's
    /// `:compressed` sidecar is folded into it rather than ranked alone.
    /// `protected` and its sidecar are never candidates.
    pub(crate) fn eviction_candidates(
        &self,
        host: &Arc<dyn HostStore>,
        protected: Option<&str>,
    ) -> Vec<TimestampedEntry> {
        let keys = match host.keys() {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!("Failed to enumerate storage keys for cleanup: {e}");
                return Vec::new();
            }
        };

        let mut values = BTreeMap::new();
        for key in keys.into_iter().filter(|k| self.is_engine_key(k)) {
            if let Ok(Some(value)) = host.get_item(&key) {
                values.insert(key, value);
            }
        }

        let sidecars: BTreeMap<String, u64> = values
            .iter()
            .filter(|(key, _)| key.ends_with(COMPRESSED_FLAG_SUFFIX))
            .filter(|(key, _)| {
                let companion = &key[..key.len() - COMPRESSED_FLAG_SUFFIX.len()];
                values.contains_key(companion)
            })
            .map(|(key, value)| (key.clone(), entry_size(key, value)))
            .collect();

        let mut entries = Vec::with_capacity(values.len() - sidecars.len());
        for (key, value) in &values {
            if sidecars.contains_key(key) || protected == Some(key.as_str()) {
                continue;
            }
            let sidecar_key = format!("{key}{COMPRESSED_FLAG_SUFFIX}");
            let sidecar = sidecars
                .get(&sidecar_key)
                .map(|size| (sidecar_key, *size));
            entries.push(TimestampedEntry {
                key: key.clone(),
                size: entry_size(key, value),
                timestamp: extract_timestamp(value).unwrap_or(OLDEST),
                sidecar,
            });
        }

        // Stable sort keeps ties in key order
        entries.sort_by_key(|entry| entry.timestamp);
        entries
    }

    /// Evict the oldest engine-owned entries until `bytes_to_free` bytes are
    /// freed or nothing is left. Returns the bytes actually freed.
    pub fn cleanup_old_entries(&self, bytes_to_free: u64) -> u64 {
        self.evict(bytes_to_free, None)
    }

    pub(crate) fn evict(&self, bytes_to_free: u64, protected: Option<&str>) -> u64 {
        let Some(host) = &self.host else {
            tracing::warn!("Storage not available, nothing to clean up");
            return 0;
        };

        let mut freed = 0u64;
        let mut removed = 0usize;

        for entry in self.eviction_candidates(host, protected) {
            if freed >= bytes_to_free {
                break;
            }

            if let Err(e) = host.remove_item(&entry.key) {
                tracing::warn!(key = %entry.key, "Failed to evict entry, skipping: {e}");
                continue;
            }
            freed += entry.size;
            removed += 1;
            tracing::debug!(
                key = %entry.key,
                size = entry.size,
                timestamp = entry.timestamp,
                "Evicted storage entry"
            );

            if let Some((sidecar_key, sidecar_size)) = &entry.sidecar {
                match host.remove_item(sidecar_key) {
                    Ok(()) => freed += sidecar_size,
                    Err(e) => tracing::warn!(
                        key = %sidecar_key,
                        "Failed to evict compression flag: {e}"
                    ),
                }
            }
        }

        tracing::info!(
            requested = bytes_to_free,
            freed,
            removed,
            "Storage cleanup finished"
        );
        freed
    }
}
