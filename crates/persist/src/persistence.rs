//! Named dashboard state documents on top of the codec, store and migrations
//!
//! A document saved under `name` occupies up to two host entries:
//! `<prefix><name>` holds the (possibly compressed) JSON text and
//! `<prefix><name>:compressed` is present with value `"true"` only when the
//! text was compressed.

use crate::codec::{CompressionCodec, CompressionMetrics, MetricsSink};
use crate::config::PersistenceConfig;
use crate::host::HostStore;
use crate::migration::{MigrationEngine, MigrationRegistry, MigrationResult};
use crate::quota::{QuotaAwareStore, StorageResult};
use hyvve_core::constants::{COMPRESSED_FLAG_SUFFIX, COMPRESSED_FLAG_VALUE};
use hyvve_core::{Error, Result, StateDocument};
use hyvve_utils::now_millis;
use std::sync::Arc;

/// What happened to a [`StatePersistence::save`] call
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub result: StorageResult,
    pub metrics: CompressionMetrics,
}

/// A document read back by [`StatePersistence::load`]
#[derive(Debug, Clone)]
pub struct LoadedState {
    pub document: StateDocument,
    /// Present when the stored copy was older than the current schema
    pub migration: Option<MigrationResult>,
}

impl LoadedState {
    pub fn was_migrated(&self) -> bool {
        self.migration.is_some()
    }
}

/// Saves and loads dashboard state through one shared configuration
#[derive(Debug)]
pub struct StatePersistence {
    store: QuotaAwareStore,
    codec: CompressionCodec,
    engine: MigrationEngine,
}

impl StatePersistence {
    pub fn new(
        host: Arc<dyn HostStore>,
        config: PersistenceConfig,
        registry: MigrationRegistry,
        sink: Arc<dyn MetricsSink>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store: QuotaAwareStore::new(host, &config),
            codec: CompressionCodec::from_config(&config, sink),
            engine: MigrationEngine::new(registry, &config),
        })
    }

    /// A facade with no host store; saves fail and loads find nothing
    pub fn detached(config: PersistenceConfig, registry: MigrationRegistry) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store: QuotaAwareStore::detached(&config),
            codec: CompressionCodec::from_config(&config, Arc::new(crate::codec::NoopMetricsSink)),
            engine: MigrationEngine::new(registry, &config),
        })
    }

    pub fn store(&self) -> &QuotaAwareStore {
        &self.store
    }

    pub fn codec(&self) -> &CompressionCodec {
        &self.codec
    }

    pub fn engine(&self) -> &MigrationEngine {
        &self.engine
    }

    pub fn data_key(&self, name: &str) -> String {
        format!("{}{name}", self.store.key_prefix())
    }

    pub fn flag_key(&self, name: &str) -> String {
        format!("{}{COMPRESSED_FLAG_SUFFIX}", self.data_key(name))
    }

    /// Persist `document` under `name`.
    ///
    /// Only serialization problems are returned as `Err`; storage failures
    /// are reported in the outcome's [`StorageResult`].
    pub fn save(&self, name: &str, document: &StateDocument) -> Result<SaveOutcome> {
        let mut stamped = document.clone();
        stamped.timestamp = now_millis();

        let text = stamped.to_json()?;
        let output = self.codec.compress_if_needed(&text);
        let data_key = self.data_key(name);
        let flag_key = self.flag_key(name);

        let mut result = self.store.safe_set_item(&data_key, &output.data);
        if !result.success {
            return Ok(SaveOutcome {
                result,
                metrics: output.metrics,
            });
        }

        if output.compressed {
            let flag = self.store.safe_set_item(&flag_key, COMPRESSED_FLAG_VALUE);
            if !flag.success {
                // Without its flag the entry would be read back as raw base64
                tracing::error!(key = %data_key, "Failed to write compression flag, rolling back");
                self.store.safe_remove_item(&data_key);
                return Ok(SaveOutcome {
                    result: flag,
                    metrics: output.metrics,
                });
            }
            result.warning = merge_warnings(result.warning.take(), flag.warning);
        } else if self.store.safe_get_item(&flag_key).is_some()
            && !self.store.safe_remove_item(&flag_key)
        {
            tracing::error!(
                key = %data_key,
                "Failed to clear stale compression flag, rolling back"
            );
            self.store.safe_remove_item(&data_key);
            return Ok(SaveOutcome {
                result: StorageResult::failure("Failed to clear stale compression flag"),
                metrics: output.metrics,
            });
        }

        tracing::debug!(
            key = %data_key,
            compressed = output.compressed,
            size = output.metrics.compressed_size,
            "Saved state"
        );
        Ok(SaveOutcome {
            result,
            metrics: output.metrics,
        })
    }

    /// Read the document stored under `name`, migrating it if it is stale
    pub fn load(&self, name: &str) -> Result<Option<LoadedState>> {
        let Some(data) = self.store.safe_get_item(&self.data_key(name)) else {
            return Ok(None);
        };
        let compressed = self
            .store
            .safe_get_item(&self.flag_key(name))
            .is_some_and(|flag| flag == COMPRESSED_FLAG_VALUE);

        let text = self.codec.decompress_if_needed(&data, compressed)?;
        let document = StateDocument::from_json(&text)?;

        if !self.engine.detect_version_mismatch(document.version) {
            return Ok(Some(LoadedState {
                document,
                migration: None,
            }));
        }

        let migration = self.engine.migrate_to_current(document);
        if !migration.success {
            return Err(Error::Migration {
                from_version: migration.from_version,
                to_version: migration.to_version,
                migrations_applied: migration.migrations_applied,
                message: migration.error.unwrap_or_default(),
                partial_state: Box::new(migration.migrated_state),
            });
        }

        tracing::info!(
            name,
            from_version = migration.from_version,
            to_version = migration.to_version,
            "Migrated stored state"
        );
        Ok(Some(LoadedState {
            document: migration.migrated_state.clone(),
            migration: Some(migration),
        }))
    }

    /// [`load`](Self::load), falling back to the default document.
    ///
    /// A stored copy that cannot be read is discarded so the next save
    /// starts clean.
    pub fn load_or_default(&self, name: &str) -> StateDocument {
        match self.load(name) {
            Ok(Some(loaded)) => loaded.document,
            Ok(None) => self.engine.get_default_state(),
            Err(e) => {
                tracing::error!(name, "Discarding unreadable stored state: {e}");
                self.remove(name);
                self.engine.get_default_state()
            }
        }
    }

    /// Remove the data entry and its compression flag
    pub fn remove(&self, name: &str) -> bool {
        let data_removed = self.store.safe_remove_item(&self.data_key(name));
        let flag_removed = self.store.safe_remove_item(&self.flag_key(name));
        data_removed && flag_removed
    }
}

fn merge_warnings(first: Option<String>, second: Option<String>) -> Option<String> {
    match (first, second) {
        (Some(first), Some(second)) if first != second => Some(format!("{first}; {second}")),
        (first, second) => first.or(second),
    }
}
