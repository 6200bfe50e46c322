//! Applies registered migrations to stale documents

use super::registry::{MigrationDefinition, MigrationRegistry};
use crate::config::PersistenceConfig;
use hyvve_core::{Result, StateDocument};
use hyvve_utils::now_millis;
use serde::Serialize;
use serde_json::{json, Value};

/// Outcome of a migration run.
///
/// Failures are data, not errors: `migrated_state` holds the last document
/// that passed validation, and `migrations_applied` lists every step whose
/// transform ran, including one whose output was then rejected.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationResult {
    pub success: bool,
    pub from_version: u32,
    pub to_version: u32,
    pub migrated_state: StateDocument,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub migrations_applied: Vec<u32>,
}

/// Brings stored documents up to the current schema version
#[derive(Debug)]
pub struct MigrationEngine {
    registry: MigrationRegistry,
    current_version: u32,
    dev_logging: bool,
}

impl MigrationEngine {
    pub fn new(registry: MigrationRegistry, config: &PersistenceConfig) -> Self {
        if let Some(latest) = registry.latest_version() {
            if latest > config.current_version {
                tracing::warn!(
                    latest,
                    current_version = config.current_version,
                    "Migrations registered beyond the current schema version will not run on load"
                );
            }
        }

        Self {
            registry,
            current_version: config.current_version,
            dev_logging: config.dev_logging,
        }
    }

    pub fn current_version(&self) -> u32 {
        self.current_version
    }

    pub fn registry(&self) -> &MigrationRegistry {
        &self.registry
    }

    /// Register another migration; see [`MigrationRegistry::register`]
    pub fn register_migration(&mut self, definition: MigrationDefinition) -> Result<()> {
        self.registry.register(definition)
    }

    /// Whether a document stored at `stored_version` needs migrating.
    /// Documents from a newer release are left alone.
    pub fn detect_version_mismatch(&self, stored_version: u32) -> bool {
        stored_version < self.current_version
    }

    pub fn get_migration_path(
        &self,
        from_version: u32,
        to_version: u32,
    ) -> Vec<&MigrationDefinition> {
        self.registry.path(from_version, to_version)
    }

    /// Migrate a document from its own embedded version to the current one
    pub fn migrate_to_current(&self, document: StateDocument) -> MigrationResult {
        let from_version = document.version;
        self.migrate_state(document, from_version, self.current_version)
    }

    /// Run every registered step in `(from_version, to_version]`, in order
    pub fn migrate_state(
        &self,
        document: StateDocument,
        from_version: u32,
        to_version: u32,
    ) -> MigrationResult {
        let mut result = MigrationResult {
            success: true,
            from_version,
            to_version,
            migrated_state: document,
            error: None,
            migrations_applied: Vec::new(),
        };

        if from_version >= to_version {
            return result;
        }

        let path = self.get_migration_path(from_version, to_version);
        if path.is_empty() {
            // Nothing was ever needed for this gap
            if self.dev_logging {
                tracing::info!(
                    from_version,
                    to_version,
                    "No migrations registered for version gap, stamping version"
                );
            }
            result.migrated_state.version = to_version;
            return result;
        }

        for migration in path {
            let next = match migration.migrate(&result.migrated_state) {
                Ok(next) => next,
                Err(e) => {
                    let message = format!(
                        "Migration to v{} ({}) failed: {e}",
                        migration.version, migration.description
                    );
                    return Self::halt(result, migration, "error", message);
                }
            };
            // A step counts as applied once its transform ran, validated or not
            result.migrations_applied.push(migration.version);

            if !migration.validate(&next) {
                let message = format!(
                    "Migration to v{} ({}) produced a document that failed validation",
                    migration.version, migration.description
                );
                return Self::halt(result, migration, "invalid", message);
            }

            if self.dev_logging {
                tracing::debug!(
                    version = migration.version,
                    description = %migration.description,
                    outcome = "success",
                    "Applied migration"
                );
            }
            result.migrated_state = next;
        }

        result.migrated_state.version = to_version;
        if self.dev_logging {
            tracing::info!(
                from_version,
                to_version,
                applied = ?result.migrations_applied,
                "Migration complete"
            );
        }
        result
    }

    // `migrated_state` keeps the last document that passed validation.
    fn halt(
        mut result: MigrationResult,
        migration: &MigrationDefinition,
        outcome: &'static str,
        message: String,
    ) -> MigrationResult {
        tracing::error!(
            version = migration.version,
            description = %migration.description,
            outcome,
            "{message}"
        );
        result.success = false;
        result.error = Some(message);
        result
    }

    /// Minimal valid document at the current version, the last-resort fallback
    pub fn get_default_state(&self) -> StateDocument {
        let mut document = StateDocument::new(self.current_version)
            .with_field("widgets", json!({}))
            .with_field("activeWidgetId", Value::Null)
            .with_field("filters", json!({}))
            .with_field("isLoading", false)
            .with_field("error", Value::Null);
        document.timestamp = now_millis();
        document
    }
}

impl Default for MigrationEngine {
    fn default() -> Self {
        Self::new(MigrationRegistry::new(), &PersistenceConfig::default())
    }
}
