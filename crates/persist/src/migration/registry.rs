//! Registered schema migrations, kept sorted by target version

use hyvve_core::{Error, Result, StateDocument};

/// Error type a migration step may return
pub type StepError = Box<dyn std::error::Error + Send + Sync>;

/// What a migration step returns
pub type StepResult = std::result::Result<StateDocument, StepError>;

type MigrateFn = Box<dyn Fn(&StateDocument) -> StepResult + Send + Sync>;
type ValidateFn = Box<dyn Fn(&StateDocument) -> bool + Send + Sync>;

/// A transform that upgrades a document *to* `version`
pub struct MigrationDefinition {
    pub version: u32,
    pub description: String,
    migrate: MigrateFn,
    validate: Option<ValidateFn>,
}

impl MigrationDefinition {
    pub fn new<F>(version: u32, description: impl Into<String>, migrate: F) -> Self
    where
        F: Fn(&StateDocument) -> StepResult + Send + Sync + 'static,
    {
        Self {
            version,
            description: description.into(),
            migrate: Box::new(migrate),
            validate: None,
        }
    }

    /// Attach a check that must hold for the migrated document
    #[must_use]
    pub fn with_validation<V>(mut self, validate: V) -> Self
    where
        V: Fn(&StateDocument) -> bool + Send + Sync + 'static,
    {
        self.validate = Some(Box::new(validate));
        self
    }

    pub fn migrate(&self, document: &StateDocument) -> StepResult {
        (self.migrate)(document)
    }

    /// `true` when no validator is attached
    pub fn validate(&self, document: &StateDocument) -> bool {
        self.validate.as_ref().map_or(true, |validate| validate(document))
    }

    pub fn has_validation(&self) -> bool {
        self.validate.is_some()
    }
}

impl std::fmt::Debug for MigrationDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationDefinition")
            .field("version", &self.version)
            .field("description", &self.description)
            .field("has_validation", &self.has_validation())
            .finish_non_exhaustive()
    }
}

/// The set of known migrations.
///
/// Built once at startup and handed to the
/// [`MigrationEngine`](super::MigrationEngine). Registration order does not
/// matter; definitions are always kept in ascending version order.
#[derive(Debug, Default)]
pub struct MigrationRegistry {
    migrations: Vec<MigrationDefinition>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a migration.
    ///
    /// Version 0 and duplicate versions are programming errors and are
    /// rejected so startup fails fast.
    pub fn register(&mut self, definition: MigrationDefinition) -> Result<()> {
        if definition.version == 0 {
            return Err(Error::migration_registration(
                0,
                "migration version must be greater than 0",
            ));
        }

        match self
            .migrations
            .binary_search_by_key(&definition.version, |m| m.version)
        {
            Ok(_) => Err(Error::migration_registration(
                definition.version,
                "a migration for this version is already registered",
            )),
            Err(index) => {
                tracing::debug!(
                    version = definition.version,
                    description = %definition.description,
                    "Registered migration"
                );
                self.migrations.insert(index, definition);
                Ok(())
            }
        }
    }

    /// Builder-style [`register`](Self::register)
    pub fn with_migration(mut self, definition: MigrationDefinition) -> Result<Self> {
        self.register(definition)?;
        Ok(self)
    }

    /// Definitions with `from < version <= to`, ascending
    pub fn path(&self, from_version: u32, to_version: u32) -> Vec<&MigrationDefinition> {
        if from_version >= to_version {
            return Vec::new();
        }
        self.migrations
            .iter()
            .filter(|m| m.version > from_version && m.version <= to_version)
            .collect()
    }

    pub fn versions(&self) -> Vec<u32> {
        self.migrations.iter().map(|m| m.version).collect()
    }

    pub fn latest_version(&self) -> Option<u32> {
        self.migrations.last().map(|m| m.version)
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Drop every registered migration. Meant for test setup.
    #[doc(hidden)]
    pub fn reset(&mut self) {
        self.migrations.clear();
    }
}
