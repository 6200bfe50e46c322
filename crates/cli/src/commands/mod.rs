use clap::Subcommand;
use eyre::{bail, WrapErr};
use hyvve_core::StateDocument;
use hyvve_persist::StatePersistence;
use std::io::Write;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Show how much of the store is in use
    Usage,
    /// List engine-owned keys
    Keys,
    /// Check whether the store accepts writes
    Probe,
    /// Print a stored state document, migrated to the current schema
    Get {
        /// Document name, without the key prefix
        name: String,
    },
    /// Store a JSON state document read from a file
    Put {
        /// Document name, without the key prefix
        name: String,
        /// File containing the JSON document
        file: PathBuf,
    },
    /// Evict the oldest engine-owned entries
    Cleanup {
        /// Bytes to free (defaults to the configured cleanup target)
        #[arg(long)]
        bytes: Option<u64>,
    },
    /// Remove every engine-owned entry, leaving other keys alone
    Clear,
}

impl Commands {
    pub fn execute(self, persistence: &StatePersistence, out: &mut impl Write) -> eyre::Result<()> {
        let store = persistence.store();

        match self {
            Commands::Usage => {
                let usage = store.get_storage_usage();
                writeln!(out, "{}", serde_json::to_string_pretty(&usage)?)?;
                if store.is_critical_quota() {
                    tracing::error!("Storage is critically full");
                } else if store.is_above_warning() {
                    tracing::warn!("Storage usage is high");
                }
                Ok(())
            }
            Commands::Keys => {
                for key in store.get_hyvve_storage_keys() {
                    writeln!(out, "{key}")?;
                }
                Ok(())
            }
            Commands::Probe => {
                if !store.is_storage_available() {
                    bail!("Storage not available");
                }
                writeln!(out, "available")?;
                Ok(())
            }
            Commands::Get { name } => {
                let Some(loaded) = persistence.load(&name)? else {
                    bail!("No state stored under '{name}'");
                };
                if let Some(migration) = &loaded.migration {
                    tracing::info!(
                        from_version = migration.from_version,
                        to_version = migration.to_version,
                        applied = ?migration.migrations_applied,
                        "Migrated stored state"
                    );
                }
                writeln!(out, "{}", serde_json::to_string_pretty(&loaded.document)?)?;
                Ok(())
            }
            Commands::Put { name, file } => {
                let text = std::fs::read_to_string(&file)
                    .wrap_err_with(|| format!("Failed to read {}", file.display()))?;
                let document = StateDocument::from_json(&text)?;

                let outcome = persistence.save(&name, &document)?;
                if !outcome.result.success {
                    bail!(
                        "Failed to store '{name}': {}",
                        outcome.result.error.unwrap_or_default()
                    );
                }
                if let Some(warning) = &outcome.result.warning {
                    tracing::warn!("{warning}");
                }
                writeln!(
                    out,
                    "stored {} ({} -> {} chars, compressed: {})",
                    persistence.data_key(&name),
                    outcome.metrics.original_size,
                    outcome.metrics.compressed_size,
                    outcome.metrics.was_compressed
                )?;
                Ok(())
            }
            Commands::Cleanup { bytes } => {
                let target = bytes.unwrap_or_else(|| store.cleanup_target());
                let freed = store.cleanup_old_entries(target);
                writeln!(out, "freed {freed} bytes")?;
                Ok(())
            }
            Commands::Clear => {
                let removed = store.clear_hyvve_storage();
                writeln!(out, "removed {removed} entries")?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyvve_persist::{
        HostStore, InMemoryHostStore, MigrationRegistry, NoopMetricsSink, PersistenceConfig,
    };
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup() -> (Arc<InMemoryHostStore>, StatePersistence) {
        let host = Arc::new(InMemoryHostStore::new());
        let persistence = StatePersistence::new(
            host.clone(),
            PersistenceConfig::default(),
            MigrationRegistry::new(),
            Arc::new(NoopMetricsSink),
        )
        .unwrap();
        (host, persistence)
    }

    fn run(command: Commands, persistence: &StatePersistence) -> eyre::Result<String> {
        let mut out = Vec::new();
        command.execute(persistence, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_put_then_get() {
        let (_, persistence) = setup();
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("state.json");
        std::fs::write(&file, r#"{"version":1,"widgets":{"w1":{"kind":"table"}}}"#).unwrap();

        let stored = run(
            Commands::Put {
                name: "dashboard".into(),
                file,
            },
            &persistence,
        )
        .unwrap();
        assert!(stored.starts_with("stored hyvve-dashboard"));

        let printed = run(Commands::Get { name: "dashboard".into() }, &persistence).unwrap();
        let document = StateDocument::from_json(&printed).unwrap();
        assert_eq!(document.field("widgets").unwrap()["w1"]["kind"], "table");
    }

    #[test]
    fn test_get_missing_is_an_error() {
        let (_, persistence) = setup();
        let err = run(Commands::Get { name: "nope".into() }, &persistence).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_keys_and_clear() {
        let (host, persistence) = setup();
        host.set_item("hyvve-a", "{}").unwrap();
        host.set_item("foreign", "x").unwrap();

        assert_eq!(run(Commands::Keys, &persistence).unwrap(), "hyvve-a\n");
        assert_eq!(run(Commands::Clear, &persistence).unwrap(), "removed 1 entries\n");
        assert!(host.get_item("foreign").unwrap().is_some());
    }

    #[test]
    fn test_availability_and_usage() {
        let (host, persistence) = setup();
        assert_eq!(run(Commands::Probe, &persistence).unwrap(), "available\n");

        host.set_item("hyvve-a", "{}").unwrap();
        let usage: serde_json::Value =
            serde_json::from_str(&run(Commands::Usage, &persistence).unwrap()).unwrap();
        assert_eq!(usage["bytesUsed"], 18);
        assert_eq!(usage["itemCount"], 1);

        host.set_available(false);
        assert!(run(Commands::Probe, &persistence).is_err());
    }

    #[test]
    fn test_cleanup_with_explicit_target() {
        let (host, persistence) = setup();
        host.set_item("hyvve-old", r#"{"timestamp":1}"#).unwrap();
        host.set_item("hyvve-new", r#"{"timestamp":2}"#).unwrap();

        let output = run(Commands::Cleanup { bytes: Some(1) }, &persistence).unwrap();
        assert_eq!(output, "freed 48 bytes\n");
        assert!(host.get_item("hyvve-old").unwrap().is_none());
        assert!(host.get_item("hyvve-new").unwrap().is_some());
    }
}
