use clap::Parser;
use eyre::WrapErr;
use hyvve_persist::{
    FileHostStore, MigrationRegistry, PersistenceConfig, StatePersistence, TracingMetricsSink,
};
use hyvve_utils::XdgPaths;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod commands;

use commands::Commands;

#[derive(Parser)]
#[command(name = "hyvve-state")]
#[command(about = "Inspect and maintain persisted dashboard state", long_about = None)]
#[command(version)]
struct Cli {
    /// Store file (defaults to $XDG_DATA_HOME/hyvve/storage.json)
    #[arg(long, value_name = "PATH")]
    store: Option<PathBuf>,

    /// Capacity of the store in bytes (defaults to the configured max storage size)
    #[arg(long, value_name = "BYTES")]
    capacity: Option<u64>,

    /// JSON configuration file (defaults to $XDG_CONFIG_HOME/hyvve/config.json if present)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn load_config(explicit: Option<&Path>) -> eyre::Result<PersistenceConfig> {
    let config = match explicit {
        Some(path) => PersistenceConfig::from_file(path)?,
        None => {
            let default_path = XdgPaths::config_file();
            if default_path.exists() {
                PersistenceConfig::from_file(&default_path)?
            } else {
                PersistenceConfig::from_env()?
            }
        }
    };
    Ok(config)
}

fn open(cli: &Cli) -> eyre::Result<StatePersistence> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(capacity) = cli.capacity {
        config.max_storage_size = capacity;
    }

    let path = cli.store.clone().unwrap_or_else(XdgPaths::store_file);
    let host = FileHostStore::open(&path)
        .wrap_err_with(|| format!("Failed to open store at {}", path.display()))?
        .with_capacity(config.max_storage_size);

    tracing::debug!(store = %path.display(), capacity = config.max_storage_size, "Opened store");

    let persistence = StatePersistence::new(
        Arc::new(host),
        config,
        MigrationRegistry::new(),
        Arc::new(TracingMetricsSink),
    )?;
    Ok(persistence)
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    hyvve_utils::tracing::init().map_err(|e| eyre::eyre!("Failed to initialize logging: {e}"))?;

    let cli = Cli::parse();
    let persistence = open(&cli)?;

    let stdout = std::io::stdout();
    cli.command.execute(&persistence, &mut stdout.lock())
}
