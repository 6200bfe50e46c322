//! Persistence configuration with defaults, environment overrides and validation
use hyvve_core::constants::{
    COMPRESSION_THRESHOLD, CRITICAL_THRESHOLD, CURRENT_SCHEMA_VERSION, DEFAULT_CLEANUP_TARGET,
    HYVVE_CLEANUP_TARGET_VAR, HYVVE_COMPRESSION_THRESHOLD_VAR, HYVVE_DEV_LOGGING_VAR,
    HYVVE_KEY_PREFIX, HYVVE_KEY_PREFIX_VAR, HYVVE_MAX_STORAGE_SIZE_VAR, MAX_STORAGE_SIZE,
    WARNING_THRESHOLD,
};
use hyvve_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;

/// Settings shared by the codec, the quota-aware store and the migration engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistenceConfig {
    /// Literal prefix marking engine-owned keys
    pub key_prefix: String,
    /// Text longer than this many character units gets compressed
    pub compression_threshold: usize,
    /// Assumed capacity of the host store in bytes
    pub max_storage_size: u64,
    /// Usage fraction that triggers a warning
    pub warning_threshold: f64,
    /// Usage fraction that triggers a critical warning
    pub critical_threshold: f64,
    /// Minimum number of bytes to evict when a write hits the quota
    pub cleanup_target: u64,
    /// Schema version documents are migrated to
    pub current_version: u32,
    /// Emit development diagnostics (success events, size ratios)
    pub dev_logging: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            key_prefix: HYVVE_KEY_PREFIX.to_string(),
            compression_threshold: COMPRESSION_THRESHOLD,
            max_storage_size: MAX_STORAGE_SIZE,
            warning_threshold: WARNING_THRESHOLD,
            critical_threshold: CRITICAL_THRESHOLD,
            cleanup_target: DEFAULT_CLEANUP_TARGET,
            current_version: CURRENT_SCHEMA_VERSION,
            dev_logging: cfg!(debug_assertions),
        }
    }
}

impl PersistenceConfig {
    /// Start a builder from the defaults
    pub fn builder() -> PersistenceConfigBuilder {
        PersistenceConfigBuilder::new()
    }

    /// Defaults overridden by `HYVVE_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::file_system(path, "read config file", e))?;
        let mut config: Self = serde_json::from_str(&content)
            .map_err(|e| Error::serialization("parse config file", e))?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(prefix) = env::var(HYVVE_KEY_PREFIX_VAR) {
            self.key_prefix = prefix;
        }
        if let Some(size) = parse_env(HYVVE_MAX_STORAGE_SIZE_VAR)? {
            self.max_storage_size = size;
        }
        if let Some(threshold) = parse_env(HYVVE_COMPRESSION_THRESHOLD_VAR)? {
            self.compression_threshold = threshold;
        }
        if let Some(target) = parse_env(HYVVE_CLEANUP_TARGET_VAR)? {
            self.cleanup_target = target;
        }
        if let Some(dev_logging) = parse_env(HYVVE_DEV_LOGGING_VAR)? {
            self.dev_logging = dev_logging;
        }
        Ok(())
    }

    /// Check invariants between fields
    pub fn validate(&self) -> Result<()> {
        if self.key_prefix.is_empty() {
            return Err(Error::configuration("key prefix must not be empty"));
        }
        if self.max_storage_size == 0 {
            return Err(Error::configuration("max storage size must be positive"));
        }
        if self.current_version == 0 {
            return Err(Error::configuration("current schema version must be at least 1"));
        }
        let in_range = |t: f64| t > 0.0 && t <= 1.0;
        if !in_range(self.warning_threshold) || !in_range(self.critical_threshold) {
            return Err(Error::configuration(format!(
                "quota thresholds must be in (0, 1], got warning={} critical={}",
                self.warning_threshold, self.critical_threshold
            )));
        }
        if self.warning_threshold > self.critical_threshold {
            return Err(Error::configuration(format!(
                "warning threshold {} exceeds critical threshold {}",
                self.warning_threshold, self.critical_threshold
            )));
        }
        Ok(())
    }
}

fn parse_env<T: FromStr>(var: &str) -> Result<Option<T>> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::configuration(format!("invalid value for {var}: '{raw}'"))),
        Err(_) => Ok(None),
    }
}

/// Builder for creating persistence configurations
pub struct PersistenceConfigBuilder {
    config: PersistenceConfig,
}

impl PersistenceConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: PersistenceConfig::default(),
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.key_prefix = prefix.into();
        self
    }

    pub fn with_compression_threshold(mut self, threshold: usize) -> Self {
        self.config.compression_threshold = threshold;
        self
    }

    pub fn with_max_storage_size(mut self, bytes: u64) -> Self {
        self.config.max_storage_size = bytes;
        self
    }

    pub fn with_warning_threshold(mut self, fraction: f64) -> Self {
        self.config.warning_threshold = fraction;
        self
    }

    pub fn with_critical_threshold(mut self, fraction: f64) -> Self {
        self.config.critical_threshold = fraction;
        self
    }

    pub fn with_cleanup_target(mut self, bytes: u64) -> Self {
        self.config.cleanup_target = bytes;
        self
    }

    pub fn with_current_version(mut self, version: u32) -> Self {
        self.config.current_version = version;
        self
    }

    pub fn with_dev_logging(mut self, enabled: bool) -> Self {
        self.config.dev_logging = enabled;
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<PersistenceConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for PersistenceConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn clear_env() {
        for var in [
            HYVVE_KEY_PREFIX_VAR,
            HYVVE_MAX_STORAGE_SIZE_VAR,
            HYVVE_COMPRESSION_THRESHOLD_VAR,
            HYVVE_CLEANUP_TARGET_VAR,
            HYVVE_DEV_LOGGING_VAR,
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults_match_constants() {
        let config = PersistenceConfig::default();
        assert_eq!(config.compression_threshold, 50 * 1024);
        assert_eq!(config.max_storage_size, 5 * 1024 * 1024);
        assert_eq!(config.warning_threshold, 0.8);
        assert_eq!(config.critical_threshold, 0.95);
        assert_eq!(config.cleanup_target, 100 * 1024);
        assert_eq!(config.key_prefix, "hyvve-");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_rejects_inverted_thresholds() {
        let err = PersistenceConfig::builder()
            .with_warning_threshold(0.9)
            .with_critical_threshold(0.5)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("exceeds critical threshold"));
    }

    #[test]
    fn test_builder_rejects_empty_prefix_and_zero_version() {
        assert!(PersistenceConfig::builder()
            .with_key_prefix("")
            .build()
            .is_err());
        assert!(PersistenceConfig::builder()
            .with_current_version(0)
            .build()
            .is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        env::set_var(HYVVE_MAX_STORAGE_SIZE_VAR, "1048576");
        env::set_var(HYVVE_KEY_PREFIX_VAR, "dash-");
        env::set_var(HYVVE_DEV_LOGGING_VAR, "false");

        let config = PersistenceConfig::from_env().unwrap();
        assert_eq!(config.max_storage_size, 1_048_576);
        assert_eq!(config.key_prefix, "dash-");
        assert!(!config.dev_logging);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_invalid_value() {
        clear_env();
        env::set_var(HYVVE_CLEANUP_TARGET_VAR, "lots");

        let err = PersistenceConfig::from_env().unwrap_err();
        assert!(err.to_string().contains(HYVVE_CLEANUP_TARGET_VAR));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_file_partial() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"maxStorageSize": 2048, "currentVersion": 4}"#).unwrap();

        let config = PersistenceConfig::from_file(&path).unwrap();
        assert_eq!(config.max_storage_size, 2048);
        assert_eq!(config.current_version, 4);
        assert_eq!(config.key_prefix, HYVVE_KEY_PREFIX);
    }
}
