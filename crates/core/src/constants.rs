/// Constants used throughout the hyvve-state workspace
// Engine-owned key namespace
pub const HYVVE_KEY_PREFIX: &str = "hyvve-";
pub const COMPRESSED_FLAG_SUFFIX: &str = ":compressed";
pub const COMPRESSED_FLAG_VALUE: &str = "true";
pub const AVAILABILITY_PROBE_KEY: &str = "__hyvve_storage_test__";

// Compression
pub const COMPRESSION_THRESHOLD: usize = 50 * 1024;
pub const COMPRESS_OPERATION: &str = "compress";

// Quota accounting
pub const MAX_STORAGE_SIZE: u64 = 5 * 1024 * 1024;
pub const WARNING_THRESHOLD: f64 = 0.8;
pub const CRITICAL_THRESHOLD: f64 = 0.95;
pub const DEFAULT_CLEANUP_TARGET: u64 = 100 * 1024;
pub const BYTES_PER_CHAR_UNIT: u64 = 2;

// Schema versions
pub const CURRENT_SCHEMA_VERSION: u32 = 1;
pub const LEGACY_SCHEMA_VERSION: u32 = 1;

// Environment variable names
pub const HYVVE_KEY_PREFIX_VAR: &str = "HYVVE_KEY_PREFIX";
pub const HYVVE_MAX_STORAGE_SIZE_VAR: &str = "HYVVE_MAX_STORAGE_SIZE";
pub const HYVVE_COMPRESSION_THRESHOLD_VAR: &str = "HYVVE_COMPRESSION_THRESHOLD";
pub const HYVVE_CLEANUP_TARGET_VAR: &str = "HYVVE_CLEANUP_TARGET";
pub const HYVVE_DEV_LOGGING_VAR: &str = "HYVVE_DEV_LOGGING";
