//! Core error type definitions

use crate::types::StateDocument;
use std::path::PathBuf;

/// Result type alias for hyvve-state operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for hyvve-state operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// A migration definition was rejected at registration time
    #[error("invalid migration for version {version}: {reason}")]
    MigrationRegistration { version: u32, reason: String },

    /// A stored document could not be brought to the current schema
    #[error(
        "migration from v{from_version} to v{to_version} failed \
         after steps {migrations_applied:?}: {message}"
    )]
    Migration {
        from_version: u32,
        to_version: u32,
        migrations_applied: Vec<u32>,
        message: String,
        partial_state: Box<StateDocument>,
    },

    /// Stored data flagged as compressed could not be decoded
    #[error(transparent)]
    Compression(#[from] CompressionError),

    /// JSON serialization/deserialization errors
    #[error("JSON error during {operation}: {source}")]
    Serialization {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// File system operations
    #[error("file system {operation} operation failed for '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

/// Raised when a payload marked as compressed cannot be decompressed.
///
/// Decompression fails closed: the raw payload is handed back so the caller
/// can log it and fall back to a default document instead of parsing garbage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to decompress stored data ({} chars): {reason}", .original_data.len())]
pub struct CompressionError {
    /// The raw stored text that failed to decode
    pub original_data: String,
    /// What went wrong in the inverse transform
    pub reason: String,
}

/// Failures reported by a host key-value store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostStoreError {
    /// The write would exceed the host's capacity
    #[error("storage quota exceeded while writing '{key}'")]
    QuotaExceeded { key: String },

    /// The store is disabled, missing, or otherwise unusable
    #[error("storage not available: {reason}")]
    Unavailable { reason: String },

    /// Any other backend failure
    #[error("storage backend error: {message}")]
    Backend { message: String },
}

impl HostStoreError {
    /// Whether this is the host's distinct quota-exceeded signal
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}
