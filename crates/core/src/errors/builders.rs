//! Builder methods for creating errors with context

use super::types::{CompressionError, Error, HostStoreError};
use std::path::PathBuf;

impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a migration registration error
    #[must_use]
    pub fn migration_registration(version: u32, reason: impl Into<String>) -> Self {
        Error::MigrationRegistration {
            version,
            reason: reason.into(),
        }
    }

    /// Create a serialization error for the named operation
    #[must_use]
    pub fn serialization(operation: &'static str, source: serde_json::Error) -> Self {
        Error::Serialization { operation, source }
    }

    /// Create a file system error
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }
}

impl CompressionError {
    /// Create a decompression error carrying the offending payload
    #[must_use]
    pub fn new(original_data: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            original_data: original_data.into(),
            reason: reason.into(),
        }
    }
}

impl HostStoreError {
    /// Create an unavailable-store error
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Create a generic backend error
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}
