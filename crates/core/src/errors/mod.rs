//! Error types for hyvve-state operations

mod builders;
mod conversions;
mod types;

pub use types::{CompressionError, Error, HostStoreError, Result};
