//! Core types, errors, and constants for hyvve-state.
//!
//! - **`errors`**: the workspace `Error` enum and `Result` alias, plus the
//!   typed `CompressionError` and `HostStoreError` failures.
//! - **`types`**: the persisted `StateDocument`.
//! - **`units`**: host string size accounting.
//! - **`constants`**: thresholds, key namespace, and environment variables.

pub mod constants;
pub mod errors;
pub mod types;
pub mod units;

pub use self::{
    constants::*,
    errors::{CompressionError, Error, HostStoreError, Result},
    types::StateDocument,
    units::{char_units, entry_size},
};
