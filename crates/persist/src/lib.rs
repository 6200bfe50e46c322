//! Durable dashboard state for hyvve-state
//!
//! Three cooperating parts sit on top of a string-valued [`HostStore`]:
//!
//! - [`codec`]: threshold-gated gzip + base64 compression with metrics;
//! - [`quota`]: usage measurement, warnings, and eviction of the oldest
//!   engine-owned entries when the host is full;
//! - [`migration`]: ordered forward migration of stored documents to the
//!   current schema version.
//!
//! [`StatePersistence`] wires them together for named documents.
//!
//! ```no_run
//! use hyvve_persist::{
//!     InMemoryHostStore, MigrationRegistry, PersistenceConfig, StatePersistence,
//!     TracingMetricsSink,
//! };
//! use hyvve_core::StateDocument;
//! use std::sync::Arc;
//!
//! # fn main() -> hyvve_core::Result<()> {
//! let persistence = StatePersistence::new(
//!     Arc::new(InMemoryHostStore::new()),
//!     PersistenceConfig::from_env()?,
//!     MigrationRegistry::new(),
//!     Arc::new(TracingMetricsSink),
//! )?;
//!
//! let document = StateDocument::new(1).with_field("widgets", serde_json::json!({}));
//! persistence.save("dashboard", &document)?;
//! let state = persistence.load_or_default("dashboard");
//! # let _ = state;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod host;
pub mod migration;
pub mod persistence;
pub mod quota;

pub use codec::{
    CompressionCodec, CompressionEvent, CompressionMetrics, CompressionOutput, MetricsSink,
    NoopMetricsSink, RecordingMetricsSink, TracingMetricsSink,
};
pub use config::{PersistenceConfig, PersistenceConfigBuilder};
pub use host::{FileHostStore, HostStore, InMemoryHostStore};
pub use migration::{
    MigrationDefinition, MigrationEngine, MigrationRegistry, MigrationResult, StepError, StepResult,
};
pub use persistence::{LoadedState, SaveOutcome, StatePersistence};
pub use quota::{QuotaAwareStore, StorageResult, StorageUsage};
