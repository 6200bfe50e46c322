//! Forward schema migration of stored documents

mod engine;
mod registry;

pub use engine::{MigrationEngine, MigrationResult};
pub use registry::{MigrationDefinition, MigrationRegistry, StepError, StepResult};

#[cfg(test)]
mod tests;
