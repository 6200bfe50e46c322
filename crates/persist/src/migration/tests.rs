//! Tests for migration registration and execution

use super::*;
use crate::config::PersistenceConfig;
use hyvve_core::{Error, StateDocument};
use serde_json::{json, Value};

/// A step that records its version in the document's `trail` array
fn trail_step(version: u32) -> MigrationDefinition {
    MigrationDefinition::new(version, format!("append {version} to trail"), move |doc| {
        let mut next = doc.clone();
        let mut trail = next
            .field("trail")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        trail.push(json!(version));
        next.set_field("trail", trail);
        Ok(next)
    })
}

fn failing_step(version: u32) -> MigrationDefinition {
    MigrationDefinition::new(version, "always fails", |_| Err("boom".into()))
}

fn engine_with(current_version: u32, steps: Vec<MigrationDefinition>) -> MigrationEngine {
    let mut registry = MigrationRegistry::new();
    for step in steps {
        registry.register(step).unwrap();
    }
    let config = PersistenceConfig::builder()
        .with_current_version(current_version)
        .with_dev_logging(true)
        .build()
        .unwrap();
    MigrationEngine::new(registry, &config)
}

fn trail(doc: &StateDocument) -> Vec<u64> {
    doc.field("trail")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_u64).collect())
        .unwrap_or_default()
}

#[test]
fn test_registry_sorted_regardless_of_order() {
    let mut registry = MigrationRegistry::new();
    registry.register(trail_step(4)).unwrap();
    registry.register(trail_step(2)).unwrap();
    registry.register(trail_step(3)).unwrap();

    assert_eq!(registry.versions(), vec![2, 3, 4]);
    assert_eq!(registry.latest_version(), Some(4));
    assert_eq!(registry.len(), 3);
}

#[test]
fn test_registry_rejects_zero_and_duplicates() {
    let mut registry = MigrationRegistry::new();
    assert!(matches!(
        registry.register(trail_step(0)),
        Err(Error::MigrationRegistration { version: 0, .. })
    ));

    registry.register(trail_step(2)).unwrap();
    assert!(matches!(
        registry.register(trail_step(2)),
        Err(Error::MigrationRegistration { version: 2, .. })
    ));
    assert_eq!(registry.versions(), vec![2]);
}

#[test]
fn test_registry_builder_and_reset() {
    let mut registry = MigrationRegistry::new()
        .with_migration(trail_step(2))
        .and_then(|r| r.with_migration(trail_step(3)))
        .unwrap();
    assert_eq!(registry.versions(), vec![2, 3]);

    registry.reset();
    assert!(registry.is_empty());
    assert!(MigrationRegistry::new()
        .with_migration(trail_step(0))
        .is_err());
}

#[test]
fn test_detect_version_mismatch() {
    let engine = engine_with(5, vec![]);
    assert!(engine.detect_version_mismatch(1));
    assert!(engine.detect_version_mismatch(4));
    assert!(!engine.detect_version_mismatch(5));
    assert!(!engine.detect_version_mismatch(9));
}

#[test]
fn test_migration_path() {
    let engine = engine_with(5, vec![trail_step(5), trail_step(2), trail_step(3), trail_step(4)]);

    let versions = |from, to| -> Vec<u32> {
        engine
            .get_migration_path(from, to)
            .iter()
            .map(|m| m.version)
            .collect()
    };
    assert_eq!(versions(1, 5), vec![2, 3, 4, 5]);
    assert_eq!(versions(2, 4), vec![3, 4]);
    assert!(versions(5, 5).is_empty());
    assert!(versions(5, 3).is_empty());
}

#[test]
fn test_applies_in_ascending_order() {
    let engine = engine_with(5, vec![trail_step(4), trail_step(2), trail_step(5), trail_step(3)]);

    let result = engine.migrate_state(StateDocument::new(1), 1, 5);

    assert!(result.success);
    assert_eq!(result.migrations_applied, vec![2, 3, 4, 5]);
    assert_eq!(trail(&result.migrated_state), vec![2, 3, 4, 5]);
    assert_eq!(result.migrated_state.version, 5);
    assert_eq!((result.from_version, result.to_version), (1, 5));
    assert!(result.error.is_none());
}

#[test]
fn test_gaps_are_skipped() {
    let engine = engine_with(5, vec![trail_step(2), trail_step(5)]);

    let result = engine.migrate_state(StateDocument::new(1), 1, 5);

    assert!(result.success);
    assert_eq!(result.migrations_applied, vec![2, 5]);
    assert_eq!(result.migrated_state.version, 5);
}

#[test]
fn test_failure_preserves_partial_progress() {
    let engine = engine_with(5, vec![trail_step(2), failing_step(3), trail_step(4)]);

    let result = engine.migrate_state(StateDocument::new(1), 1, 5);

    assert!(!result.success);
    assert_eq!(result.migrations_applied, vec![2]);
    assert_eq!(trail(&result.migrated_state), vec![2]);
    // Not stamped: the document never reached the target
    assert_eq!(result.migrated_state.version, 1);
    let error = result.error.unwrap();
    assert!(error.contains("v3"), "{error}");
    assert!(error.contains("boom"), "{error}");
}

#[test]
fn test_validation_failure_halts() {
    let rejecting = trail_step(3).with_validation(|doc| doc.field("required").is_some());
    assert!(rejecting.has_validation());
    let engine = engine_with(4, vec![trail_step(2), rejecting, trail_step(4)]);

    let result = engine.migrate_state(StateDocument::new(1), 1, 4);

    assert!(!result.success);
    // The rejected step ran, so it is listed, but its output is discarded
    assert_eq!(result.migrations_applied, vec![2, 3]);
    assert_eq!(trail(&result.migrated_state), vec![2]);
    assert_eq!(result.migrated_state.version, 1);
    assert!(result.error.unwrap().contains("failed validation"));
}

#[test]
fn test_passing_validation() {
    let checked = trail_step(2).with_validation(|doc| !trail(doc).is_empty());
    let engine = engine_with(2, vec![checked]);

    let result = engine.migrate_state(StateDocument::new(1), 1, 2);
    assert!(result.success);
    assert_eq!(result.migrations_applied, vec![2]);
}

#[test]
fn test_noop_bounds() {
    let engine = engine_with(5, vec![trail_step(4), trail_step(5)]);
    let doc = StateDocument::new(3).with_field("keep", "me");

    for (from, to) in [(3, 3), (5, 3)] {
        let result = engine.migrate_state(doc.clone(), from, to);
        assert!(result.success);
        assert!(result.migrations_applied.is_empty());
        assert_eq!(result.migrated_state, doc);
    }
}

#[test]
fn test_empty_path_still_stamps_version() {
    let engine = engine_with(5, vec![]);

    let result = engine.migrate_state(StateDocument::new(2).with_field("a", 1), 2, 5);

    assert!(result.success);
    assert!(result.migrations_applied.is_empty());
    assert_eq!(result.migrated_state.version, 5);
    assert_eq!(result.migrated_state.field("a"), Some(&json!(1)));
}

#[test]
fn test_migrate_to_current_uses_embedded_version() {
    let engine = engine_with(3, vec![trail_step(2), trail_step(3)]);

    let result = engine.migrate_to_current(StateDocument::new(2));
    assert_eq!(result.migrations_applied, vec![3]);
    assert_eq!(result.migrated_state.version, 3);

    let newer = engine.migrate_to_current(StateDocument::new(7));
    assert!(newer.success);
    assert_eq!(newer.migrated_state.version, 7);
}

#[test]
fn test_register_through_engine() {
    let mut engine = engine_with(3, vec![trail_step(2)]);
    engine.register_migration(trail_step(3)).unwrap();
    assert!(engine.register_migration(trail_step(3)).is_err());
    assert_eq!(engine.registry().versions(), vec![2, 3]);
}

#[test]
fn test_default_state_is_current() {
    let engine = engine_with(4, vec![]);
    let state = engine.get_default_state();

    assert_eq!(state.version, 4);
    assert_eq!(engine.current_version(), 4);
    assert!(state.timestamp > 0);
    assert_eq!(state.field("widgets"), Some(&json!({})));
    assert_eq!(state.field("isLoading"), Some(&json!(false)));
    assert!(StateDocument::from_json(&state.to_json().unwrap()).is_ok());
}
