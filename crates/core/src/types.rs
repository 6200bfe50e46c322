//! The persisted dashboard state document

use crate::constants::LEGACY_SCHEMA_VERSION;
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn legacy_version() -> u32 {
    LEGACY_SCHEMA_VERSION
}

/// A dashboard state snapshot as it is persisted.
///
/// `version` and `timestamp` are the only fields the engine interprets. All
/// domain data (widget payloads, selections, loading and error flags) lives
/// in `fields` and is flattened into the same JSON object on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    /// Schema generation the document conforms to
    #[serde(default = "legacy_version")]
    pub version: u32,
    /// Write time in Unix epoch milliseconds
    #[serde(default)]
    pub timestamp: i64,
    /// Domain fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl StateDocument {
    /// Create an empty document at `version`
    pub fn new(version: u32) -> Self {
        Self {
            version,
            timestamp: 0,
            fields: Map::new(),
        }
    }

    /// Builder-style field setter
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn set_field(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn remove_field(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    /// Serialize to the JSON text that gets persisted
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::serialization("serialize document", e))
    }

    /// Parse a persisted JSON document
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::serialization("deserialize document", e))
    }
}
