//! Source identity resolution.
//!
//! A snapshot is keyed by `(source_class, source_id)`. The class comes from
//! the entity's type tag; the id is derived from its identifier values:
//!
//! - exactly one value: its plain string form (`42`, `abc`)
//! - several values: canonical JSON of the whole map, keys sorted
//!   (`{"key1":"abc","key2":123}`)
//!
//! The same logical entity therefore always maps to the same `source_id`.

use crate::entity::Entity;
use crate::errors::SnapshotError;
use crate::snapshot::digest::canonical_json;
use serde::Serialize;
use serde_json::{Map, Value};

/// The `(source_class, source_id)` pair a snapshot belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SourceIdentity {
    pub source_class: String,
    pub source_id: String,
}

impl SourceIdentity {
    /// Build an identity from already-resolved parts
    pub fn new(source_class: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            source_class: source_class.into(),
            source_id: source_id.into(),
        }
    }

    /// Resolve the identity of an entity from its identity metadata
    ///
    /// # Errors
    ///
    /// `SnapshotError::MissingIdentity` when the entity reports no
    /// identifier values, or a single null one (not yet persisted).
    pub fn of(entity: &dyn Entity) -> Result<Self, SnapshotError> {
        let class = entity.entity_class();
        let source_id = encode_source_id(&entity.identifier_values()).ok_or_else(|| {
            SnapshotError::MissingIdentity {
                class: class.to_string(),
            }
        })?;
        Ok(Self::new(class, source_id))
    }
}

impl std::fmt::Display for SourceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.source_class, self.source_id)
    }
}

/// Encode identifier values into a stable `source_id` string.
///
/// Returns `None` when there is nothing to encode.
pub fn encode_source_id(id_values: &Map<String, Value>) -> Option<String> {
    match id_values.len() {
        0 => None,
        1 => id_values.values().next().and_then(scalar_to_string),
        _ => Some(canonical_json(&Value::Object(id_values.clone()))),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        nested => Some(canonical_json(nested)),
    }
}
