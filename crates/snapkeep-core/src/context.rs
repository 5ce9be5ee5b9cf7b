//! Serializer context: the option map passed to normalizers and
//! denormalizers, plus the one option that is code rather than data.

use crate::entity::Entity;
use crate::errors::Result;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Free-form serializer options keyed by name
pub type Context = Map<String, Value>;

/// Attribute group filter: a string or an array of strings
pub const GROUPS: &str = "groups";
/// Attribute names never emitted
pub const IGNORED_ATTRIBUTES: &str = "ignored_attributes";
/// Whether `max_depth` is honoured
pub const ENABLE_MAX_DEPTH: &str = "enable_max_depth";
/// Nesting depth beyond which entities render as their source id
pub const MAX_DEPTH: &str = "max_depth";
/// Existing object a denormalizer may populate instead of creating one
pub const OBJECT_TO_POPULATE: &str = "object_to_populate";

/// Group matching every attribute
pub const ALL_GROUPS: &str = "*";

/// Substitutes a value for an entity revisited during normalization
pub type CircularReferenceHandler = Arc<dyn Fn(&dyn Entity) -> Result<Value> + Send + Sync>;

/// Shallow merge: keys in `overrides` replace keys in `base`
pub fn merge(base: &Context, overrides: &Context) -> Context {
    let mut merged = base.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Options plus the optional circular-reference handler
#[derive(Clone, Default)]
pub struct SerializerContext {
    options: Context,
    circular_reference_handler: Option<CircularReferenceHandler>,
}

impl SerializerContext {
    pub fn new(options: Context) -> Self {
        Self {
            options,
            circular_reference_handler: None,
        }
    }

    pub fn with_circular_reference_handler(mut self, handler: CircularReferenceHandler) -> Self {
        self.circular_reference_handler = Some(handler);
        self
    }

    /// Copy of this context with `overrides` merged over its options
    pub fn merged_with(&self, overrides: &Context) -> Self {
        Self {
            options: merge(&self.options, overrides),
            circular_reference_handler: self.circular_reference_handler.clone(),
        }
    }

    pub fn options(&self) -> &Context {
        &self.options
    }

    pub fn into_options(self) -> Context {
        self.options
    }

    pub fn circular_reference_handler(&self) -> Option<&CircularReferenceHandler> {
        self.circular_reference_handler.as_ref()
    }

    /// Requested groups, or `None` when no group filter applies
    pub fn groups(&self) -> Option<Vec<String>> {
        match self.options.get(GROUPS)? {
            Value::String(group) => Some(vec![group.clone()]),
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            ),
            _ => None,
        }
    }

    pub fn ignored_attributes(&self) -> Vec<String> {
        self.options
            .get(IGNORED_ATTRIBUTES)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Effective depth limit; `None` unless `enable_max_depth` is true
    pub fn max_depth(&self) -> Option<u64> {
        let enabled = self
            .options
            .get(ENABLE_MAX_DEPTH)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if !enabled {
            return None;
        }
        self.options.get(MAX_DEPTH).and_then(Value::as_u64)
    }
}

impl std::fmt::Debug for SerializerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializerContext")
            .field("options", &self.options)
            .field(
                "circular_reference_handler",
                &self.circular_reference_handler.is_some(),
            )
            .finish()
    }
}
