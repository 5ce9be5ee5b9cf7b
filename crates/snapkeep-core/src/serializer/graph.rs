//! Reference serializer walking [`Entity::attributes`].
//!
//! Normalization rules, applied per attribute:
//! - names listed in `ignored_attributes` are skipped
//! - with a non-empty `groups` filter, only attributes tagged with one of
//!   the requested groups (or with `*`) are emitted
//! - nested entities past `max_depth` (when `enable_max_depth` is set)
//!   render as their encoded source id
//! - an entity already on the current path is a cycle: the context's
//!   circular-reference handler supplies its value, or the walk fails
//!
//! Denormalization looks up a factory registered for the source class.

use crate::context::{Context, SerializerContext, ALL_GROUPS};
use crate::entity::{Attribute, AttributeValue, Entity, EntityKey};
use crate::errors::{ExError, ExErrorKind, Result, SnapshotError};
use crate::serializer::{Denormalizer, Normalizer};
use crate::snapshot::{encode_source_id, SnapshotData};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Builds an entity of one class from snapshot data
pub type EntityFactory =
    Box<dyn Fn(&SnapshotData, &Context) -> Result<Box<dyn Entity>> + Send + Sync>;

/// Attribute-driven normalizer with a per-class factory registry
#[derive(Default)]
pub struct GraphSerializer {
    factories: HashMap<String, EntityFactory>,
}

impl GraphSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for `class`, replacing any previous one
    pub fn with_factory<F>(mut self, class: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&SnapshotData, &Context) -> Result<Box<dyn Entity>> + Send + Sync + 'static,
    {
        self.factories.insert(class.into(), Box::new(factory));
        self
    }

    /// Register `T` for `class`, deserializing snapshot data with serde
    pub fn register_serde<T>(self, class: impl Into<String>) -> Self
    where
        T: Entity + DeserializeOwned,
    {
        let class = class.into();
        let tag = class.clone();
        self.with_factory(class, move |data, _context| {
            let entity: T = serde_json::from_value(Value::Object(data.clone())).map_err(|e| {
                ExError::new(ExErrorKind::Serialization)
                    .with_op("denormalize")
                    .with_entity_id(tag.clone())
                    .with_message(e.to_string())
            })?;
            Ok(Box::new(entity) as Box<dyn Entity>)
        })
    }

    pub fn has_factory(&self, class: &str) -> bool {
        self.factories.contains_key(class)
    }
}

impl std::fmt::Debug for GraphSerializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut classes: Vec<_> = self.factories.keys().collect();
        classes.sort();
        f.debug_struct("GraphSerializer")
            .field("factories", &classes)
            .finish()
    }
}

impl Normalizer for GraphSerializer {
    fn normalize(
        &self,
        entity: &dyn Entity,
        _format: Option<&str>,
        context: &SerializerContext,
    ) -> Result<Value> {
        let mut walk = Walk {
            context,
            groups: context.groups().filter(|groups| !groups.is_empty()),
            ignored: context.ignored_attributes(),
            max_depth: context.max_depth(),
            path: Vec::new(),
        };
        walk.object(entity, 0)
    }
}

impl Denormalizer for GraphSerializer {
    fn denormalize(
        &self,
        data: &SnapshotData,
        class: &str,
        _format: Option<&str>,
        context: &Context,
    ) -> Result<Box<dyn Entity>> {
        let factory = self
            .factories
            .get(class)
            .ok_or_else(|| SnapshotError::UnknownSourceClass {
                class: class.to_string(),
            })?;
        factory(data, context)
    }
}

struct Walk<'c> {
    context: &'c SerializerContext,
    groups: Option<Vec<String>>,
    ignored: Vec<String>,
    max_depth: Option<u64>,
    /// Entities currently being normalized, root first
    path: Vec<EntityKey>,
}

impl Walk<'_> {
    fn object(&mut self, entity: &dyn Entity, depth: u64) -> Result<Value> {
        self.path.push(EntityKey::of(entity));

        let mut out = Map::new();
        for attribute in entity.attributes() {
            if !self.includes(&attribute) {
                continue;
            }
            let (name, value) = attribute.into_parts();
            let value = match value {
                AttributeValue::Scalar(value) => value,
                AttributeValue::Entity(child) => self.nested(&*child, depth + 1)?,
                AttributeValue::Collection(items) => {
                    let mut values = Vec::with_capacity(items.len());
                    for item in &items {
                        values.push(self.nested(&**item, depth + 1)?);
                    }
                    Value::Array(values)
                }
            };
            out.insert(name.into_owned(), value);
        }

        self.path.pop();
        Ok(Value::Object(out))
    }

    fn nested(&mut self, entity: &dyn Entity, depth: u64) -> Result<Value> {
        if self.path.contains(&EntityKey::of(entity)) {
            return self.circular(entity);
        }
        if matches!(self.max_depth, Some(max) if depth > max) {
            return Ok(reference(entity));
        }
        self.object(entity, depth)
    }

    fn circular(&self, entity: &dyn Entity) -> Result<Value> {
        match self.context.circular_reference_handler() {
            Some(handler) => handler(entity),
            None => Err(SnapshotError::CircularReference {
                class: entity.entity_class().to_string(),
                source_id: encode_source_id(&entity.identifier_values()).unwrap_or_default(),
            }
            .into()),
        }
    }

    fn includes(&self, attribute: &Attribute<'_>) -> bool {
        if self.ignored.iter().any(|name| name == attribute.name()) {
            return false;
        }
        match &self.groups {
            None => true,
            Some(wanted) => {
                wanted.iter().any(|g| g == ALL_GROUPS)
                    || attribute
                        .groups()
                        .any(|g| g == ALL_GROUPS || wanted.iter().any(|w| w == g))
            }
        }
    }
}

fn reference(entity: &dyn Entity) -> Value {
    encode_source_id(&entity.identifier_values())
        .map(Value::String)
        .unwrap_or(Value::Null)
}
