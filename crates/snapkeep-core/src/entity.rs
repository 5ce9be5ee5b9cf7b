//! Entity seam: the identity metadata and attribute view a host type
//! exposes so it can be snapshotted.
//!
//! Host types implement [`Entity`] once, statically. There is no runtime
//! discovery: the attribute list an entity returns is exactly what the
//! normalizer sees.

use serde_json::{Map, Value};
use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::ops::Deref;
use std::sync::Arc;

/// Upcast helper so hydrated entities can be downcast to concrete types
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// A domain object whose state can be captured in a snapshot
pub trait Entity: AsAny + 'static {
    /// Stable type tag stored as `source_class`
    fn entity_class(&self) -> &str;

    /// Identifier field values keyed by field name
    fn identifier_values(&self) -> Map<String, Value>;

    /// Attributes exposed to normalization, in output order
    fn attributes(&self) -> Vec<Attribute<'_>>;
}

/// Reference to a nested entity inside an attribute
pub enum EntityRef<'a> {
    Borrowed(&'a dyn Entity),
    Shared(Arc<dyn Entity>),
}

impl EntityRef<'_> {
    /// Identity used for cycle detection
    pub fn key(&self) -> EntityKey {
        EntityKey::of(&**self)
    }
}

/// Object identity of a borrowed entity: its address paired with its
/// concrete type
///
/// An inline child at offset 0 of its parent shares the parent's address,
/// as do zero-sized entities; the type keeps them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityKey {
    address: usize,
    type_id: TypeId,
}

impl EntityKey {
    pub fn of(entity: &dyn Entity) -> Self {
        Self {
            address: entity as *const dyn Entity as *const () as usize,
            type_id: Any::type_id(entity.as_any()),
        }
    }
}

impl Deref for EntityRef<'_> {
    type Target = dyn Entity;

    fn deref(&self) -> &Self::Target {
        match self {
            EntityRef::Borrowed(entity) => *entity,
            EntityRef::Shared(entity) => entity.as_ref(),
        }
    }
}

impl<'a, E: Entity> From<&'a E> for EntityRef<'a> {
    fn from(entity: &'a E) -> Self {
        EntityRef::Borrowed(entity)
    }
}

impl<'a> From<&'a dyn Entity> for EntityRef<'a> {
    fn from(entity: &'a dyn Entity) -> Self {
        EntityRef::Borrowed(entity)
    }
}

impl<E: Entity> From<Arc<E>> for EntityRef<'_> {
    fn from(entity: Arc<E>) -> Self {
        EntityRef::Shared(entity)
    }
}

/// Value of one attribute
pub enum AttributeValue<'a> {
    Scalar(Value),
    Entity(EntityRef<'a>),
    Collection(Vec<EntityRef<'a>>),
}

/// One named attribute of an entity, with its serialization groups
pub struct Attribute<'a> {
    name: Cow<'a, str>,
    groups: Vec<Cow<'a, str>>,
    value: AttributeValue<'a>,
}

impl<'a> Attribute<'a> {
    fn with_value(name: impl Into<Cow<'a, str>>, value: AttributeValue<'a>) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
            value,
        }
    }

    /// Plain JSON value
    pub fn scalar(name: impl Into<Cow<'a, str>>, value: impl Into<Value>) -> Self {
        Self::with_value(name, AttributeValue::Scalar(value.into()))
    }

    /// Nested entity
    pub fn entity(name: impl Into<Cow<'a, str>>, entity: impl Into<EntityRef<'a>>) -> Self {
        Self::with_value(name, AttributeValue::Entity(entity.into()))
    }

    /// Nested entity that may be absent; `None` normalizes to null
    pub fn optional_entity<E: Entity>(name: impl Into<Cow<'a, str>>, entity: Option<&'a E>) -> Self {
        match entity {
            Some(entity) => Self::entity(name, entity),
            None => Self::scalar(name, Value::Null),
        }
    }

    /// Collection of nested entities
    pub fn collection<I, R>(name: impl Into<Cow<'a, str>>, items: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<EntityRef<'a>>,
    {
        Self::with_value(
            name,
            AttributeValue::Collection(items.into_iter().map(Into::into).collect()),
        )
    }

    /// Tag the attribute with serialization groups
    pub fn in_groups(mut self, groups: &[&'a str]) -> Self {
        self.groups.extend(groups.iter().map(|g| Cow::Borrowed(*g)));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.as_ref())
    }

    pub fn value(&self) -> &AttributeValue<'a> {
        &self.value
    }

    pub fn into_parts(self) -> (Cow<'a, str>, AttributeValue<'a>) {
        (self.name, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Tag {
        id: i64,
    }

    impl Entity for Tag {
        fn entity_class(&self) -> &str {
            "Tag"
        }

        fn identifier_values(&self) -> Map<String, Value> {
            let mut ids = Map::new();
            ids.insert("id".into(), json!(self.id));
            ids
        }

        fn attributes(&self) -> Vec<Attribute<'_>> {
            vec![Attribute::scalar("id", self.id).in_groups(&["snapshot"])]
        }
    }

    #[test]
    fn test_entity_ref_keys_match_for_same_object() {
        let tag = Tag { id: 1 };
        let a = EntityRef::from(&tag);
        let b = EntityRef::Borrowed(&tag as &dyn Entity);
        assert_eq!(a.key(), b.key());

        let shared = Arc::new(Tag { id: 2 });
        let via_arc = EntityRef::from(shared.clone());
        assert_eq!(via_arc.key(), EntityKey::of(shared.as_ref()));
    }

    #[test]
    fn test_inline_child_at_same_address_has_distinct_key() {
        struct Wrapper {
            tag: Tag,
        }

        impl Entity for Wrapper {
            fn entity_class(&self) -> &str {
                "Wrapper"
            }

            fn identifier_values(&self) -> Map<String, Value> {
                self.tag.identifier_values()
            }

            fn attributes(&self) -> Vec<Attribute<'_>> {
                vec![Attribute::entity("tag", &self.tag)]
            }
        }

        let wrapper = Wrapper { tag: Tag { id: 3 } };
        let outer = &wrapper as &dyn Entity as *const dyn Entity as *const ();
        let inner = &wrapper.tag as &dyn Entity as *const dyn Entity as *const ();
        assert_eq!(outer, inner);
        assert_ne!(EntityKey::of(&wrapper), EntityKey::of(&wrapper.tag));
    }

    #[test]
    fn test_downcast_through_as_any() {
        let boxed: Box<dyn Entity> = Box::new(Tag { id: 5 });
        assert_eq!(boxed.entity_class(), "Tag");
        let tag = boxed.into_any().downcast::<Tag>().ok().map(|t| t.id);
        assert_eq!(tag, Some(5));
    }

    #[test]
    fn test_attribute_groups() {
        let tag = Tag { id: 1 };
        let attrs = tag.attributes();
        assert_eq!(attrs[0].name(), "id");
        assert_eq!(attrs[0].groups().collect::<Vec<_>>(), vec!["snapshot"]);
    }
}
