//! Static capture schemas: which fields of a host type are snapshotted and
//! where each record goes.

use super::marker::SnapshotMarker;
use snapkeep_core::entity::Entity;
use snapkeep_core::errors::{Result, SnapshotError};
use snapkeep_core::snapshot::SnapshotRecord;
use std::any::{Any, TypeId};
use std::collections::HashMap;

type ReadFn<T> = Box<dyn for<'a> Fn(&'a T) -> FieldState<'a> + Send + Sync>;
type ClearFn<T> = Box<dyn Fn(&mut T) + Send + Sync>;
type TargetFn<T> = Box<dyn Fn(&mut T, SnapshotRecord) + Send + Sync>;

/// Current content of a marked field
pub enum FieldState<'a> {
    /// Nothing to capture
    Null,
    /// Already holds a snapshot record
    Snapshot,
    /// A live entity that will be captured
    Live(&'a dyn Entity),
}

impl<'a> FieldState<'a> {
    /// State of a plain optional entity field
    pub fn of<E: Entity>(value: Option<&'a E>) -> Self {
        match value {
            Some(entity) => FieldState::Live(entity),
            None => FieldState::Null,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, FieldState::Live(_))
    }
}

impl std::fmt::Debug for FieldState<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldState::Null => f.write_str("Null"),
            FieldState::Snapshot => f.write_str("Snapshot"),
            FieldState::Live(entity) => write!(f, "Live({})", entity.entity_class()),
        }
    }
}

/// Field type that holds either a live entity or its snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshottable<E> {
    Null,
    Live(E),
    Snapshot(SnapshotRecord),
}

// Manual so `E` needs no `Default`
impl<E> Default for Snapshottable<E> {
    fn default() -> Self {
        Snapshottable::Null
    }
}

impl<E: Entity> Snapshottable<E> {
    pub fn state(&self) -> FieldState<'_> {
        match self {
            Snapshottable::Null => FieldState::Null,
            Snapshottable::Live(entity) => FieldState::Live(entity),
            Snapshottable::Snapshot(_) => FieldState::Snapshot,
        }
    }
}

impl<E> Snapshottable<E> {
    pub fn clear(&mut self) {
        *self = Snapshottable::Null;
    }

    pub fn live(&self) -> Option<&E> {
        match self {
            Snapshottable::Live(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> Option<&SnapshotRecord> {
        match self {
            Snapshottable::Snapshot(record) => Some(record),
            _ => None,
        }
    }
}

/// One marked field with its accessors
pub struct MarkedField<T> {
    name: String,
    marker: SnapshotMarker,
    read: ReadFn<T>,
    clear: ClearFn<T>,
}

impl<T> MarkedField<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn marker(&self) -> &SnapshotMarker {
        &self.marker
    }

    pub fn read<'a>(&self, owner: &'a T) -> FieldState<'a> {
        (self.read)(owner)
    }

    pub fn clear(&self, owner: &mut T) {
        (self.clear)(owner)
    }

    /// Target field name this field's record is written to
    pub fn target(&self) -> String {
        self.marker.target_snapshot_property(&self.name)
    }
}

/// Marked fields and target setters of one host type
///
/// Marked fields are processed in registration order.
pub struct CaptureSchema<T> {
    class: String,
    fields: Vec<MarkedField<T>>,
    targets: HashMap<String, TargetFn<T>>,
}

impl<T> CaptureSchema<T> {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            fields: Vec::new(),
            targets: HashMap::new(),
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn fields(&self) -> &[MarkedField<T>] {
        &self.fields
    }

    /// Mark a field for snapshotting
    pub fn snapshot_field<R, C>(
        mut self,
        name: impl Into<String>,
        marker: SnapshotMarker,
        read: R,
        clear: C,
    ) -> Self
    where
        R: for<'a> Fn(&'a T) -> FieldState<'a> + Send + Sync + 'static,
        C: Fn(&mut T) + Send + Sync + 'static,
    {
        self.fields.push(MarkedField {
            name: name.into(),
            marker,
            read: Box::new(read),
            clear: Box::new(clear),
        });
        self
    }

    /// Declare a field that can receive a snapshot record
    pub fn target_field<S>(mut self, name: impl Into<String>, set: S) -> Self
    where
        S: Fn(&mut T, SnapshotRecord) + Send + Sync + 'static,
    {
        self.targets.insert(name.into(), Box::new(set));
        self
    }

    pub fn has_target(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }

    /// Resolve the target of `field`
    ///
    /// # Errors
    ///
    /// `InvalidSnapshotTarget` when no target field with that name exists.
    pub fn resolve_target(&self, field: &MarkedField<T>) -> Result<String> {
        let target = field.target();
        if self.has_target(&target) {
            Ok(target)
        } else {
            Err(SnapshotError::InvalidSnapshotTarget {
                class: self.class.clone(),
                field: field.name.clone(),
                target,
            }
            .into())
        }
    }

    /// Check every marked field resolves to a declared target
    ///
    /// # Errors
    ///
    /// `InvalidSnapshotTarget` for the first field that does not.
    pub fn validate(&self) -> Result<()> {
        for field in &self.fields {
            self.resolve_target(field)?;
        }
        Ok(())
    }

    /// Write `record` into the target field `target`
    ///
    /// Returns `false` when the target is not declared.
    pub fn assign_target(&self, owner: &mut T, target: &str, record: SnapshotRecord) -> bool {
        match self.targets.get(target) {
            Some(set) => {
                set(owner, record);
                true
            }
            None => false,
        }
    }
}

impl<T> std::fmt::Debug for CaptureSchema<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut targets: Vec<_> = self.targets.keys().collect();
        targets.sort();
        f.debug_struct("CaptureSchema")
            .field("class", &self.class)
            .field(
                "fields",
                &self.fields.iter().map(|f| f.name()).collect::<Vec<_>>(),
            )
            .field("targets", &targets)
            .finish()
    }
}

/// Capture schemas keyed by host type
#[derive(Default)]
pub struct CaptureRegistry {
    schemas: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl CaptureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the schema for `T`, replacing any previous one
    pub fn register<T: 'static>(&mut self, schema: CaptureSchema<T>) {
        tracing::debug!(
            class = %schema.class(),
            fields = schema.fields().len(),
            "Registered capture schema"
        );
        self.schemas.insert(TypeId::of::<T>(), Box::new(schema));
    }

    pub fn with_schema<T: 'static>(mut self, schema: CaptureSchema<T>) -> Self {
        self.register(schema);
        self
    }

    pub fn get<T: 'static>(&self) -> Option<&CaptureSchema<T>> {
        self.schemas
            .get(&TypeId::of::<T>())
            .and_then(|schema| schema.downcast_ref::<CaptureSchema<T>>())
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl std::fmt::Debug for CaptureRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureRegistry")
            .field("schemas", &self.schemas.len())
            .finish()
    }
}
