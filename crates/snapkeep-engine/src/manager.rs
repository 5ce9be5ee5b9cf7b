//! Snapshot manager: creation, hydration and lookup by entity.
//!
//! ## Creation pipeline (in order):
//! 1. Pre-snapshot event (subscribers may rewrite the context)
//! 2. Source identity resolution
//! 3. Serializer context = defaults merged with the call context
//! 4. Normalization (anything but an object is rejected)
//! 5. Record construction with `{"context": ...}` metadata
//! 6. Registration with the caller's unit of work (no flush)
//! 7. Post-snapshot event

use serde_json::{json, Value};
use snapkeep_core::config::SnapshotConfig;
use snapkeep_core::context::{
    merge, Context, SerializerContext, ENABLE_MAX_DEPTH, IGNORED_ATTRIBUTES, MAX_DEPTH,
    OBJECT_TO_POPULATE,
};
use snapkeep_core::entity::Entity;
use snapkeep_core::errors::{ExError, ExErrorKind, Result, SnapshotError};
use snapkeep_core::events::{EventDispatcher, PostSnapshotEvent, PreSnapshotEvent};
use snapkeep_core::serializer::Serializer;
use snapkeep_core::snapshot::{SnapshotData, SnapshotRecord, SourceIdentity};
use snapkeep_core::store::{SnapshotRepository, UnitOfWork};
use snapkeep_core::{log_op_end, log_op_error, log_op_start};
use std::sync::Arc;
use std::time::Instant;

/// Creates, hydrates and finds snapshots of entities
///
/// Configuration is fixed at construction; `is_auto_snapshot_enabled`
/// never re-reads the environment.
pub struct SnapshotManager {
    config: SnapshotConfig,
    serializer: Arc<dyn Serializer>,
    dispatcher: EventDispatcher,
}

impl SnapshotManager {
    pub fn new(config: SnapshotConfig, serializer: Arc<dyn Serializer>) -> Self {
        Self {
            config,
            serializer,
            dispatcher: EventDispatcher::default(),
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: EventDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    /// Whether lifecycle listeners should capture marked fields
    pub fn is_auto_snapshot_enabled(&self) -> bool {
        self.config.auto_snapshot_enabled
    }

    /// Serializer context applied under every call context
    ///
    /// A revisited object normalizes to its own `source_id`.
    pub fn default_context(&self) -> SerializerContext {
        let mut options = Context::new();
        options.insert(
            IGNORED_ATTRIBUTES.to_string(),
            json!(self.config.exclude_properties),
        );
        options.insert(ENABLE_MAX_DEPTH.to_string(), Value::Bool(true));
        options.insert(MAX_DEPTH.to_string(), json!(self.config.default_max_depth));

        SerializerContext::new(options).with_circular_reference_handler(Arc::new(
            |entity: &dyn Entity| -> Result<Value> {
                Ok(Value::String(SourceIdentity::of(entity)?.source_id))
            },
        ))
    }

    /// Snapshot `entity` and register the record with `uow`
    ///
    /// ## Returns
    ///
    /// The registered record. Its id is whatever the unit of work assigned;
    /// nothing is flushed.
    ///
    /// ## Errors
    ///
    /// - `InvalidInput`: the entity has no identifier values
    /// - `SnapshotSerializationFailure`: the serializer returned a non-object
    /// - serializer, subscriber and unit-of-work errors unchanged
    pub fn create(
        &self,
        uow: &mut dyn UnitOfWork,
        entity: &dyn Entity,
        context: Context,
    ) -> Result<SnapshotRecord> {
        log_op_start!("snapshot_create", source_class = entity.entity_class());
        let start = Instant::now();

        let record = self.create_impl(uow, entity, context).map_err(|e| {
            log_op_error!(
                "snapshot_create",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                source_class = entity.entity_class()
            );
            e
        })?;

        log_op_end!(
            "snapshot_create",
            duration_ms = start.elapsed().as_millis() as u64,
            source_class = record.source_class(),
            source_id = record.source_id(),
            snapshot_id = record.id().unwrap_or_default(),
            checksum = record.checksum()
        );

        Ok(record)
    }

    fn create_impl(
        &self,
        uow: &mut dyn UnitOfWork,
        entity: &dyn Entity,
        context: Context,
    ) -> Result<SnapshotRecord> {
        let mut pre = PreSnapshotEvent::new(entity, context);
        self.dispatcher.dispatch_pre(&mut pre)?;
        let context = pre.into_context();

        let identity = SourceIdentity::of(entity)?;
        let serializer_context = self.default_context().merged_with(&context);

        let data = match self.serializer.normalize(entity, None, &serializer_context)? {
            Value::Object(data) => data,
            other => {
                return Err(SnapshotError::SerializationFailure {
                    class: identity.source_class,
                    actual: json_type_name(&other).to_string(),
                }
                .into())
            }
        };

        let mut record = SnapshotRecord::new(identity, data);
        let mut metadata = SnapshotData::new();
        metadata.insert(
            "context".to_string(),
            Value::Object(serializer_context.into_options()),
        );
        record.set_metadata(Some(metadata));

        uow.persist(&mut record)?;

        self.dispatcher
            .dispatch_post(&PostSnapshotEvent::new(entity, &record))?;

        Ok(record)
    }

    /// Rebuild an entity from a snapshot's data
    ///
    /// No identity check is made against the record's `source_id`.
    ///
    /// ## Errors
    ///
    /// Denormalizer errors unchanged (`UnknownSourceClass` for the
    /// reference serializer when the class has no factory).
    pub fn hydrate(&self, snapshot: &SnapshotRecord, context: Context) -> Result<Box<dyn Entity>> {
        log_op_start!(
            "snapshot_hydrate",
            source_class = snapshot.source_class(),
            source_id = snapshot.source_id()
        );
        let start = Instant::now();

        let mut defaults = Context::new();
        defaults.insert(OBJECT_TO_POPULATE.to_string(), Value::Null);
        let context = merge(&defaults, &context);

        let entity = self
            .serializer
            .denormalize(snapshot.data(), snapshot.source_class(), None, &context)
            .map_err(|e| {
                log_op_error!(
                    "snapshot_hydrate",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64
                );
                e
            })?;

        log_op_end!(
            "snapshot_hydrate",
            duration_ms = start.elapsed().as_millis() as u64
        );

        Ok(entity)
    }

    /// [`SnapshotManager::hydrate`] followed by a downcast to `T`
    ///
    /// ## Errors
    ///
    /// As `hydrate`, plus `InvalidInput` when the hydrated entity is not a `T`.
    pub fn hydrate_as<T: Entity>(&self, snapshot: &SnapshotRecord, context: Context) -> Result<T> {
        let entity = self.hydrate(snapshot, context)?;
        let actual = entity.entity_class().to_string();
        entity
            .into_any()
            .downcast::<T>()
            .map(|entity| *entity)
            .map_err(|_| {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_op("snapshot_hydrate")
                    .with_entity_id(snapshot.source_class())
                    .with_message(format!(
                        "Hydrated entity of class {} is not the requested type",
                        actual
                    ))
            })
    }

    /// Newest snapshot of `entity`, if any
    ///
    /// ## Errors
    ///
    /// - `InvalidInput`: the entity has no identifier values
    /// - repository errors unchanged
    pub fn find_latest_snapshot(
        &self,
        repo: &dyn SnapshotRepository,
        entity: &dyn Entity,
    ) -> Result<Option<SnapshotRecord>> {
        log_op_start!("snapshot_find_latest", source_class = entity.entity_class());
        let start = Instant::now();

        let result = SourceIdentity::of(entity)
            .map_err(ExError::from)
            .and_then(|identity| {
                repo.find_latest_by_source(&identity.source_class, &identity.source_id)
            })
            .map_err(|e| {
                log_op_error!(
                    "snapshot_find_latest",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64
                );
                e
            })?;

        log_op_end!(
            "snapshot_find_latest",
            duration_ms = start.elapsed().as_millis() as u64,
            found = result.is_some()
        );

        Ok(result)
    }

    /// Snapshots of `entity`, newest first, at most `limit` when given
    ///
    /// ## Errors
    ///
    /// - `InvalidInput`: the entity has no identifier values
    /// - repository errors unchanged
    pub fn find_snapshots(
        &self,
        repo: &dyn SnapshotRepository,
        entity: &dyn Entity,
        limit: Option<usize>,
    ) -> Result<Vec<SnapshotRecord>> {
        log_op_start!("snapshot_find", source_class = entity.entity_class());
        let start = Instant::now();

        let result = SourceIdentity::of(entity)
            .map_err(ExError::from)
            .and_then(|identity| {
                repo.find_by_source(&identity.source_class, &identity.source_id, limit)
            })
            .map_err(|e| {
                log_op_error!(
                    "snapshot_find",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64
                );
                e
            })?;

        log_op_end!(
            "snapshot_find",
            duration_ms = start.elapsed().as_millis() as u64,
            count = result.len()
        );

        Ok(result)
    }
}

impl std::fmt::Debug for SnapshotManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotManager")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
