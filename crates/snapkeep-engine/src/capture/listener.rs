//! Lifecycle listener that captures marked fields before a write.

use super::schema::{CaptureRegistry, CaptureSchema, FieldState};
use crate::manager::SnapshotManager;
use snapkeep_core::errors::{ExError, ExErrorKind, Result};
use snapkeep_core::store::UnitOfWork;
use snapkeep_core::{log_op_end, log_op_error, log_op_start};
use snapkeep_core_types::CaptureId;
use std::sync::Arc;
use std::time::Instant;

/// Hooks a host persistence layer calls before writing an object
pub trait LifecycleListener<T> {
    /// Called before a new object is first written
    ///
    /// # Errors
    ///
    /// Aborts the host write.
    fn pre_persist(&self, entity: &mut T, uow: &mut dyn UnitOfWork) -> Result<()>;

    /// Called before changes to an existing object are written
    ///
    /// # Errors
    ///
    /// Aborts the host write.
    fn pre_update(&self, entity: &mut T, uow: &mut dyn UnitOfWork) -> Result<()>;
}

/// Captures every live marked field of a notified object
#[derive(Debug, Clone)]
pub struct SnapshotListener {
    manager: Arc<SnapshotManager>,
    registry: Arc<CaptureRegistry>,
}

struct PlannedCapture {
    field: usize,
    target: String,
}

impl SnapshotListener {
    pub fn new(manager: Arc<SnapshotManager>, registry: Arc<CaptureRegistry>) -> Self {
        Self { manager, registry }
    }

    pub fn manager(&self) -> &SnapshotManager {
        &self.manager
    }

    /// Snapshot the live marked fields of `owner`
    ///
    /// Targets are resolved for every field before anything is written, so
    /// a misconfigured target leaves `owner` untouched. Fields holding null
    /// or a snapshot are skipped.
    ///
    /// ## Returns
    ///
    /// Number of snapshots created; 0 when auto-snapshot is disabled or `T`
    /// has no schema.
    ///
    /// ## Errors
    ///
    /// - `InvalidSnapshotTarget`: a live field has no resolvable target
    /// - manager and unit-of-work errors unchanged; fields captured earlier
    ///   in the same call stay captured
    pub fn capture<T: 'static>(&self, owner: &mut T, uow: &mut dyn UnitOfWork) -> Result<usize> {
        if !self.manager.is_auto_snapshot_enabled() {
            return Ok(0);
        }
        let Some(schema) = self.registry.get::<T>() else {
            return Ok(0);
        };

        let capture_id = CaptureId::new();
        log_op_start!(
            "snapshot_capture",
            capture_id = %capture_id,
            owner_class = schema.class()
        );
        let start = Instant::now();

        let captured = self.capture_impl(schema, owner, uow).map_err(|e| {
            log_op_error!(
                "snapshot_capture",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                capture_id = %capture_id
            );
            e
        })?;

        log_op_end!(
            "snapshot_capture",
            duration_ms = start.elapsed().as_millis() as u64,
            capture_id = %capture_id,
            captured = captured
        );

        Ok(captured)
    }

    fn capture_impl<T>(
        &self,
        schema: &CaptureSchema<T>,
        owner: &mut T,
        uow: &mut dyn UnitOfWork,
    ) -> Result<usize> {
        let mut plan = Vec::new();
        for (index, field) in schema.fields().iter().enumerate() {
            match field.read(owner) {
                FieldState::Null | FieldState::Snapshot => continue,
                FieldState::Live(_) => plan.push(PlannedCapture {
                    field: index,
                    target: schema.resolve_target(field)?,
                }),
            }
        }

        let mut captured = 0;
        for planned in plan {
            let field = &schema.fields()[planned.field];
            let marker = field.marker();

            let mut record = match field.read(owner) {
                FieldState::Live(entity) => {
                    self.manager
                        .create(&mut *uow, entity, marker.capture_context())?
                }
                FieldState::Null | FieldState::Snapshot => continue,
            };

            if marker.cascade {
                uow.persist(&mut record)?;
            }

            if !schema.assign_target(owner, &planned.target, record) {
                return Err(ExError::new(ExErrorKind::Internal)
                    .with_op("snapshot_capture")
                    .with_entity_id(schema.class())
                    .with_field(field.name())
                    .with_message(format!("Target {} disappeared", planned.target)));
            }
            field.clear(owner);
            captured += 1;

            tracing::debug!(
                field = field.name(),
                target_field = %planned.target,
                "Captured snapshot field"
            );
        }

        Ok(captured)
    }
}

impl<T: 'static> LifecycleListener<T> for SnapshotListener {
    fn pre_persist(&self, entity: &mut T, uow: &mut dyn UnitOfWork) -> Result<()> {
        self.capture(entity, uow).map(|_| ())
    }

    fn pre_update(&self, entity: &mut T, uow: &mut dyn UnitOfWork) -> Result<()> {
        self.capture(entity, uow).map(|_| ())
    }
}
