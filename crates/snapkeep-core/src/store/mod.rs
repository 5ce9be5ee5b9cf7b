//! Snapshot storage seams
//!
//! [`SnapshotRepository`] answers history queries by source identity.
//! [`UnitOfWork`] is the caller's pending write set: records registered
//! with [`UnitOfWork::persist`] are written when the caller flushes, so
//! snapshot creation joins whatever transaction the host is running.
//!
//! Ordering for every multi-row query is `create_time DESC, id DESC`.

mod memory;

pub use memory::InMemorySnapshotStore;

use crate::errors::Result;
use crate::snapshot::SnapshotRecord;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

/// Read side of a snapshot store, plus the bulk purge
pub trait SnapshotRepository {
    /// Look up one record by surrogate id
    ///
    /// # Errors
    ///
    /// Storage failures only; a missing id is `Ok(None)`.
    fn find(&self, id: i64) -> Result<Option<SnapshotRecord>>;

    /// All snapshots of one source identity, newest first
    ///
    /// # Errors
    ///
    /// Storage failures only.
    fn find_by_source(
        &self,
        source_class: &str,
        source_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SnapshotRecord>>;

    /// The newest snapshot of one source identity
    ///
    /// # Errors
    ///
    /// Storage failures only.
    fn find_latest_by_source(
        &self,
        source_class: &str,
        source_id: &str,
    ) -> Result<Option<SnapshotRecord>> {
        Ok(self
            .find_by_source(source_class, source_id, Some(1))?
            .into_iter()
            .next())
    }

    /// All snapshots of one source class, newest first
    ///
    /// # Errors
    ///
    /// Storage failures only.
    fn find_by_source_class(
        &self,
        source_class: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SnapshotRecord>>;

    /// Delete every snapshot with `create_time < before` in one operation,
    /// returning the number removed
    ///
    /// # Errors
    ///
    /// Storage failures only.
    fn delete_old_snapshots(&mut self, before: DateTime<Utc>) -> Result<usize>;
}

/// Pending write set shared with the host's persistence layer
pub trait UnitOfWork {
    /// Validate the record, assign its id and register it for insert.
    /// Records this store already holds, flushed or pending, are left
    /// alone; any other id is replaced.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when validation fails, storage failures otherwise.
    fn persist(&mut self, record: &mut SnapshotRecord) -> Result<()>;

    /// Register a stored record for deletion
    ///
    /// # Errors
    ///
    /// Storage failures only.
    fn schedule_delete(&mut self, record: &SnapshotRecord) -> Result<()>;

    /// Write everything registered so far
    ///
    /// # Errors
    ///
    /// Storage failures only.
    fn flush(&mut self) -> Result<()>;
}

/// A repository that is also its own unit of work
pub trait SnapshotStore: SnapshotRepository + UnitOfWork {
    /// Persist and, when `flush` is set, write immediately
    ///
    /// # Errors
    ///
    /// See [`UnitOfWork::persist`] and [`UnitOfWork::flush`].
    fn save(&mut self, record: &mut SnapshotRecord, flush: bool) -> Result<()> {
        self.persist(record)?;
        if flush {
            self.flush()?;
        }
        Ok(())
    }

    /// Schedule deletion and, when `flush` is set, write immediately
    ///
    /// # Errors
    ///
    /// See [`UnitOfWork::schedule_delete`] and [`UnitOfWork::flush`].
    fn remove(&mut self, record: &SnapshotRecord, flush: bool) -> Result<()> {
        self.schedule_delete(record)?;
        if flush {
            self.flush()?;
        }
        Ok(())
    }
}

impl<T: SnapshotRepository + UnitOfWork + ?Sized> SnapshotStore for T {}

/// History order: newest `create_time` first, ties broken by higher id
pub fn newest_first(a: &SnapshotRecord, b: &SnapshotRecord) -> Ordering {
    b.create_time()
        .cmp(&a.create_time())
        .then_with(|| b.id().cmp(&a.id()))
}
