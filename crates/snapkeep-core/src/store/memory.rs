use crate::errors::Result;
use crate::snapshot::SnapshotRecord;
use crate::store::{newest_first, SnapshotRepository, UnitOfWork};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// In-memory snapshot store
///
/// Persisted records receive their id immediately but only become visible
/// to queries after [`UnitOfWork::flush`]; [`InMemorySnapshotStore::rollback`]
/// discards them. A discarded record persisted again gets a fresh id.
/// Single-threaded, no locking.
#[derive(Debug, Clone, Default)]
pub struct InMemorySnapshotStore {
    rows: BTreeMap<i64, SnapshotRecord>,
    pending_inserts: Vec<SnapshotRecord>,
    pending_deletes: Vec<i64>,
    last_id: i64,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of flushed records
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of records registered but not yet flushed
    pub fn pending_len(&self) -> usize {
        self.pending_inserts.len()
    }

    /// Drop everything registered since the last flush
    pub fn rollback(&mut self) {
        self.pending_inserts.clear();
        self.pending_deletes.clear();
    }

    fn is_managed(&self, id: i64) -> bool {
        self.rows.contains_key(&id) || self.pending_inserts.iter().any(|r| r.id() == Some(id))
    }

    fn collect(
        &self,
        filter: impl Fn(&SnapshotRecord) -> bool,
        limit: Option<usize>,
    ) -> Vec<SnapshotRecord> {
        let mut matches: Vec<_> = self.rows.values().filter(|r| filter(r)).cloned().collect();
        matches.sort_by(newest_first);
        if let Some(limit) = limit {
            matches.truncate(limit);
        }
        matches
    }
}

impl SnapshotRepository for InMemorySnapshotStore {
    fn find(&self, id: i64) -> Result<Option<SnapshotRecord>> {
        Ok(self.rows.get(&id).cloned())
    }

    fn find_by_source(
        &self,
        source_class: &str,
        source_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SnapshotRecord>> {
        Ok(self.collect(
            |r| r.source_class() == source_class && r.source_id() == source_id,
            limit,
        ))
    }

    fn find_by_source_class(
        &self,
        source_class: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SnapshotRecord>> {
        Ok(self.collect(|r| r.source_class() == source_class, limit))
    }

    fn delete_old_snapshots(&mut self, before: DateTime<Utc>) -> Result<usize> {
        let before_len = self.rows.len();
        self.rows.retain(|_, r| r.create_time() >= before);
        Ok(before_len - self.rows.len())
    }
}

impl UnitOfWork for InMemorySnapshotStore {
    fn persist(&mut self, record: &mut SnapshotRecord) -> Result<()> {
        if let Some(id) = record.id() {
            if self.is_managed(id) {
                return Ok(());
            }
        }
        record.validate()?;
        self.last_id += 1;
        record.assign_id(self.last_id);
        self.pending_inserts.push(record.clone());
        Ok(())
    }

    fn schedule_delete(&mut self, record: &SnapshotRecord) -> Result<()> {
        let Some(id) = record.id() else {
            return Ok(());
        };
        let pending_before = self.pending_inserts.len();
        self.pending_inserts.retain(|r| r.id() != Some(id));
        if self.pending_inserts.len() == pending_before {
            self.pending_deletes.push(id);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        for record in self.pending_inserts.drain(..) {
            if let Some(id) = record.id() {
                self.rows.insert(id, record);
            }
        }
        for id in self.pending_deletes.drain(..) {
            self.rows.remove(&id);
        }
        Ok(())
    }
}
