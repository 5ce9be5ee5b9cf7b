//! SQLite snapshot store.
//!
//! ## Responsibilities
//!
//! - Insert and delete snapshot rows as a unit of work on one connection
//! - Answer history queries by source identity and source class
//! - Bulk purge by creation time
//! - Report rows whose stored checksum no longer matches their data
//!
//! ## Non-Responsibilities
//!
//! - Snapshot creation and serialization (handled by `snapkeep-engine`)
//! - Record validation rules (handled by `snapkeep-core`)

pub mod persist;
pub mod query;

pub use query::{ChecksumReport, SnapshotRow};

use crate::errors::{from_rusqlite, Result};
use crate::{db, migrations};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use snapkeep_core::snapshot::SnapshotRecord;
use snapkeep_core::store::{SnapshotRepository, UnitOfWork};
use std::path::Path;

/// Snapshot store over a single SQLite connection
///
/// Acts as its own unit of work: the first `persist` or `schedule_delete`
/// opens a deferred transaction and writes inside it, so pending rows are
/// visible to this connection but not durable until [`UnitOfWork::flush`]
/// commits. [`SqliteSnapshotStore::rollback`] discards them; a discarded
/// record persisted again is inserted under a fresh id.
#[derive(Debug)]
pub struct SqliteSnapshotStore {
    conn: Connection,
}

impl SqliteSnapshotStore {
    /// Wrap a connection whose schema is already migrated
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open a database file, applying migrations
    ///
    /// # Errors
    ///
    /// `Persistence` when the file cannot be opened or migrated.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(db::open_and_migrate(path)?))
    }

    /// Fresh migrated in-memory store
    ///
    /// # Errors
    ///
    /// `Persistence` when migrations fail.
    pub fn in_memory() -> Result<Self> {
        let mut conn = db::open_in_memory()?;
        db::configure(&conn)?;
        migrations::apply_migrations(&mut conn)?;
        Ok(Self::new(conn))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn into_connection(self) -> Connection {
        self.conn
    }

    /// Whether writes are pending in an open transaction
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Discard every write since the last flush
    ///
    /// # Errors
    ///
    /// `Persistence` when the rollback fails.
    pub fn rollback(&mut self) -> Result<()> {
        if self.in_transaction() {
            self.conn.execute_batch("ROLLBACK").map_err(from_rusqlite)?;
            tracing::debug!("Rolled back pending snapshot writes");
        }
        Ok(())
    }

    /// Snapshot counts per source class
    ///
    /// # Errors
    ///
    /// `Persistence` when the query fails.
    pub fn count_by_source_class(&self) -> Result<Vec<(String, i64)>> {
        query::count_by_source_class(&self.conn)
    }

    /// Rows whose stored checksum disagrees with their data
    ///
    /// # Errors
    ///
    /// `Persistence` or `Serialization` when rows cannot be read.
    pub fn verify_checksums(&self) -> Result<Vec<ChecksumReport>> {
        query::verify_checksums(&self.conn)
    }

    fn begin_if_needed(&self) -> Result<()> {
        if self.conn.is_autocommit() {
            self.conn
                .execute_batch("BEGIN DEFERRED")
                .map_err(from_rusqlite)?;
        }
        Ok(())
    }
}

impl SnapshotRepository for SqliteSnapshotStore {
    fn find(&self, id: i64) -> Result<Option<SnapshotRecord>> {
        query::fetch_snapshot(&self.conn, id)
    }

    fn find_by_source(
        &self,
        source_class: &str,
        source_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SnapshotRecord>> {
        query::fetch_by_source(&self.conn, source_class, source_id, limit)
    }

    fn find_by_source_class(
        &self,
        source_class: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SnapshotRecord>> {
        query::fetch_by_source_class(&self.conn, source_class, limit)
    }

    fn delete_old_snapshots(&mut self, before: DateTime<Utc>) -> Result<usize> {
        persist::delete_snapshots_before(&self.conn, before)
    }
}

impl UnitOfWork for SqliteSnapshotStore {
    fn persist(&mut self, record: &mut SnapshotRecord) -> Result<()> {
        if let Some(id) = record.id() {
            if query::snapshot_exists(&self.conn, id)? {
                return Ok(());
            }
        }
        record.validate()?;
        self.begin_if_needed()?;
        let id = persist::insert_snapshot(&self.conn, record)?;
        record.assign_id(id);
        Ok(())
    }

    fn schedule_delete(&mut self, record: &SnapshotRecord) -> Result<()> {
        let Some(id) = record.id() else {
            return Ok(());
        };
        self.begin_if_needed()?;
        persist::delete_snapshot(&self.conn, id)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.in_transaction() {
            self.conn.execute_batch("COMMIT").map_err(from_rusqlite)?;
            tracing::debug!("Committed snapshot writes");
        }
        Ok(())
    }
}
