//! Snapshot write operations.
//!
//! Plain statements against a connection; transaction handling belongs to
//! [`super::SqliteSnapshotStore`].

use crate::errors::{from_rusqlite, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use snapkeep_core::errors::{ExError, ExErrorKind};
use snapkeep_core::snapshot::SnapshotRecord;

/// Insert a record and return its new row id.
///
/// The record's own id is ignored; callers assign the returned id.
///
/// # Errors
///
/// - `Serialization`: data or metadata failed to encode
/// - `Persistence`: the insert failed
pub fn insert_snapshot(conn: &Connection, record: &SnapshotRecord) -> Result<i64> {
    let data = serde_json::to_string(record.data()).map_err(|e| {
        ExError::new(ExErrorKind::Serialization)
            .with_op("insert_snapshot")
            .with_message(format!("Failed to encode snapshot data: {}", e))
    })?;
    let metadata = record
        .metadata()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| {
            ExError::new(ExErrorKind::Serialization)
                .with_op("insert_snapshot")
                .with_message(format!("Failed to encode snapshot metadata: {}", e))
        })?;

    conn.execute(
        r#"
        INSERT INTO entity_snapshots (
            source_class,
            source_id,
            data,
            metadata,
            version,
            create_time,
            checksum
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        rusqlite::params![
            record.source_class(),
            record.source_id(),
            data,
            metadata,
            record.version(),
            record.create_time().timestamp_micros(),
            record.checksum(),
        ],
    )
    .map_err(from_rusqlite)?;

    let id = conn.last_insert_rowid();

    tracing::debug!(
        snapshot_id = id,
        source_class = %record.source_class(),
        source_id = %record.source_id(),
        checksum = %record.checksum(),
        "Inserted snapshot"
    );

    Ok(id)
}

/// Delete one snapshot by id, returning the number of rows removed.
///
/// # Errors
///
/// - `Persistence`: the delete failed
pub fn delete_snapshot(conn: &Connection, id: i64) -> Result<usize> {
    let removed = conn
        .execute("DELETE FROM entity_snapshots WHERE id = ?1", [id])
        .map_err(from_rusqlite)?;
    tracing::debug!(snapshot_id = id, removed, "Deleted snapshot");
    Ok(removed)
}

/// Delete every snapshot created strictly before `before`, in a single
/// statement.
///
/// # Errors
///
/// - `Persistence`: the delete failed
pub fn delete_snapshots_before(conn: &Connection, before: DateTime<Utc>) -> Result<usize> {
    let removed = conn
        .execute(
            "DELETE FROM entity_snapshots WHERE create_time < ?1",
            [before.timestamp_micros()],
        )
        .map_err(from_rusqlite)?;
    tracing::debug!(before = %before, removed, "Purged old snapshots");
    Ok(removed)
}
