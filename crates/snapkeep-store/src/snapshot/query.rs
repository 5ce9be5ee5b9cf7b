//! Read-only snapshot query operations.
//!
//! Every multi-row query orders by `create_time DESC, id DESC` so ties on
//! the timestamp resolve to the most recently inserted row.

use crate::errors::{corrupt_column, from_rusqlite, Result};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;
use snapkeep_core::errors::SnapshotError;
use snapkeep_core::snapshot::{SnapshotData, SnapshotRecord, SourceIdentity};

const SELECT_COLUMNS: &str = "SELECT id, source_class, source_id, data, metadata, version, \
     create_time, checksum FROM entity_snapshots";

/// A raw row from the `entity_snapshots` table.
#[derive(Debug, Clone)]
pub struct SnapshotRow {
    pub id: i64,
    pub source_class: String,
    pub source_id: String,
    /// JSON object text
    pub data: String,
    pub metadata: Option<String>,
    pub version: i32,
    /// Microseconds since epoch, UTC
    pub create_time: i64,
    /// Checksum as written at insert time
    pub checksum: String,
}

impl SnapshotRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            source_class: row.get(1)?,
            source_id: row.get(2)?,
            data: row.get(3)?,
            metadata: row.get(4)?,
            version: row.get(5)?,
            create_time: row.get(6)?,
            checksum: row.get(7)?,
        })
    }

    /// Rebuild the record, recomputing its checksum from `data`
    ///
    /// # Errors
    ///
    /// `Serialization` when `data` or `metadata` is not a JSON object.
    pub fn into_record(self) -> Result<SnapshotRecord> {
        let data: SnapshotData =
            serde_json::from_str(&self.data).map_err(|e| corrupt_column(self.id, "data", e))?;
        let metadata: Option<SnapshotData> = self
            .metadata
            .as_deref()
            .map(serde_json::from_str::<SnapshotData>)
            .transpose()
            .map_err(|e| corrupt_column(self.id, "metadata", e))?;

        let record = SnapshotRecord::restore(
            self.id,
            SourceIdentity::new(self.source_class, self.source_id),
            data,
            metadata,
            self.version,
            micros_to_datetime(self.create_time),
        );

        if record.checksum() != self.checksum {
            tracing::warn!(
                snapshot_id = self.id,
                stored = %self.checksum,
                computed = %record.checksum(),
                "Stored snapshot checksum does not match its data"
            );
        }

        Ok(record)
    }
}

/// A row whose stored checksum disagrees with its data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecksumReport {
    pub snapshot_id: i64,
    pub source_class: String,
    pub source_id: String,
    pub stored: String,
    pub computed: String,
}

impl From<&ChecksumReport> for SnapshotError {
    fn from(report: &ChecksumReport) -> Self {
        SnapshotError::ChecksumMismatch {
            snapshot_id: report.snapshot_id,
            stored: report.stored.clone(),
            computed: report.computed.clone(),
        }
    }
}

/// Convert a storage timestamp back to a UTC datetime
pub fn micros_to_datetime(micros: i64) -> DateTime<Utc> {
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    Utc.timestamp_opt(secs, nanos)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn sql_limit(limit: Option<usize>) -> i64 {
    // SQLite treats a negative LIMIT as unbounded
    limit
        .map(|l| i64::try_from(l).unwrap_or(i64::MAX))
        .unwrap_or(-1)
}

fn collect_records(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<SnapshotRecord>> {
    let mut stmt = conn.prepare(sql).map_err(from_rusqlite)?;
    let rows = stmt
        .query_map(params, SnapshotRow::from_row)
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    rows.into_iter().map(SnapshotRow::into_record).collect()
}

/// Fetch one snapshot by surrogate id.
///
/// # Errors
///
/// - `Persistence`: SQLite query failed
/// - `Serialization`: stored JSON is corrupt
pub fn fetch_snapshot(conn: &Connection, id: i64) -> Result<Option<SnapshotRecord>> {
    let row = conn
        .query_row(
            &format!("{} WHERE id = ?1", SELECT_COLUMNS),
            [id],
            SnapshotRow::from_row,
        )
        .optional()
        .map_err(from_rusqlite)?;
    row.map(SnapshotRow::into_record).transpose()
}

/// Whether a row with this id exists, pending writes included.
///
/// # Errors
///
/// - `Persistence`: SQLite query failed
pub fn snapshot_exists(conn: &Connection, id: i64) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM entity_snapshots WHERE id = ?1", [id], |_| Ok(()))
        .optional()
        .map_err(from_rusqlite)?;
    Ok(found.is_some())
}

/// Fetch the history of one source identity, newest first.
///
/// # Errors
///
/// - `Persistence`: SQLite query failed
/// - `Serialization`: stored JSON is corrupt
pub fn fetch_by_source(
    conn: &Connection,
    source_class: &str,
    source_id: &str,
    limit: Option<usize>,
) -> Result<Vec<SnapshotRecord>> {
    collect_records(
        conn,
        &format!(
            "{} WHERE source_class = ?1 AND source_id = ?2 \
             ORDER BY create_time DESC, id DESC LIMIT ?3",
            SELECT_COLUMNS
        ),
        rusqlite::params![source_class, source_id, sql_limit(limit)],
    )
}

/// Fetch every snapshot of one source class, newest first.
///
/// # Errors
///
/// - `Persistence`: SQLite query failed
/// - `Serialization`: stored JSON is corrupt
pub fn fetch_by_source_class(
    conn: &Connection,
    source_class: &str,
    limit: Option<usize>,
) -> Result<Vec<SnapshotRecord>> {
    collect_records(
        conn,
        &format!(
            "{} WHERE source_class = ?1 ORDER BY create_time DESC, id DESC LIMIT ?2",
            SELECT_COLUMNS
        ),
        rusqlite::params![source_class, sql_limit(limit)],
    )
}

/// Count snapshots per source class, alphabetically.
///
/// # Errors
///
/// - `Persistence`: SQLite query failed
pub fn count_by_source_class(conn: &Connection) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn
        .prepare(
            "SELECT source_class, COUNT(*) FROM entity_snapshots \
             GROUP BY source_class ORDER BY source_class",
        )
        .map_err(from_rusqlite)?;
    let counts = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    Ok(counts)
}

/// Scan every row and report those whose stored checksum disagrees with
/// the checksum recomputed from `data`, in id order.
///
/// # Errors
///
/// - `Persistence`: SQLite query failed
/// - `Serialization`: stored JSON is corrupt
pub fn verify_checksums(conn: &Connection) -> Result<Vec<ChecksumReport>> {
    let mut stmt = conn
        .prepare(&format!("{} ORDER BY id", SELECT_COLUMNS))
        .map_err(from_rusqlite)?;
    let rows = stmt
        .query_map([], SnapshotRow::from_row)
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;

    let mut reports = Vec::new();
    for row in rows {
        let data: SnapshotData =
            serde_json::from_str(&row.data).map_err(|e| corrupt_column(row.id, "data", e))?;
        let computed = snapkeep_core::snapshot::compute_checksum(&data);
        if computed != row.checksum {
            reports.push(ChecksumReport {
                snapshot_id: row.id,
                source_class: row.source_class,
                source_id: row.source_id,
                stored: row.checksum,
                computed,
            });
        }
    }
    Ok(reports)
}
