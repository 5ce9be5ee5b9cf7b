// Integration tests for the SQLite snapshot store

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};
use snapkeep_core::errors::ExErrorKind;
use snapkeep_core::snapshot::{SnapshotData, SnapshotRecord, SourceIdentity};
use snapkeep_core::store::{SnapshotRepository, SnapshotStore, UnitOfWork};
use snapkeep_store::SqliteSnapshotStore;
use tempfile::TempDir;

const PRODUCT: &str = "App\\Entity\\Product";
const ORDER: &str = "App\\Entity\\Order";

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

fn data(value: Value) -> SnapshotData {
    value.as_object().cloned().unwrap()
}

fn record(class: &str, id: &str, minutes: i64, payload: Value) -> SnapshotRecord {
    SnapshotRecord::with_create_time(
        SourceIdentity::new(class, id),
        data(payload),
        base_time() + Duration::minutes(minutes),
    )
}

fn setup_file_store() -> (TempDir, SqliteSnapshotStore) {
    let temp_dir = TempDir::new().unwrap();
    let store = SqliteSnapshotStore::open(temp_dir.path().join("snapshots.db")).unwrap();
    (temp_dir, store)
}

#[test]
fn test_save_and_find_round_trip() {
    let mut store = SqliteSnapshotStore::in_memory().unwrap();
    let mut original = record(PRODUCT, "1", 0, json!({"name": "Product 1", "price": 99.5}));
    original.set_metadata(Some(data(json!({"context": {"groups": ["snapshot"]}}))));

    store.save(&mut original, true).unwrap();
    let id = original.id().expect("id assigned on persist");

    let loaded = store.find(id).unwrap().expect("row exists");
    assert_eq!(loaded, original);
    assert_eq!(loaded.checksum(), original.checksum());
    assert!(store.find(id + 100).unwrap().is_none());
}

#[test]
fn test_persist_joins_open_transaction_until_flush() {
    let (temp_dir, mut store) = setup_file_store();
    let mut pending = record(PRODUCT, "1", 0, json!({"name": "Product 1"}));

    store.persist(&mut pending).unwrap();
    assert!(store.in_transaction());
    // visible to the writing connection
    assert_eq!(store.find_by_source(PRODUCT, "1", None).unwrap().len(), 1);

    // not yet durable for other connections
    let other = rusqlite::Connection::open(temp_dir.path().join("snapshots.db")).unwrap();
    let count = |conn: &rusqlite::Connection| -> i64 {
        conn.query_row("SELECT COUNT(*) FROM entity_snapshots", [], |row| row.get(0))
            .unwrap()
    };
    assert_eq!(count(&other), 0);

    store.flush().unwrap();
    assert!(!store.in_transaction());
    assert_eq!(count(&other), 1);
}

#[test]
fn test_rollback_discards_pending_rows() {
    let mut store = SqliteSnapshotStore::in_memory().unwrap();
    store
        .save(&mut record(PRODUCT, "1", 0, json!({})), false)
        .unwrap();
    store.rollback().unwrap();
    assert!(store.find_by_source(PRODUCT, "1", None).unwrap().is_empty());
}

#[test]
fn test_persist_after_rollback_inserts_again() {
    let mut store = SqliteSnapshotStore::in_memory().unwrap();
    let mut rec = record(PRODUCT, "1", 0, json!({"price": 10}));
    store.save(&mut rec, false).unwrap();
    store.rollback().unwrap();

    store.save(&mut rec, true).unwrap();

    let id = rec.id().unwrap();
    let stored = store.find(id).unwrap().unwrap();
    assert_eq!(stored.data(), rec.data());
    assert_eq!(store.find_by_source(PRODUCT, "1", None).unwrap().len(), 1);
}

#[test]
fn test_persist_is_idempotent_for_managed_records() {
    let mut store = SqliteSnapshotStore::in_memory().unwrap();
    let mut rec = record(PRODUCT, "1", 0, json!({}));
    store.persist(&mut rec).unwrap();
    let id = rec.id();
    store.persist(&mut rec).unwrap();
    store.flush().unwrap();

    assert_eq!(rec.id(), id);
    assert_eq!(store.find_by_source(PRODUCT, "1", None).unwrap().len(), 1);
}

#[test]
fn test_persist_rejects_blank_source_id() {
    let mut store = SqliteSnapshotStore::in_memory().unwrap();
    let mut rec = record(PRODUCT, "", 0, json!({}));
    let err = store.persist(&mut rec).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    assert!(!store.in_transaction());
}

#[test]
fn test_history_newest_first_and_latest() {
    let mut store = SqliteSnapshotStore::in_memory().unwrap();
    for (minutes, name) in [(0, "v1"), (30, "v3"), (10, "v2")] {
        store
            .save(&mut record(PRODUCT, "1", minutes, json!({ "name": name })), false)
            .unwrap();
    }
    store
        .save(&mut record(PRODUCT, "2", 60, json!({"name": "other"})), true)
        .unwrap();

    let history = store.find_by_source(PRODUCT, "1", None).unwrap();
    let names: Vec<_> = history.iter().map(|r| r.data()["name"].clone()).collect();
    assert_eq!(names, vec![json!("v3"), json!("v2"), json!("v1")]);

    let limited = store.find_by_source(PRODUCT, "1", Some(2)).unwrap();
    assert_eq!(limited.len(), 2);

    let latest = store.find_latest_by_source(PRODUCT, "1").unwrap().unwrap();
    assert_eq!(latest.data()["name"], json!("v3"));
    assert!(store.find_latest_by_source(PRODUCT, "404").unwrap().is_none());
}

#[test]
fn test_equal_create_time_breaks_tie_by_id() {
    let mut store = SqliteSnapshotStore::in_memory().unwrap();
    let mut first = record(PRODUCT, "1", 5, json!({"n": 1}));
    let mut second = record(PRODUCT, "1", 5, json!({"n": 2}));
    store.save(&mut first, false).unwrap();
    store.save(&mut second, true).unwrap();

    let latest = store.find_latest_by_source(PRODUCT, "1").unwrap().unwrap();
    assert_eq!(latest.id(), second.id());
}

#[test]
fn test_find_by_source_class() {
    let mut store = SqliteSnapshotStore::in_memory().unwrap();
    store.save(&mut record(PRODUCT, "1", 0, json!({})), false).unwrap();
    store.save(&mut record(PRODUCT, "2", 1, json!({})), false).unwrap();
    store.save(&mut record(ORDER, "100", 2, json!({})), true).unwrap();

    let products = store.find_by_source_class(PRODUCT, None).unwrap();
    let ids: Vec<_> = products.iter().map(|r| r.source_id().to_string()).collect();
    assert_eq!(ids, vec!["2", "1"]);

    assert_eq!(
        store.count_by_source_class().unwrap(),
        vec![(ORDER.to_string(), 1), (PRODUCT.to_string(), 2)]
    );
}

#[test]
fn test_delete_old_snapshots_strictly_before_cutoff() {
    let mut store = SqliteSnapshotStore::in_memory().unwrap();
    for minutes in [0, 10, 20, 30] {
        store
            .save(&mut record(PRODUCT, "1", minutes, json!({})), false)
            .unwrap();
    }
    store.flush().unwrap();

    let cutoff = base_time() + Duration::minutes(20);
    assert_eq!(store.delete_old_snapshots(cutoff).unwrap(), 2);

    let remaining = store.find_by_source(PRODUCT, "1", None).unwrap();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().all(|r| r.create_time() >= cutoff));
    assert_eq!(store.delete_old_snapshots(cutoff).unwrap(), 0);
}

#[test]
fn test_remove_deletes_row() {
    let mut store = SqliteSnapshotStore::in_memory().unwrap();
    let mut rec = record(PRODUCT, "1", 0, json!({}));
    store.save(&mut rec, true).unwrap();
    store.remove(&rec, true).unwrap();
    assert!(store.find(rec.id().unwrap()).unwrap().is_none());
}

#[test]
fn test_microsecond_create_time_survives_storage() {
    let mut store = SqliteSnapshotStore::in_memory().unwrap();
    let mut rec = SnapshotRecord::new(SourceIdentity::new(PRODUCT, "1"), SnapshotData::new());
    store.save(&mut rec, true).unwrap();

    let loaded = store.find(rec.id().unwrap()).unwrap().unwrap();
    assert_eq!(loaded.create_time(), rec.create_time());
}

#[test]
fn test_verify_checksums_reports_tampered_rows() {
    let mut store = SqliteSnapshotStore::in_memory().unwrap();
    let mut good = record(PRODUCT, "1", 0, json!({"name": "Product 1"}));
    let mut bad = record(PRODUCT, "2", 0, json!({"name": "Product 2"}));
    store.save(&mut good, false).unwrap();
    store.save(&mut bad, true).unwrap();
    assert!(store.verify_checksums().unwrap().is_empty());

    store
        .connection()
        .execute(
            "UPDATE entity_snapshots SET data = ?1 WHERE id = ?2",
            rusqlite::params![r#"{"name":"Forged"}"#, bad.id()],
        )
        .unwrap();

    let reports = store.verify_checksums().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(Some(reports[0].snapshot_id), bad.id());
    assert_eq!(reports[0].stored, bad.checksum());

    // loading recomputes rather than trusting the stored value
    let loaded = store.find(bad.id().unwrap()).unwrap().unwrap();
    assert_eq!(loaded.checksum(), reports[0].computed);
}
