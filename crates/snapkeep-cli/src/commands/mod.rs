//! Subcommand implementations

pub mod inspect;
pub mod maintenance;
pub mod seed;

use anyhow::Context as _;
use snapkeep_core::snapshot::SnapshotRecord;
use snapkeep_store::SqliteSnapshotStore;
use std::path::Path;

/// Output mode shared by every command
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
}

impl Output {
    /// Print records as a JSON array or one text block each
    pub fn records(&self, records: &[SnapshotRecord]) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(records)?);
            return Ok(());
        }
        if records.is_empty() {
            println!("No snapshots found");
        }
        for record in records {
            print_record(record, false);
        }
        Ok(())
    }

    /// Print one record including its data
    pub fn record(&self, record: &SnapshotRecord) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(record)?);
        } else {
            print_record(record, true);
        }
        Ok(())
    }
}

fn print_record(record: &SnapshotRecord, with_data: bool) {
    println!("{}", record);
    if let Some(id) = record.id() {
        println!("  id: {}", id);
    }
    println!("  version: {}", record.version());
    println!("  checksum: {}", record.checksum());
    if with_data {
        let data = serde_json::Value::Object(record.data().clone());
        println!("  data: {}", data);
        if let Some(metadata) = record.metadata() {
            println!(
                "  metadata: {}",
                serde_json::Value::Object(metadata.clone())
            );
        }
    }
}

/// Open (and migrate) the database at `path`
pub fn open_store(path: &Path) -> anyhow::Result<SqliteSnapshotStore> {
    SqliteSnapshotStore::open(path)
        .with_context(|| format!("failed to open snapshot database {}", path.display()))
}
