//! Read-only commands
//!
//! Usage:
//!   snapkeep list [--class <CLASS> [--id <ID>]] [--limit <N>]
//!   snapkeep latest --class <CLASS> --id <ID>
//!   snapkeep show <SNAPSHOT_ID>

use super::{open_store, Output};
use clap::Args;
use snapkeep_core::errors::{ExError, ExErrorKind};
use snapkeep_core::store::SnapshotRepository;
use std::path::Path;

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Source class; omit to print counts per class
    #[arg(long)]
    pub class: Option<String>,

    /// Source id within the class
    #[arg(long, requires = "class")]
    pub id: Option<String>,

    /// Maximum number of snapshots, newest first
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Args)]
pub struct LatestArgs {
    #[arg(long)]
    pub class: String,

    #[arg(long)]
    pub id: String,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Surrogate snapshot id
    pub snapshot_id: i64,
}

pub fn list(db: &Path, args: ListArgs, output: Output) -> anyhow::Result<()> {
    let store = open_store(db)?;

    let Some(class) = args.class else {
        let counts = store.count_by_source_class()?;
        if output.json {
            let counts: serde_json::Map<String, serde_json::Value> = counts
                .into_iter()
                .map(|(class, count)| (class, serde_json::Value::from(count)))
                .collect();
            println!("{}", serde_json::to_string_pretty(&counts)?);
        } else if counts.is_empty() {
            println!("No snapshots found");
        } else {
            for (class, count) in counts {
                println!("{}: {}", class, count);
            }
        }
        return Ok(());
    };

    let records = match args.id {
        Some(id) => store.find_by_source(&class, &id, args.limit)?,
        None => store.find_by_source_class(&class, args.limit)?,
    };
    output.records(&records)
}

pub fn latest(db: &Path, args: LatestArgs, output: Output) -> anyhow::Result<()> {
    let store = open_store(db)?;
    match store.find_latest_by_source(&args.class, &args.id)? {
        Some(record) => output.record(&record),
        None => Err(not_found("latest", format!("{}#{}", args.class, args.id)).into()),
    }
}

pub fn show(db: &Path, args: ShowArgs, output: Output) -> anyhow::Result<()> {
    let store = open_store(db)?;
    match store.find(args.snapshot_id)? {
        Some(record) => output.record(&record),
        None => Err(not_found("show", args.snapshot_id.to_string()).into()),
    }
}

fn not_found(op: &str, entity_id: String) -> ExError {
    ExError::new(ExErrorKind::NotFound)
        .with_op(op)
        .with_entity_id(entity_id)
        .with_message("Snapshot not found")
}
