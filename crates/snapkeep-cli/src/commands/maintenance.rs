//! Commands that modify or audit the whole database
//!
//! Usage:
//!   snapkeep purge (--older-than-days <N> | --before <RFC3339>)
//!   snapkeep verify

use super::{open_store, Output};
use anyhow::{bail, Context};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use snapkeep_core::errors::{ExError, SnapshotError};
use snapkeep_core::store::SnapshotRepository;
use std::path::Path;

#[derive(Debug, Args)]
pub struct PurgeArgs {
    /// Delete snapshots older than this many days
    #[arg(long, conflicts_with = "before")]
    pub older_than_days: Option<u32>,

    /// Delete snapshots created strictly before this time
    #[arg(long, conflicts_with = "older_than_days")]
    pub before: Option<DateTime<Utc>>,
}

impl PurgeArgs {
    fn cutoff(&self, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
        match (self.older_than_days, self.before) {
            (Some(days), None) => match now.checked_sub_signed(Duration::days(i64::from(days))) {
                Some(cutoff) => Ok(cutoff),
                None => bail!("--older-than-days {} is out of range", days),
            },
            (None, Some(before)) => Ok(before),
            _ => bail!("Must specify either --older-than-days or --before"),
        }
    }
}

pub fn purge(db: &Path, args: PurgeArgs, output: Output) -> anyhow::Result<()> {
    let cutoff = args.cutoff(Utc::now())?;
    let mut store = open_store(db)?;

    let removed = store.delete_old_snapshots(cutoff)?;
    tracing::info!(removed, before = %cutoff, "Purged snapshots");

    if output.json {
        println!(
            "{}",
            serde_json::json!({ "removed": removed, "before": cutoff.to_rfc3339() })
        );
    } else {
        println!("Removed {} snapshot(s) created before {}", removed, cutoff);
    }
    Ok(())
}

pub fn verify(db: &Path, output: Output) -> anyhow::Result<()> {
    let store = open_store(db)?;
    let reports = store.verify_checksums()?;

    if output.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else if reports.is_empty() {
        println!("All checksums match");
    } else {
        for report in &reports {
            println!(
                "Snapshot {} ({}#{}): stored {} computed {}",
                report.snapshot_id,
                report.source_class,
                report.source_id,
                report.stored,
                report.computed
            );
        }
    }

    match reports.first() {
        Some(first) => Err(ExError::from(SnapshotError::from(first))).with_context(|| {
            format!("{} snapshot(s) failed checksum verification", reports.len())
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_cutoff_from_days() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let args = PurgeArgs {
            older_than_days: Some(7),
            before: None,
        };
        assert_eq!(
            args.cutoff(now).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 3, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_cutoff_out_of_range_days_is_an_error() {
        let args = PurgeArgs {
            older_than_days: Some(u32::MAX),
            before: None,
        };
        assert!(args.cutoff(Utc::now()).is_err());
    }

    #[test]
    fn test_cutoff_requires_an_option() {
        let args = PurgeArgs {
            older_than_days: None,
            before: None,
        };
        assert!(args.cutoff(Utc::now()).is_err());
    }
}
