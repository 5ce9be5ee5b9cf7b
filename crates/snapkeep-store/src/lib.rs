//! snapkeep store - SQLite persistence for snapshot records
//!
//! Provides:
//! - SQLite schema with an embedded migrations framework
//! - `SqliteSnapshotStore`, implementing the core repository and
//!   unit-of-work traits over one connection
//! - Integrity verification of stored checksums

pub mod db;
pub mod errors;
pub mod migrations;
pub mod snapshot;

// Re-export key types
pub use errors::Result;
pub use snapshot::{ChecksumReport, SqliteSnapshotStore};
