//! Snapshot record domain logic.
//!
//! ## Responsibilities
//!
//! - Define the snapshot record and its validation rules
//! - Compute deterministic payload checksums
//! - Derive source identities from entity identity metadata
//!
//! ## Non-Responsibilities
//!
//! - Persistence (handled by `snapkeep-store`)
//! - Orchestration (handled by `snapkeep-engine`)

pub mod digest;
pub mod identity;
pub mod record;

pub use digest::{canonical_json, compute_checksum, CHECKSUM_LEN};
pub use identity::{encode_source_id, SourceIdentity};
pub use record::{SnapshotData, SnapshotRecord, DEFAULT_VERSION, MAX_SOURCE_LEN};
