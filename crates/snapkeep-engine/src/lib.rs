//! snapkeep engine - snapshot orchestration
//!
//! Provides the two pieces that sit between a host persistence layer and
//! the snapshot store:
//! - [`SnapshotManager`]: create, hydrate and look up snapshots
//! - [`capture`]: field markers, per-type capture schemas and the
//!   lifecycle listener that snapshots marked fields before a write
//!
//! ## Logging Ownership
//!
//! The engine owns lifecycle logging (`log_op_start!` / `log_op_end!` /
//! `log_op_error!`). Lower layers use only `tracing::debug!()`.

pub mod capture;
pub mod manager;

pub use capture::{
    CaptureRegistry, CaptureSchema, FieldState, LifecycleListener, SnapshotListener,
    SnapshotMarker, Snapshottable,
};
pub use manager::SnapshotManager;
