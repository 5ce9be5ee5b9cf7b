//! Capture trigger
//!
//! A host type opts in by describing its marked fields once, statically:
//!
//! ```ignore
//! let schema = CaptureSchema::<Order>::new("App\\Entity\\Order")
//!     .snapshot_field(
//!         "product",
//!         SnapshotMarker::default(),
//!         |order| FieldState::of(order.product.as_ref()),
//!         |order| order.product = None,
//!     )
//!     .target_field("productSnapshot", |order, record| {
//!         order.product_snapshot = Some(record)
//!     });
//! ```
//!
//! Before the host writes an `Order`, it calls
//! [`LifecycleListener::pre_persist`] (or `pre_update`). Every marked field
//! holding a live entity is snapshotted, the record is stored in the target
//! field and the marked field is cleared.

mod listener;
mod marker;
mod schema;

pub use listener::{LifecycleListener, SnapshotListener};
pub use marker::{SnapshotMarker, DEFAULT_GROUP, TARGET_SUFFIX};
pub use schema::{CaptureRegistry, CaptureSchema, FieldState, MarkedField, Snapshottable};
