//! snapkeep core - snapshot records and the seams around them
//!
//! This crate holds everything about a snapshot that does not depend on a
//! particular database or host framework:
//! - [`SnapshotRecord`] with its checksum and validation rules
//! - source identity resolution for single and composite identifiers
//! - the [`Entity`] seam host types implement to become snapshottable
//! - the serializer seam and the attribute-walking [`GraphSerializer`]
//! - snapshot lifecycle events and subscribers
//! - storage traits plus an in-memory store
//! - configuration, the error facility and the logging facility

pub mod config;
pub mod context;
pub mod entity;
pub mod errors;
pub mod events;
pub mod logging_facility;
pub mod serializer;
pub mod snapshot;
pub mod store;

pub use snapkeep_core_types as core_types;

// Re-export commonly used types
pub use config::SnapshotConfig;
pub use context::{Context, SerializerContext};
pub use entity::{Attribute, AttributeValue, Entity, EntityRef};
pub use errors::{ExError, ExErrorKind, Result, SnapshotError};
pub use events::{EventDispatcher, PostSnapshotEvent, PreSnapshotEvent, SnapshotSubscriber};
pub use serializer::{Denormalizer, GraphSerializer, Normalizer, Serializer};
pub use snapshot::{SnapshotData, SnapshotRecord, SourceIdentity};
pub use store::{InMemorySnapshotStore, SnapshotRepository, SnapshotStore, UnitOfWork};
