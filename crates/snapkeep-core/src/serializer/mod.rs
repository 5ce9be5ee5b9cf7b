//! Serializer seam
//!
//! Snapshot capture turns an entity graph into a structured map and
//! hydration turns a stored map back into an entity. Both directions are
//! injected: any type implementing [`Normalizer`] and [`Denormalizer`] can
//! serve as the manager's serializer. [`GraphSerializer`] is the reference
//! implementation driven by [`crate::entity::Entity::attributes`].

mod graph;

pub use graph::{EntityFactory, GraphSerializer};

use crate::context::{Context, SerializerContext};
use crate::entity::Entity;
use crate::errors::Result;
use crate::snapshot::SnapshotData;
use serde_json::Value;

/// Converts an entity graph into a JSON value
pub trait Normalizer: Send + Sync {
    /// Normalize `entity` under the given context
    ///
    /// # Arguments
    /// * `entity` - Root of the graph to normalize
    /// * `format` - Optional format hint, `None` for plain structures
    /// * `context` - Options plus the circular-reference handler
    ///
    /// # Returns
    /// Any JSON value. Snapshot capture only accepts objects and rejects
    /// everything else with `SnapshotSerializationFailure`.
    ///
    /// # Errors
    ///
    /// Implementation specific; the reference serializer reports
    /// `CircularReference` when a cycle is met without a handler.
    fn normalize(
        &self,
        entity: &dyn Entity,
        format: Option<&str>,
        context: &SerializerContext,
    ) -> Result<Value>;
}

/// Rebuilds an entity of a named class from snapshot data
pub trait Denormalizer: Send + Sync {
    /// # Errors
    ///
    /// Implementation specific; the reference serializer reports
    /// `UnknownSourceClass` for classes it has no factory for.
    fn denormalize(
        &self,
        data: &SnapshotData,
        class: &str,
        format: Option<&str>,
        context: &Context,
    ) -> Result<Box<dyn Entity>>;
}

/// Both directions in one object
pub trait Serializer: Normalizer + Denormalizer {}

impl<T: Normalizer + Denormalizer> Serializer for T {}
