//! Snapshot lifecycle notifications
//!
//! Subscribers observe every snapshot creation twice: before serialization
//! (with a mutable capture context they may rewrite) and after the record
//! has been registered with the unit of work. Subscribers run in
//! registration order; the first error aborts the creation.

use crate::context::Context;
use crate::entity::Entity;
use crate::errors::Result;
use crate::snapshot::SnapshotRecord;
use std::sync::Arc;

/// Dispatched before an entity is serialized
pub struct PreSnapshotEvent<'a> {
    entity: &'a dyn Entity,
    context: Context,
}

impl<'a> PreSnapshotEvent<'a> {
    pub fn new(entity: &'a dyn Entity, context: Context) -> Self {
        Self { entity, context }
    }

    pub fn entity(&self) -> &'a dyn Entity {
        self.entity
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// Replace the capture context wholesale
    pub fn set_context(&mut self, context: Context) {
        self.context = context;
    }

    pub fn into_context(self) -> Context {
        self.context
    }
}

/// Dispatched after the record has been registered for persistence
pub struct PostSnapshotEvent<'a> {
    entity: &'a dyn Entity,
    snapshot: &'a SnapshotRecord,
}

impl<'a> PostSnapshotEvent<'a> {
    pub fn new(entity: &'a dyn Entity, snapshot: &'a SnapshotRecord) -> Self {
        Self { entity, snapshot }
    }

    pub fn entity(&self) -> &'a dyn Entity {
        self.entity
    }

    pub fn snapshot(&self) -> &'a SnapshotRecord {
        self.snapshot
    }
}

/// Observer of snapshot creation. Both hooks default to no-ops.
pub trait SnapshotSubscriber: Send + Sync {
    /// # Errors
    ///
    /// Any error aborts the snapshot before serialization.
    fn on_pre_snapshot(&self, _event: &mut PreSnapshotEvent<'_>) -> Result<()> {
        Ok(())
    }

    /// # Errors
    ///
    /// Any error is returned from `create`; the record stays registered.
    fn on_post_snapshot(&self, _event: &PostSnapshotEvent<'_>) -> Result<()> {
        Ok(())
    }
}

/// Ordered list of subscribers
#[derive(Clone, Default)]
pub struct EventDispatcher {
    subscribers: Vec<Arc<dyn SnapshotSubscriber>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscriber: Arc<dyn SnapshotSubscriber>) {
        self.subscribers.push(subscriber);
    }

    pub fn with_subscriber(mut self, subscriber: Arc<dyn SnapshotSubscriber>) -> Self {
        self.subscribe(subscriber);
        self
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// # Errors
    ///
    /// The first subscriber error, unchanged.
    pub fn dispatch_pre(&self, event: &mut PreSnapshotEvent<'_>) -> Result<()> {
        for subscriber in &self.subscribers {
            subscriber.on_pre_snapshot(event)?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// The first subscriber error, unchanged.
    pub fn dispatch_post(&self, event: &PostSnapshotEvent<'_>) -> Result<()> {
        for subscriber in &self.subscribers {
            subscriber.on_post_snapshot(event)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
