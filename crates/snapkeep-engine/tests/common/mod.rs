//! Shared fixtures for engine integration tests
#![allow(dead_code)]

use serde::Deserialize;
use serde_json::{json, Map, Value};
use snapkeep_core::entity::{Attribute, Entity};
use snapkeep_core::serializer::GraphSerializer;
use snapkeep_core::snapshot::SnapshotRecord;
use snapkeep_core::SnapshotConfig;
use snapkeep_engine::{
    CaptureRegistry, CaptureSchema, FieldState, SnapshotListener, SnapshotManager, SnapshotMarker,
    Snapshottable,
};
use std::sync::Arc;

pub const SNAPSHOT_GROUP: &[&str] = &["snapshot"];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Supplier {
    pub id: i64,
    pub name: String,
}

impl Entity for Supplier {
    fn entity_class(&self) -> &str {
        "App\\Entity\\Supplier"
    }

    fn identifier_values(&self) -> Map<String, Value> {
        let mut ids = Map::new();
        ids.insert("id".to_string(), json!(self.id));
        ids
    }

    fn attributes(&self) -> Vec<Attribute<'_>> {
        vec![
            Attribute::scalar("id", self.id).in_groups(SNAPSHOT_GROUP),
            Attribute::scalar("name", self.name.as_str()).in_groups(SNAPSHOT_GROUP),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    #[serde(skip)]
    pub internal_note: String,
    #[serde(skip)]
    pub supplier: Option<Supplier>,
}

impl Product {
    pub fn new(id: i64, name: &str, price: f64) -> Self {
        Self {
            id,
            name: name.to_string(),
            price,
            internal_note: String::new(),
            supplier: None,
        }
    }

    pub fn with_supplier(mut self, supplier: Supplier) -> Self {
        self.supplier = Some(supplier);
        self
    }
}

impl Entity for Product {
    fn entity_class(&self) -> &str {
        "App\\Entity\\Product"
    }

    fn identifier_values(&self) -> Map<String, Value> {
        let mut ids = Map::new();
        ids.insert("id".to_string(), json!(self.id));
        ids
    }

    fn attributes(&self) -> Vec<Attribute<'_>> {
        vec![
            Attribute::scalar("id", self.id).in_groups(SNAPSHOT_GROUP),
            Attribute::scalar("name", self.name.as_str()).in_groups(SNAPSHOT_GROUP),
            Attribute::scalar("price", self.price).in_groups(SNAPSHOT_GROUP),
            Attribute::scalar("internal_note", self.internal_note.as_str()),
            Attribute::optional_entity("supplier", self.supplier.as_ref())
                .in_groups(SNAPSHOT_GROUP),
        ]
    }
}

/// Entity with a two-field identity
pub struct PriceListEntry {
    pub key1: String,
    pub key2: i64,
    pub amount: i64,
}

impl Entity for PriceListEntry {
    fn entity_class(&self) -> &str {
        "App\\Entity\\PriceListEntry"
    }

    fn identifier_values(&self) -> Map<String, Value> {
        let mut ids = Map::new();
        ids.insert("key1".to_string(), json!(self.key1));
        ids.insert("key2".to_string(), json!(self.key2));
        ids
    }

    fn attributes(&self) -> Vec<Attribute<'_>> {
        vec![
            Attribute::scalar("key1", self.key1.as_str()),
            Attribute::scalar("key2", self.key2),
            Attribute::scalar("amount", self.amount),
        ]
    }
}

/// Owner of two marked fields
#[derive(Debug, Default)]
pub struct Order {
    pub id: i64,
    pub product: Snapshottable<Product>,
    pub product_snapshot: Option<SnapshotRecord>,
    pub gift: Option<Product>,
    pub frozen_gift: Option<SnapshotRecord>,
}

impl Order {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

pub fn order_schema(product_marker: SnapshotMarker, gift_marker: SnapshotMarker) -> CaptureSchema<Order> {
    CaptureSchema::new("App\\Entity\\Order")
        .snapshot_field(
            "product",
            product_marker,
            |order: &Order| order.product.state(),
            |order: &mut Order| order.product.clear(),
        )
        .snapshot_field(
            "gift",
            gift_marker,
            |order: &Order| FieldState::of(order.gift.as_ref()),
            |order: &mut Order| order.gift = None,
        )
        .target_field("productSnapshot", |order: &mut Order, record| {
            order.product_snapshot = Some(record)
        })
        .target_field("frozenGift", |order: &mut Order, record| {
            order.frozen_gift = Some(record)
        })
}

pub fn default_order_schema() -> CaptureSchema<Order> {
    order_schema(
        SnapshotMarker::default(),
        SnapshotMarker::default().with_target("frozenGift"),
    )
}

pub fn serializer() -> Arc<GraphSerializer> {
    Arc::new(
        GraphSerializer::new()
            .register_serde::<Product>("App\\Entity\\Product")
            .register_serde::<Supplier>("App\\Entity\\Supplier"),
    )
}

pub fn manager(config: SnapshotConfig) -> SnapshotManager {
    SnapshotManager::new(config, serializer())
}

pub fn listener(config: SnapshotConfig, schema: CaptureSchema<Order>) -> SnapshotListener {
    SnapshotListener::new(
        Arc::new(manager(config)),
        Arc::new(CaptureRegistry::new().with_schema(schema)),
    )
}
