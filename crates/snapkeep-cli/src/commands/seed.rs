//! Demo data
//!
//! Usage: snapkeep seed-demo
//!
//! Captures two products and one order through the snapshot manager, in
//! one unit of work.

use super::{open_store, Output};
use serde_json::{json, Map, Value};
use snapkeep_core::context::Context;
use snapkeep_core::entity::{Attribute, Entity};
use snapkeep_core::serializer::GraphSerializer;
use snapkeep_core::store::UnitOfWork;
use snapkeep_core::SnapshotConfig;
use snapkeep_engine::SnapshotManager;
use std::path::Path;
use std::sync::Arc;

pub const PRODUCT_CLASS: &str = "App\\Entity\\Product";
pub const ORDER_CLASS: &str = "App\\Entity\\Order";

struct DemoProduct {
    id: i64,
    name: &'static str,
    price: f64,
}

impl Entity for DemoProduct {
    fn entity_class(&self) -> &str {
        PRODUCT_CLASS
    }

    fn identifier_values(&self) -> Map<String, Value> {
        let mut ids = Map::new();
        ids.insert("id".to_string(), json!(self.id));
        ids
    }

    fn attributes(&self) -> Vec<Attribute<'_>> {
        vec![
            Attribute::scalar("id", self.id),
            Attribute::scalar("name", self.name),
            Attribute::scalar("price", self.price),
        ]
    }
}

struct DemoLine {
    product_id: i64,
    quantity: i64,
    price: f64,
}

struct DemoOrder {
    id: i64,
    order_number: &'static str,
    items: Vec<DemoLine>,
}

impl DemoOrder {
    fn total_amount(&self) -> f64 {
        self.items
            .iter()
            .map(|line| line.price * line.quantity as f64)
            .sum()
    }
}

impl Entity for DemoOrder {
    fn entity_class(&self) -> &str {
        ORDER_CLASS
    }

    fn identifier_values(&self) -> Map<String, Value> {
        let mut ids = Map::new();
        ids.insert("id".to_string(), json!(self.id));
        ids
    }

    fn attributes(&self) -> Vec<Attribute<'_>> {
        let items: Vec<Value> = self
            .items
            .iter()
            .map(|line| {
                json!({
                    "productId": line.product_id,
                    "quantity": line.quantity,
                    "price": line.price,
                })
            })
            .collect();
        vec![
            Attribute::scalar("id", self.id),
            Attribute::scalar("orderNumber", self.order_number),
            Attribute::scalar("totalAmount", self.total_amount()),
            Attribute::scalar("items", items),
        ]
    }
}

pub fn seed_demo(db: &Path, output: Output) -> anyhow::Result<()> {
    let config = SnapshotConfig::from_env()?;
    let manager = SnapshotManager::new(config, Arc::new(GraphSerializer::new()));
    let mut store = open_store(db)?;

    let products = [
        DemoProduct {
            id: 1,
            name: "Test Product 1",
            price: 99.99,
        },
        DemoProduct {
            id: 2,
            name: "Test Product 2",
            price: 149.99,
        },
    ];
    let order = DemoOrder {
        id: 100,
        order_number: "ORD-2024-001",
        items: products
            .iter()
            .map(|product| DemoLine {
                product_id: product.id,
                quantity: 1,
                price: product.price,
            })
            .collect(),
    };

    let mut records = Vec::new();
    for product in &products {
        records.push(manager.create(&mut store, product, Context::new())?);
    }
    records.push(manager.create(&mut store, &order, Context::new())?);
    store.flush()?;

    tracing::info!(count = records.len(), "Seeded demo snapshots");
    output.records(&records)
}
