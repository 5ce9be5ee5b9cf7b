//! Property tests for checksum and source identity determinism

use proptest::prelude::*;
use serde_json::{Map, Value};
use snapkeep_core::snapshot::{
    compute_checksum, encode_source_id, SnapshotData, SnapshotRecord, SourceIdentity, CHECKSUM_LEN,
};

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::from),
    ]
}

fn json_value() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn snapshot_data() -> impl Strategy<Value = SnapshotData> {
    prop::collection::btree_map("[a-z_]{1,8}", json_value(), 0..6)
        .prop_map(|m| m.into_iter().collect())
}

fn reversed(data: &SnapshotData) -> SnapshotData {
    let mut entries: Vec<_> = data.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    entries.reverse();
    entries.into_iter().collect::<Map<String, Value>>()
}

proptest! {
    #[test]
    fn checksum_is_deterministic(data in snapshot_data()) {
        let first = compute_checksum(&data);
        prop_assert_eq!(first.len(), CHECKSUM_LEN);
        prop_assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        prop_assert_eq!(&first, &compute_checksum(&data.clone()));
        prop_assert_eq!(&first, &compute_checksum(&reversed(&data)));
    }

    #[test]
    fn checksum_ignores_source_identity(data in snapshot_data(), a in "[0-9]{1,4}", b in "[0-9]{1,4}") {
        let left = SnapshotRecord::new(SourceIdentity::new("Product", a), data.clone());
        let right = SnapshotRecord::new(SourceIdentity::new("Order", b), data);
        prop_assert_eq!(left.checksum(), right.checksum());
    }

    #[test]
    fn composite_identity_ignores_insertion_order(x in "[a-z]{1,6}", y in any::<i64>()) {
        let mut forward = Map::new();
        forward.insert("key1".into(), Value::from(x.clone()));
        forward.insert("key2".into(), Value::from(y));
        let mut backward = Map::new();
        backward.insert("key2".into(), Value::from(y));
        backward.insert("key1".into(), Value::from(x));
        prop_assert_eq!(encode_source_id(&forward), encode_source_id(&backward));
    }
}
