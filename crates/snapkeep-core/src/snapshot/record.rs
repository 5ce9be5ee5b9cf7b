//! Snapshot record: the immutable-intent storage unit.

use crate::errors::SnapshotError;
use crate::snapshot::digest::compute_checksum;
use crate::snapshot::identity::SourceIdentity;
use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Structured snapshot payload: field name to JSON value
pub type SnapshotData = Map<String, Value>;

/// Maximum length of `source_class` and `source_id`
pub const MAX_SOURCE_LEN: usize = 255;

/// Version assigned to every new record
pub const DEFAULT_VERSION: i32 = 1;

/// A point-in-time copy of one entity's serialized state.
///
/// `checksum` is derived from `data` and recomputed whenever `data` is set;
/// it has no setter. The type serializes (for export and the CLI) but does
/// not deserialize, so a checksum can never be read in from outside.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotRecord {
    id: Option<i64>,
    source_class: String,
    source_id: String,
    data: SnapshotData,
    metadata: Option<SnapshotData>,
    version: i32,
    create_time: DateTime<Utc>,
    checksum: String,
}

impl SnapshotRecord {
    /// Create an unsaved record stamped with the current time, truncated to
    /// the microsecond precision stores keep
    pub fn new(identity: SourceIdentity, data: SnapshotData) -> Self {
        Self::with_create_time(identity, data, Utc::now().trunc_subsecs(6))
    }

    /// Create an unsaved record with an explicit creation time
    pub fn with_create_time(
        identity: SourceIdentity,
        data: SnapshotData,
        create_time: DateTime<Utc>,
    ) -> Self {
        let checksum = compute_checksum(&data);
        Self {
            id: None,
            source_class: identity.source_class,
            source_id: identity.source_id,
            data,
            metadata: None,
            version: DEFAULT_VERSION,
            create_time,
            checksum,
        }
    }

    /// Rebuild a record loaded from storage.
    ///
    /// The checksum is recomputed from `data`; callers holding a stored
    /// checksum compare it against [`SnapshotRecord::checksum`].
    pub fn restore(
        id: i64,
        identity: SourceIdentity,
        data: SnapshotData,
        metadata: Option<SnapshotData>,
        version: i32,
        create_time: DateTime<Utc>,
    ) -> Self {
        let mut record = Self::with_create_time(identity, data, create_time);
        record.id = Some(id);
        record.metadata = metadata;
        record.version = version;
        record
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Assign the surrogate id. Stores call this on first persist.
    pub fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    pub fn source_class(&self) -> &str {
        &self.source_class
    }

    pub fn set_source_class(&mut self, source_class: impl Into<String>) {
        self.source_class = source_class.into();
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn set_source_id(&mut self, source_id: impl Into<String>) {
        self.source_id = source_id.into();
    }

    /// The `(source_class, source_id)` pair this record belongs to
    pub fn identity(&self) -> SourceIdentity {
        SourceIdentity::new(self.source_class.clone(), self.source_id.clone())
    }

    pub fn data(&self) -> &SnapshotData {
        &self.data
    }

    /// Replace the payload and recompute the checksum
    pub fn set_data(&mut self, data: SnapshotData) {
        self.checksum = compute_checksum(&data);
        self.data = data;
    }

    pub fn metadata(&self) -> Option<&SnapshotData> {
        self.metadata.as_ref()
    }

    pub fn set_metadata(&mut self, metadata: Option<SnapshotData>) {
        self.metadata = metadata;
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    /// Adjust the version. Nothing in capture or storage increments it;
    /// it is reserved for format migrations.
    pub fn set_version(&mut self, version: i32) {
        self.version = version;
    }

    pub fn create_time(&self) -> DateTime<Utc> {
        self.create_time
    }

    pub fn set_create_time(&mut self, create_time: DateTime<Utc>) {
        self.create_time = create_time;
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// Check the column constraints a store enforces before insert.
    ///
    /// # Errors
    ///
    /// `SnapshotError::InvalidRecord` naming the first offending field.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        check_source_field("source_class", &self.source_class)?;
        check_source_field("source_id", &self.source_id)
    }
}

fn check_source_field(field: &str, value: &str) -> Result<(), SnapshotError> {
    if value.trim().is_empty() {
        return Err(SnapshotError::InvalidRecord {
            field: field.to_string(),
            reason: "must not be blank".to_string(),
        });
    }
    if value.chars().count() > MAX_SOURCE_LEN {
        return Err(SnapshotError::InvalidRecord {
            field: field.to_string(),
            reason: format!("must be at most {} characters", MAX_SOURCE_LEN),
        });
    }
    Ok(())
}

impl std::fmt::Display for SnapshotRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Snapshot[{}#{}]@{}",
            self.source_class,
            self.source_id,
            self.create_time.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn data(value: Value) -> SnapshotData {
        value.as_object().cloned().unwrap_or_default()
    }

    fn product(id: &str, payload: Value) -> SnapshotRecord {
        SnapshotRecord::new(SourceIdentity::new("App\\Entity\\Product", id), data(payload))
    }

    #[test]
    fn test_new_record_defaults() {
        let record = product("1", json!({"name": "Product 1"}));
        assert_eq!(record.id(), None);
        assert_eq!(record.version(), DEFAULT_VERSION);
        assert!(record.metadata().is_none());
        assert_eq!(record.checksum().len(), 32);
    }

    #[test]
    fn test_set_data_recomputes_checksum() {
        let mut record = product("1", json!({"name": "Product 1"}));
        let before = record.checksum().to_string();

        record.set_data(data(json!({"name": "Product 2"})));
        assert_ne!(record.checksum(), before);

        record.set_data(data(json!({"name": "Product 1"})));
        assert_eq!(record.checksum(), before);
    }

    #[test]
    fn test_equal_data_equal_checksum_across_sources() {
        let a = product("1", json!({"name": "Product 1"}));
        let b = product("2", json!({"name": "Product 1"}));
        let c = product("3", json!({"name": "Product 2"}));
        assert_eq!(a.checksum(), b.checksum());
        assert_ne!(a.checksum(), c.checksum());
    }

    #[test]
    fn test_display_format() {
        let created = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let record = SnapshotRecord::with_create_time(
            SourceIdentity::new("App\\Entity\\Order", "100"),
            SnapshotData::new(),
            created,
        );
        assert_eq!(
            record.to_string(),
            "Snapshot[App\\Entity\\Order#100]@2024-03-09 14:05:07"
        );
    }

    #[test]
    fn test_validate_rejects_blank_and_long_sources() {
        let mut record = product("1", json!({}));
        assert!(record.validate().is_ok());

        record.set_source_id("   ");
        assert!(matches!(
            record.validate(),
            Err(SnapshotError::InvalidRecord { ref field, .. }) if field == "source_id"
        ));

        record.set_source_id("1");
        record.set_source_class("x".repeat(MAX_SOURCE_LEN + 1));
        assert!(matches!(
            record.validate(),
            Err(SnapshotError::InvalidRecord { ref field, .. }) if field == "source_class"
        ));
    }

    #[test]
    fn test_restore_keeps_stored_fields() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let record = SnapshotRecord::restore(
            7,
            SourceIdentity::new("Product", "1"),
            data(json!({"name": "Product 1"})),
            Some(data(json!({"created_by": "test_user"}))),
            3,
            created,
        );
        assert_eq!(record.id(), Some(7));
        assert_eq!(record.version(), 3);
        assert_eq!(record.create_time(), created);
        assert_eq!(
            record.checksum(),
            product("9", json!({"name": "Product 1"})).checksum()
        );
    }
}
