use serde_json::{json, Value};
use snapkeep_core::context::{Context, GROUPS};

/// Group every marker uses unless told otherwise
pub const DEFAULT_GROUP: &str = "snapshot";

/// Appended to a field name to form its default target field
pub const TARGET_SUFFIX: &str = "Snapshot";

/// Marks one field of a host type for snapshotting
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotMarker {
    /// Serialization groups passed as the `groups` context key
    pub groups: Vec<String>,
    /// Target field override; `None` means `<field>Snapshot`
    pub target_snapshot_property: Option<String>,
    /// Extra serializer context for this field
    pub context: Context,
    /// Register the created record with the unit of work again
    pub cascade: bool,
}

impl Default for SnapshotMarker {
    fn default() -> Self {
        Self {
            groups: vec![DEFAULT_GROUP.to_string()],
            target_snapshot_property: None,
            context: Context::new(),
            cascade: true,
        }
    }
}

impl SnapshotMarker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_snapshot_property = Some(target.into());
        self
    }

    pub fn with_context_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    pub fn with_cascade(mut self, cascade: bool) -> Self {
        self.cascade = cascade;
        self
    }

    /// Name of the field that receives the record for `field_name`
    pub fn target_snapshot_property(&self, field_name: &str) -> String {
        self.target_snapshot_property
            .clone()
            .unwrap_or_else(|| format!("{}{}", field_name, TARGET_SUFFIX))
    }

    /// Marker context with `groups` set to the marker's groups
    pub fn capture_context(&self) -> Context {
        let mut context = self.context.clone();
        context.insert(GROUPS.to_string(), json!(self.groups));
        context
    }
}
