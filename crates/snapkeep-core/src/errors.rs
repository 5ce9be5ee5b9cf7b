use thiserror::Error;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code usable for programmatic handling,
/// tests, and CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Validation
    InvalidInput,
    NotFound,

    // Capture configuration
    /// A snapshot marker points at a target field the host type does not declare
    InvalidSnapshotTarget,

    // Serialization contract
    /// The normalizer returned something other than a structured map
    SnapshotSerializationFailure,
    /// A cycle was found while normalizing and no handler was configured
    CircularReference,
    /// No denormalizer factory is registered for a source class
    UnknownSourceClass,

    // Integrity
    /// A stored checksum disagrees with the checksum recomputed from data
    ChecksumMismatch,

    // Integration/IO
    Configuration,
    Serialization,
    Persistence,
    ExternalService,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::InvalidSnapshotTarget => "ERR_INVALID_SNAPSHOT_TARGET",
            ExErrorKind::SnapshotSerializationFailure => "ERR_SNAPSHOT_SERIALIZATION_FAILURE",
            ExErrorKind::CircularReference => "ERR_CIRCULAR_REFERENCE",
            ExErrorKind::UnknownSourceClass => "ERR_UNKNOWN_SOURCE_CLASS",
            ExErrorKind::ChecksumMismatch => "ERR_CHECKSUM_MISMATCH",
            ExErrorKind::Configuration => "ERR_CONFIGURATION",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::ExternalService => "ERR_EXTERNAL_SERVICE",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification kind for programmatic handling plus context
/// (operation, entity, field) for debugging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    field: Option<String>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            field: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity context (a source class, a source identity, or a record id)
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add field context (capture trigger errors)
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the field context, if any
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity: {})", entity_id)?;
        }
        if let Some(field) = &self.field {
            write!(f, " (field: {})", field)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Domain error taxonomy for snapshot capture and storage
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapshotError {
    /// The declared target field for a snapshot marker does not exist
    #[error("Target snapshot property \"{target}\" does not exist in class \"{class}\"")]
    InvalidSnapshotTarget {
        class: String,
        field: String,
        target: String,
    },

    /// The normalizer produced a non-map value
    #[error("Failed to normalize entity to a map (got {actual})")]
    SerializationFailure { class: String, actual: String },

    /// Object graph revisits an object still being normalized
    #[error("Circular reference detected for {class}#{source_id}")]
    CircularReference { class: String, source_id: String },

    /// Hydration asked for a class nobody registered
    #[error("No denormalizer registered for class {class}")]
    UnknownSourceClass { class: String },

    /// Entity has no usable identifier values
    #[error("Entity of class {class} has no identifier values")]
    MissingIdentity { class: String },

    /// Record field failed validation
    #[error("Invalid snapshot record field {field}: {reason}")]
    InvalidRecord { field: String, reason: String },

    /// Stored checksum differs from the data it claims to cover
    #[error("Checksum mismatch for snapshot {snapshot_id}: stored {stored}, computed {computed}")]
    ChecksumMismatch {
        snapshot_id: i64,
        stored: String,
        computed: String,
    },

    /// Configuration value could not be read or parsed
    #[error("Invalid configuration: {message}")]
    Configuration { message: String },

    /// JSON (de)serialization error
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

/// Conversion from SnapshotError to ExError
impl From<SnapshotError> for ExError {
    fn from(err: SnapshotError) -> Self {
        let message = err.to_string();
        match err {
            SnapshotError::InvalidSnapshotTarget { class, field, .. } => {
                ExError::new(ExErrorKind::InvalidSnapshotTarget)
                    .with_op("resolve_snapshot_target")
                    .with_entity_id(class)
                    .with_field(field)
                    .with_message(message)
            }
            SnapshotError::SerializationFailure { class, .. } => {
                ExError::new(ExErrorKind::SnapshotSerializationFailure)
                    .with_op("normalize")
                    .with_entity_id(class)
                    .with_message(message)
            }
            SnapshotError::CircularReference { class, source_id } => {
                ExError::new(ExErrorKind::CircularReference)
                    .with_op("normalize")
                    .with_entity_id(format!("{}#{}", class, source_id))
                    .with_message(message)
            }
            SnapshotError::UnknownSourceClass { class } => {
                ExError::new(ExErrorKind::UnknownSourceClass)
                    .with_op("denormalize")
                    .with_entity_id(class)
                    .with_message(message)
            }
            SnapshotError::MissingIdentity { class } => ExError::new(ExErrorKind::InvalidInput)
                .with_op("resolve_source_identity")
                .with_entity_id(class)
                .with_message(message),
            SnapshotError::InvalidRecord { field, .. } => ExError::new(ExErrorKind::InvalidInput)
                .with_op("validate_snapshot")
                .with_field(field)
                .with_message(message),
            SnapshotError::ChecksumMismatch { snapshot_id, .. } => {
                ExError::new(ExErrorKind::ChecksumMismatch)
                    .with_op("verify_checksum")
                    .with_entity_id(snapshot_id.to_string())
                    .with_message(message)
            }
            SnapshotError::Configuration { .. } => ExError::new(ExErrorKind::Configuration)
                .with_op("load_config")
                .with_message(message),
            SnapshotError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
        }
    }
}

/// Conversion from serde_json::Error to SnapshotError
impl From<serde_json::Error> for SnapshotError {
    fn from(err: serde_json::Error) -> Self {
        SnapshotError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Conversion from config::ConfigError to SnapshotError
impl From<config::ConfigError> for SnapshotError {
    fn from(err: config::ConfigError) -> Self {
        SnapshotError::Configuration {
            message: err.to_string(),
        }
    }
}
