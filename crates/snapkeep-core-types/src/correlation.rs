//! Correlation type for capture tracking
//!
//! A `CaptureId` groups the snapshots taken during a single
//! lifecycle notification, so a log reader can tell which records were
//! produced together for the same owning object.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier shared by every snapshot captured in one lifecycle pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaptureId(Uuid);

impl CaptureId {
    /// Generate a new CaptureId; UUIDv7 keeps them time-ordered
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Access the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CaptureId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CaptureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_id_display() {
        let id = CaptureId::new();
        assert_eq!(format!("{}", id), id.as_uuid().to_string());
    }

    #[test]
    fn test_capture_ids_are_time_ordered() {
        let first = CaptureId::new();
        let second = CaptureId::new();

        assert_ne!(first, second);
        // UUIDv7 embeds a millisecond timestamp in the high bits
        assert!(first.as_uuid().as_bytes()[..6] <= second.as_uuid().as_bytes()[..6]);
    }

    #[test]
    fn test_serialization() {
        let capture = CaptureId::new();
        let json = serde_json::to_string(&capture).unwrap();
        let restored: CaptureId = serde_json::from_str(&json).unwrap();
        assert_eq!(capture, restored);
    }
}
