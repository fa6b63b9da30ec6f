use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::SnapshotStatus;

/// One entry of a snapshot's execution history
///
/// `snapshot_id` is cleared when the snapshot is destroyed; the entry itself
/// is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JigEvent {
    pub id: String,
    pub snapshot_id: Option<String>,
    /// Status the snapshot reached
    pub status: SnapshotStatus,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl JigEvent {
    pub fn new(
        id: String,
        snapshot_id: &str,
        status: SnapshotStatus,
        message: Option<String>,
    ) -> Self {
        Self {
            id,
            snapshot_id: Some(snapshot_id.to_string()),
            status,
            message,
            created_at: Utc::now(),
        }
    }
}
