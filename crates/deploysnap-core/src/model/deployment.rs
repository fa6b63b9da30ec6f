use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the three snapshot references a deployment holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentSlot {
    Active,
    Committed,
    Proposed,
}

impl DeploymentSlot {
    pub const ALL: [DeploymentSlot; 3] = [
        DeploymentSlot::Active,
        DeploymentSlot::Committed,
        DeploymentSlot::Proposed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DeploymentSlot::Active => "active",
            DeploymentSlot::Committed => "committed",
            DeploymentSlot::Proposed => "proposed",
        }
    }
}

/// A deployment and the snapshots it currently points at
///
/// Whether a snapshot is active, committed or proposed is never stored on the
/// snapshot; it is read off these references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub name: String,
    pub active_snapshot_id: Option<String>,
    pub committed_snapshot_id: Option<String>,
    pub proposed_snapshot_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deployment {
    pub fn new(id: String, name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            active_snapshot_id: None,
            committed_snapshot_id: None,
            proposed_snapshot_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn slot(&self, slot: DeploymentSlot) -> Option<&str> {
        match slot {
            DeploymentSlot::Active => self.active_snapshot_id.as_deref(),
            DeploymentSlot::Committed => self.committed_snapshot_id.as_deref(),
            DeploymentSlot::Proposed => self.proposed_snapshot_id.as_deref(),
        }
    }

    /// Repoint a slot; `None` empties it
    pub fn point(&mut self, slot: DeploymentSlot, snapshot_id: Option<String>) {
        match slot {
            DeploymentSlot::Active => self.active_snapshot_id = snapshot_id,
            DeploymentSlot::Committed => self.committed_snapshot_id = snapshot_id,
            DeploymentSlot::Proposed => self.proposed_snapshot_id = snapshot_id,
        }
        self.updated_at = Utc::now();
    }
}
