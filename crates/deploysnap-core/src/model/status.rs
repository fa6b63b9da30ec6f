use serde::{Deserialize, Serialize};

use crate::errors::DeploySnapError;

/// Commit lifecycle of a snapshot
///
/// The discriminants are the persisted ordinals and must not change.
///
/// ```text
/// Created ─▶ Queued ─▶ Committing ─┬─▶ Applied
///              ▲                   │
///              └────── Failed ◀────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum SnapshotStatus {
    /// Not applied, just created
    Created = 1,
    /// Commit requested, waiting for a committer
    Queued = 2,
    /// Commit in progress
    Committing = 3,
    /// Commit attempt failed; may be re-queued
    Failed = 4,
    /// Commit succeeded; terminal
    Applied = 5,
}

impl SnapshotStatus {
    pub const ALL: [SnapshotStatus; 5] = [
        SnapshotStatus::Created,
        SnapshotStatus::Queued,
        SnapshotStatus::Committing,
        SnapshotStatus::Failed,
        SnapshotStatus::Applied,
    ];

    pub fn ordinal(self) -> i64 {
        self as i64
    }

    /// Decode a persisted ordinal
    ///
    /// # Errors
    ///
    /// Returns `UnknownStatus` for anything outside 1..=5.
    pub fn from_ordinal(value: i64) -> Result<Self, DeploySnapError> {
        match value {
            1 => Ok(SnapshotStatus::Created),
            2 => Ok(SnapshotStatus::Queued),
            3 => Ok(SnapshotStatus::Committing),
            4 => Ok(SnapshotStatus::Failed),
            5 => Ok(SnapshotStatus::Applied),
            other => Err(DeploySnapError::UnknownStatus { value: other }),
        }
    }

    /// Whether `self -> next` is one of the five lifecycle edges
    pub fn can_transition_to(self, next: SnapshotStatus) -> bool {
        use SnapshotStatus::{Applied, Committing, Created, Failed, Queued};
        matches!(
            (self, next),
            (Created, Queued)
                | (Queued, Committing)
                | (Committing, Applied)
                | (Committing, Failed)
                | (Failed, Queued)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == SnapshotStatus::Applied
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SnapshotStatus::Created => "created",
            SnapshotStatus::Queued => "queued",
            SnapshotStatus::Committing => "committing",
            SnapshotStatus::Failed => "failed",
            SnapshotStatus::Applied => "applied",
        }
    }
}

impl std::fmt::Display for SnapshotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SnapshotStatus> for i64 {
    fn from(status: SnapshotStatus) -> Self {
        status.ordinal()
    }
}

impl TryFrom<i64> for SnapshotStatus {
    type Error = DeploySnapError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        SnapshotStatus::from_ordinal(value)
    }
}
