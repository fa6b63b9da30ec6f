//! Row <-> model conversion
//!
//! Timestamps are stored as RFC 3339 text with nanoseconds so a model read
//! back compares equal to the one written.

use chrono::{DateTime, SecondsFormat, Utc};
use deploysnap_core::errors::ExResult;
use deploysnap_core::model::{Deployment, JigEvent, Snapshot, SnapshotStatus};
use rusqlite::Row;

use crate::errors::corrupt_row;

pub(crate) const SNAPSHOT_COLUMNS: &str = "id, name, description, sort_order, element_order, \
     status, failed_reason, deployment_id, barclamp_id, created_at, updated_at";

pub(crate) const DEPLOYMENT_COLUMNS: &str = "id, name, active_snapshot_id, \
     committed_snapshot_id, proposed_snapshot_id, created_at, updated_at";

pub(crate) const ROLE_COLUMNS: &str =
    "id, snapshot_id, name, description, sort_order, run_order, created_at";

pub(crate) fn encode_time(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn decode_time(table: &str, id: &str, raw: &str) -> ExResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| corrupt_row(table, id, e))
}

/// Raw `snapshots` row; status, timestamps and the failure-reason invariant
/// are checked on conversion
pub(crate) struct SnapshotRow {
    id: String,
    name: String,
    description: Option<String>,
    sort_order: i64,
    element_order: Option<String>,
    status: i64,
    failed_reason: Option<String>,
    deployment_id: Option<String>,
    barclamp_id: Option<String>,
    created_at: String,
    updated_at: String,
}

impl SnapshotRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            sort_order: row.get(3)?,
            element_order: row.get(4)?,
            status: row.get(5)?,
            failed_reason: row.get(6)?,
            deployment_id: row.get(7)?,
            barclamp_id: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    pub(crate) fn into_snapshot(self) -> ExResult<Snapshot> {
        let status = SnapshotStatus::from_ordinal(self.status)
            .map_err(|e| corrupt_row("snapshots", &self.id, e))?;
        let created_at = decode_time("snapshots", &self.id, &self.created_at)?;
        let updated_at = decode_time("snapshots", &self.id, &self.updated_at)?;

        let mut snapshot =
            Snapshot::new(self.id, self.name).with_lifecycle(status, self.failed_reason);
        snapshot.description = self.description;
        snapshot.order = self.sort_order;
        snapshot.element_order = self.element_order;
        snapshot.deployment_id = self.deployment_id;
        snapshot.barclamp_id = self.barclamp_id;
        snapshot.created_at = created_at;
        snapshot.updated_at = updated_at;
        snapshot
            .validate()
            .map_err(|e| corrupt_row("snapshots", &snapshot.id, e))?;
        Ok(snapshot)
    }
}

pub(crate) struct DeploymentRow {
    id: String,
    name: String,
    active_snapshot_id: Option<String>,
    committed_snapshot_id: Option<String>,
    proposed_snapshot_id: Option<String>,
    created_at: String,
    updated_at: String,
}

impl DeploymentRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            active_snapshot_id: row.get(2)?,
            committed_snapshot_id: row.get(3)?,
            proposed_snapshot_id: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    pub(crate) fn into_deployment(self) -> ExResult<Deployment> {
        let created_at = decode_time("deployments", &self.id, &self.created_at)?;
        let updated_at = decode_time("deployments", &self.id, &self.updated_at)?;
        Ok(Deployment {
            id: self.id,
            name: self.name,
            active_snapshot_id: self.active_snapshot_id,
            committed_snapshot_id: self.committed_snapshot_id,
            proposed_snapshot_id: self.proposed_snapshot_id,
            created_at,
            updated_at,
        })
    }
}

pub(crate) struct JigEventRow {
    id: String,
    snapshot_id: Option<String>,
    status: i64,
    message: Option<String>,
    created_at: String,
}

impl JigEventRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            snapshot_id: row.get(1)?,
            status: row.get(2)?,
            message: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    pub(crate) fn into_event(self) -> ExResult<JigEvent> {
        let status = SnapshotStatus::from_ordinal(self.status)
            .map_err(|e| corrupt_row("jig_events", &self.id, e))?;
        let created_at = decode_time("jig_events", &self.id, &self.created_at)?;
        Ok(JigEvent {
            id: self.id,
            snapshot_id: self.snapshot_id,
            status,
            message: self.message,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_round_trips_exactly() {
        let now = Utc::now();
        let decoded = decode_time("t", "x", &encode_time(&now)).unwrap();
        assert_eq!(decoded, now);
    }

    fn snapshot_row(status: i64, failed_reason: Option<&str>) -> SnapshotRow {
        let now = encode_time(&Utc::now());
        SnapshotRow {
            id: "s1".into(),
            name: "base".into(),
            description: None,
            sort_order: 0,
            element_order: None,
            status,
            failed_reason: failed_reason.map(str::to_string),
            deployment_id: None,
            barclamp_id: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[test]
    fn test_failed_row_keeps_reason() {
        let snapshot = snapshot_row(4, Some("timeout")).into_snapshot().unwrap();
        assert_eq!(snapshot.status(), SnapshotStatus::Failed);
        assert_eq!(snapshot.failed_reason(), Some("timeout"));
    }

    #[test]
    fn test_reason_outside_failed_is_rejected() {
        let err = snapshot_row(5, Some("stale")).into_snapshot().unwrap_err();
        assert_eq!(
            err.kind(),
            deploysnap_core::errors::ExErrorKind::Deserialization
        );
        assert_eq!(err.entity_id(), Some("s1"));
    }

    #[test]
    fn test_bad_time_is_deserialization_error() {
        let err = decode_time("snapshots", "s1", "yesterday").unwrap_err();
        assert_eq!(
            err.kind(),
            deploysnap_core::errors::ExErrorKind::Deserialization
        );
        assert_eq!(err.entity_id(), Some("s1"));
    }
}
