use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::deployment::{Deployment, DeploymentSlot};
use super::element_order::ElementOrder;
use super::status::SnapshotStatus;
use crate::errors::{DeploySnapError, Result};

/// A versioned bundle of configuration state for a deployment
///
/// Snapshots without a deployment are templates. Status changes only go
/// through [`Snapshot::queue`], [`Snapshot::begin_commit`],
/// [`Snapshot::mark_applied`] and [`Snapshot::mark_failed`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unique identifier (UUID v7)
    pub id: String,

    /// Unique within the owning deployment
    pub name: String,

    pub description: Option<String>,

    /// Sort key among a barclamp's snapshots
    pub order: i64,

    status: SnapshotStatus,

    /// Set only while `status` is `Failed`
    failed_reason: Option<String>,

    /// Serialized [`ElementOrder`], see [`Snapshot::element_order`]
    pub element_order: Option<String>,

    /// `None` for templates
    pub deployment_id: Option<String>,

    /// Defining module
    pub barclamp_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Snapshot {
    /// Create a snapshot in `Created` status with no deployment
    pub fn new(id: String, name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            description: None,
            order: 0,
            status: SnapshotStatus::Created,
            failed_reason: None,
            element_order: None,
            deployment_id: None,
            barclamp_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a snapshot from persisted lifecycle fields
    ///
    /// Used by stores when hydrating rows; run [`Snapshot::validate`] before
    /// trusting the result.
    pub fn with_lifecycle(mut self, status: SnapshotStatus, failed_reason: Option<String>) -> Self {
        self.status = status;
        self.failed_reason = failed_reason;
        self
    }

    pub fn status(&self) -> SnapshotStatus {
        self.status
    }

    pub fn failed_reason(&self) -> Option<&str> {
        self.failed_reason.as_deref()
    }

    pub fn is_template(&self) -> bool {
        self.deployment_id.is_none()
    }

    // ===== State machine =====

    fn transition(&mut self, to: SnapshotStatus) -> Result<SnapshotStatus> {
        let from = self.status;
        if !from.can_transition_to(to) {
            return Err(DeploySnapError::InvalidTransition {
                snapshot_id: self.id.clone(),
                from,
                to,
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(from)
    }

    /// Request a commit (`Created -> Queued`) or retry one (`Failed -> Queued`)
    ///
    /// Returns the status the snapshot left.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` from any other status.
    pub fn queue(&mut self) -> Result<SnapshotStatus> {
        let from = self.transition(SnapshotStatus::Queued)?;
        self.failed_reason = None;
        Ok(from)
    }

    /// `Queued -> Committing`
    ///
    /// # Errors
    ///
    /// `InvalidTransition` from any other status.
    pub fn begin_commit(&mut self) -> Result<SnapshotStatus> {
        self.transition(SnapshotStatus::Committing)
    }

    /// `Committing -> Applied`, clearing any failure reason
    ///
    /// # Errors
    ///
    /// `InvalidTransition` from any other status.
    pub fn mark_applied(&mut self) -> Result<SnapshotStatus> {
        let from = self.transition(SnapshotStatus::Applied)?;
        self.failed_reason = None;
        Ok(from)
    }

    /// `Committing -> Failed`, recording why
    ///
    /// # Errors
    ///
    /// `InvalidTransition` from any other status.
    pub fn mark_failed(&mut self, reason: impl Into<String>) -> Result<SnapshotStatus> {
        let from = self.transition(SnapshotStatus::Failed)?;
        self.failed_reason = Some(reason.into());
        Ok(from)
    }

    /// Put the clone-time lifecycle in place: `Created`, no failure reason
    pub(crate) fn reset_lifecycle(&mut self) {
        self.status = SnapshotStatus::Created;
        self.failed_reason = None;
    }

    // ===== Derived predicates =====

    fn occupies(&self, deployment: Option<&Deployment>, slot: DeploymentSlot) -> bool {
        let Some(own) = self.deployment_id.as_deref() else {
            return false;
        };
        deployment.is_some_and(|d| d.id == own && d.slot(slot) == Some(self.id.as_str()))
    }

    /// True when the snapshot's own `deployment` points its active slot at it
    ///
    /// A deployment other than the snapshot's own never counts.
    pub fn is_active(&self, deployment: Option<&Deployment>) -> bool {
        self.occupies(deployment, DeploymentSlot::Active)
    }

    pub fn is_committed(&self, deployment: Option<&Deployment>) -> bool {
        self.occupies(deployment, DeploymentSlot::Committed)
    }

    pub fn is_proposed(&self, deployment: Option<&Deployment>) -> bool {
        self.occupies(deployment, DeploymentSlot::Proposed)
    }

    // ===== Element order =====

    /// Decode `element_order`
    ///
    /// # Errors
    ///
    /// `InvalidElementOrder` when the stored payload is malformed.
    pub fn element_order(&self) -> Result<ElementOrder> {
        ElementOrder::parse(self.element_order.as_deref()).map_err(|e| {
            DeploySnapError::InvalidElementOrder {
                snapshot_id: self.id.clone(),
                reason: e.to_string(),
            }
        })
    }

    pub fn set_element_order(&mut self, order: &ElementOrder) {
        self.element_order = Some(order.to_json());
        self.updated_at = Utc::now();
    }

    // ===== Validation =====

    /// Check scalar fields before they are persisted
    ///
    /// # Errors
    ///
    /// `InvalidSnapshot` for a blank name or a failure reason outside `Failed`.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(DeploySnapError::InvalidSnapshot {
                snapshot_id: self.id.clone(),
                reason: "name cannot be empty or whitespace-only".to_string(),
            });
        }
        if self.failed_reason.is_some() && self.status != SnapshotStatus::Failed {
            return Err(DeploySnapError::InvalidSnapshot {
                snapshot_id: self.id.clone(),
                reason: format!("failed_reason set while status is {}", self.status),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployed(id: &str) -> Snapshot {
        let mut snap = Snapshot::new(id.to_string(), "base".to_string());
        snap.deployment_id = Some("d1".to_string());
        snap
    }

    #[test]
    fn test_new_snapshot_is_created_template() {
        let snap = Snapshot::new("s1".into(), "base".into());
        assert_eq!(snap.status(), SnapshotStatus::Created);
        assert!(snap.is_template());
        assert_eq!(snap.failed_reason(), None);
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut snap = deployed("s1");
        assert_eq!(snap.queue().unwrap(), SnapshotStatus::Created);
        assert_eq!(snap.begin_commit().unwrap(), SnapshotStatus::Queued);
        assert_eq!(snap.mark_applied().unwrap(), SnapshotStatus::Committing);
        assert_eq!(snap.status(), SnapshotStatus::Applied);
    }

    #[test]
    fn test_failure_then_retry_clears_reason() {
        let mut snap = deployed("s1");
        snap.queue().unwrap();
        snap.begin_commit().unwrap();
        snap.mark_failed("chef run exploded").unwrap();
        assert_eq!(snap.failed_reason(), Some("chef run exploded"));
        snap.validate().unwrap();

        snap.queue().unwrap();
        assert_eq!(snap.status(), SnapshotStatus::Queued);
        assert_eq!(snap.failed_reason(), None);
    }

    #[test]
    fn test_rejected_transition_leaves_state_untouched() {
        let mut snap = deployed("s1");
        let err = snap.mark_applied().unwrap_err();
        assert_eq!(
            err,
            DeploySnapError::InvalidTransition {
                snapshot_id: "s1".into(),
                from: SnapshotStatus::Created,
                to: SnapshotStatus::Applied,
            }
        );
        assert_eq!(snap.status(), SnapshotStatus::Created);
    }

    #[test]
    fn test_applied_is_terminal() {
        let mut snap = deployed("s1");
        snap.queue().unwrap();
        snap.begin_commit().unwrap();
        snap.mark_applied().unwrap();
        assert!(snap.queue().is_err());
        assert!(snap.begin_commit().is_err());
        assert!(snap.mark_failed("late").is_err());
        assert_eq!(snap.failed_reason(), None);
    }

    #[test]
    fn test_predicates_against_deployment() {
        let snap = deployed("s1");
        let mut deployment = Deployment::new("d1".into(), "prod".into());
        deployment.point(DeploymentSlot::Committed, Some("s1".into()));

        assert!(snap.is_committed(Some(&deployment)));
        assert!(!snap.is_active(Some(&deployment)));
        assert!(!snap.is_proposed(Some(&deployment)));
    }

    #[test]
    fn test_predicates_ignore_foreign_deployment() {
        let snap = deployed("s1");
        let mut foreign = Deployment::new("d2".into(), "staging".into());
        for slot in DeploymentSlot::ALL {
            foreign.point(slot, Some("s1".into()));
        }

        assert!(!snap.is_active(Some(&foreign)));
        assert!(!snap.is_committed(Some(&foreign)));
        assert!(!snap.is_proposed(Some(&foreign)));
    }

    #[test]
    fn test_predicates_false_without_deployment() {
        let template = Snapshot::new("s1".into(), "tmpl".into());
        let mut deployment = Deployment::new("d1".into(), "prod".into());
        deployment.point(DeploymentSlot::Active, Some("s1".into()));

        assert!(!template.is_active(None));
        assert!(!template.is_active(Some(&deployment)));
        assert!(!deployed("s1").is_active(None));
    }

    #[test]
    fn test_validate_rejects_blank_name() {
        let snap = Snapshot::new("s1".into(), "   ".into());
        assert!(matches!(
            snap.validate(),
            Err(DeploySnapError::InvalidSnapshot { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_reason_outside_failed() {
        let snap = Snapshot::new("s1".into(), "base".into())
            .with_lifecycle(SnapshotStatus::Applied, Some("stale".into()));
        assert!(snap.validate().is_err());
    }

    #[test]
    fn test_malformed_element_order_names_snapshot() {
        let mut snap = Snapshot::new("s1".into(), "base".into());
        snap.element_order = Some("[[".into());
        match snap.element_order() {
            Err(DeploySnapError::InvalidElementOrder { snapshot_id, .. }) => {
                assert_eq!(snapshot_id, "s1")
            }
            other => panic!("expected InvalidElementOrder, got {:?}", other),
        }
    }
}
