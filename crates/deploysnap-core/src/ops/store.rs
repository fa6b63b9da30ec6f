use crate::errors::{ExErrorKind, ExResult};
use crate::model::{Attrib, AttribType, Deployment, JigEvent, Role, RoleDraft, Snapshot};

/// Persistence contract the snapshot operations are written against
///
/// Implementations own uniqueness: at most one role per (name, snapshot) and
/// at most one snapshot per (name, deployment). Role listings are ordered by
/// `(order, run_order)`, ties in creation order.
pub trait SnapshotStore {
    // ===== Snapshots =====

    /// # Errors
    ///
    /// `NotFound` if no snapshot has this id.
    fn get_snapshot(&self, id: &str) -> ExResult<Snapshot>;

    /// Snapshots of one deployment, or every snapshot when `deployment_id` is `None`
    fn list_snapshots(&self, deployment_id: Option<&str>) -> ExResult<Vec<Snapshot>>;

    /// Persist a new snapshot
    ///
    /// # Errors
    ///
    /// `ValidationFailure` when [`Snapshot::validate`] fails or the name is
    /// taken in the deployment, `NotFound` for an unknown deployment.
    fn insert_snapshot(&mut self, snapshot: &Snapshot) -> ExResult<()>;

    /// Persist scalar field changes of an existing snapshot
    fn save_snapshot(&mut self, snapshot: &Snapshot) -> ExResult<()>;

    /// Delete a snapshot together with its roles and their attribs
    ///
    /// Returns the number of roles removed. Jig events survive with their
    /// snapshot reference cleared, and deployment slots pointing at the
    /// snapshot are emptied.
    fn destroy_snapshot(&mut self, id: &str) -> ExResult<usize>;

    // ===== Deployments =====

    fn get_deployment(&self, id: &str) -> ExResult<Deployment>;

    fn insert_deployment(&mut self, deployment: &Deployment) -> ExResult<()>;

    fn save_deployment(&mut self, deployment: &Deployment) -> ExResult<()>;

    // ===== Roles =====

    fn get_role(&self, role_id: &str) -> ExResult<Role>;

    fn find_role_by_name_and_snapshot(&self, name: &str, snapshot_id: &str)
        -> ExResult<Option<Role>>;

    /// Create a role from `draft`
    ///
    /// # Errors
    ///
    /// `ConstraintViolation` when the snapshot already has a role with this name.
    fn create_role(&mut self, draft: RoleDraft) -> ExResult<Role>;

    /// Return the existing (name, snapshot) role or create it from `draft`
    ///
    /// Fields of `draft` other than the name only apply on creation. A
    /// concurrent creator can still make this return `ConstraintViolation`.
    fn find_or_create_role(&mut self, draft: RoleDraft) -> ExResult<Role> {
        match self.find_role_by_name_and_snapshot(&draft.name, &draft.snapshot_id)? {
            Some(role) => Ok(role),
            None => self.create_role(draft),
        }
    }

    fn list_roles(&self, snapshot_id: &str) -> ExResult<Vec<Role>>;

    /// Copy a role with its attribs into another snapshot
    ///
    /// See [`Role::clone_into`] for what `with_nodes` keeps.
    fn clone_role(
        &mut self,
        role_id: &str,
        target_snapshot_id: &str,
        with_nodes: bool,
    ) -> ExResult<Role>;

    fn bind_node(&mut self, role_id: &str, node_id: &str) -> ExResult<()>;

    fn add_attrib(
        &mut self,
        role_id: &str,
        attrib_type: &AttribType,
        node_id: Option<&str>,
        label: &str,
    ) -> ExResult<Attrib>;

    // ===== History =====

    fn record_jig_event(&mut self, event: &JigEvent) -> ExResult<()>;

    /// Persist a status change together with the jig event describing it
    ///
    /// The default saves the snapshot and then records the event as two
    /// writes: if recording fails, the status change stays without its
    /// history entry. Stores with transactions override this to commit both
    /// or neither.
    fn record_transition(&mut self, snapshot: &Snapshot, event: &JigEvent) -> ExResult<()> {
        self.save_snapshot(snapshot)?;
        self.record_jig_event(event)
    }

    /// Events of a snapshot, oldest first
    fn list_jig_events(&self, snapshot_id: &str) -> ExResult<Vec<JigEvent>>;
}

/// True for the error a store returns when a unique key is already taken
pub fn is_uniqueness_conflict(err: &crate::errors::ExError) -> bool {
    err.kind() == ExErrorKind::ConstraintViolation
}
