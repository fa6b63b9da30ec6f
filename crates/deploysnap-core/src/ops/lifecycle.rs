//! Store-backed snapshot lifecycle
//!
//! Each transition loads the snapshot, applies the state-machine step,
//! saves it and appends a jig event. No transition happens on its own: the
//! caller decides when to queue, start, finish or fail a commit, and is
//! responsible for serializing committers of the same snapshot.

use std::collections::BTreeSet;

use uuid::Uuid;

use super::instrumented;
use super::store::SnapshotStore;
use crate::errors::{DeploySnapError, ExResult};
use crate::model::{Attrib, Deployment, ElementOrder, JigEvent, Snapshot, SnapshotStatus};

/// Fields for a snapshot about to be created
#[derive(Debug, Clone, Default)]
pub struct NewSnapshot {
    pub name: String,
    pub description: Option<String>,
    pub deployment_id: Option<String>,
    pub barclamp_id: Option<String>,
    pub element_order: Option<ElementOrder>,
}

/// Create and persist a snapshot in `Created` status
///
/// # Errors
///
/// `ValidationFailure` for a blank or already-used name, `NotFound` for an
/// unknown deployment.
pub fn create_snapshot<S: SnapshotStore + ?Sized>(
    store: &mut S,
    new: NewSnapshot,
) -> ExResult<Snapshot> {
    let mut snapshot = Snapshot::new(Uuid::now_v7().to_string(), new.name);
    snapshot.description = new.description;
    snapshot.deployment_id = new.deployment_id;
    snapshot.barclamp_id = new.barclamp_id;
    if let Some(order) = &new.element_order {
        snapshot.set_element_order(order);
    }

    instrumented("create_snapshot", &snapshot.id, || {
        store.insert_snapshot(&snapshot)?;
        Ok(())
    })?;
    Ok(snapshot)
}

fn step<S, F>(store: &mut S, op: &'static str, snapshot_id: &str, apply: F) -> ExResult<Snapshot>
where
    S: SnapshotStore + ?Sized,
    F: FnOnce(&mut Snapshot) -> Result<SnapshotStatus, DeploySnapError>,
{
    instrumented(op, snapshot_id, || {
        let mut snapshot = store.get_snapshot(snapshot_id)?;
        let from = apply(&mut snapshot)?;

        let event = JigEvent::new(
            Uuid::now_v7().to_string(),
            &snapshot.id,
            snapshot.status(),
            snapshot.failed_reason().map(str::to_string),
        );
        store.record_transition(&snapshot, &event)?;

        tracing::debug!(
            snapshot_id = %snapshot.id,
            status_from = %from,
            status_to = %snapshot.status(),
            "Snapshot status changed"
        );
        Ok(snapshot)
    })
}

/// Request a commit, or retry a failed one
///
/// # Errors
///
/// `NotFound`, or `InvalidTransition` unless the snapshot is `Created` or `Failed`.
pub fn queue_snapshot<S: SnapshotStore + ?Sized>(
    store: &mut S,
    snapshot_id: &str,
) -> ExResult<Snapshot> {
    step(store, "queue_snapshot", snapshot_id, Snapshot::queue)
}

/// Mark commit processing as started
///
/// # Errors
///
/// `NotFound`, or `InvalidTransition` unless the snapshot is `Queued`.
pub fn begin_commit<S: SnapshotStore + ?Sized>(
    store: &mut S,
    snapshot_id: &str,
) -> ExResult<Snapshot> {
    step(store, "begin_commit", snapshot_id, Snapshot::begin_commit)
}

/// Record a successful commit
///
/// # Errors
///
/// `NotFound`, or `InvalidTransition` unless the snapshot is `Committing`.
pub fn mark_applied<S: SnapshotStore + ?Sized>(
    store: &mut S,
    snapshot_id: &str,
) -> ExResult<Snapshot> {
    step(store, "mark_applied", snapshot_id, Snapshot::mark_applied)
}

/// Record a failed commit and its cause
///
/// # Errors
///
/// `NotFound`, or `InvalidTransition` unless the snapshot is `Committing`.
pub fn mark_failed<S: SnapshotStore + ?Sized>(
    store: &mut S,
    snapshot_id: &str,
    reason: &str,
) -> ExResult<Snapshot> {
    step(store, "mark_failed", snapshot_id, |s| s.mark_failed(reason))
}

/// Delete a snapshot and every role it owns
///
/// Returns the number of roles removed.
///
/// # Errors
///
/// `NotFound` for an unknown snapshot.
pub fn destroy_snapshot<S: SnapshotStore + ?Sized>(
    store: &mut S,
    snapshot_id: &str,
) -> ExResult<usize> {
    instrumented("destroy_snapshot", snapshot_id, || {
        store.destroy_snapshot(snapshot_id)
    })
}

// ===== Derived predicates =====

fn owning_deployment<S: SnapshotStore + ?Sized>(
    store: &S,
    snapshot: &Snapshot,
) -> ExResult<Option<Deployment>> {
    snapshot
        .deployment_id
        .as_deref()
        .map(|id| store.get_deployment(id))
        .transpose()
}

/// Whether the snapshot's deployment points its active slot at it
///
/// Templates answer `false`.
///
/// # Errors
///
/// `NotFound` when the snapshot names a deployment that does not exist.
pub fn is_active<S: SnapshotStore + ?Sized>(store: &S, snapshot: &Snapshot) -> ExResult<bool> {
    Ok(snapshot.is_active(owning_deployment(store, snapshot)?.as_ref()))
}

/// # Errors
///
/// `NotFound` when the snapshot names a deployment that does not exist.
pub fn is_committed<S: SnapshotStore + ?Sized>(store: &S, snapshot: &Snapshot) -> ExResult<bool> {
    Ok(snapshot.is_committed(owning_deployment(store, snapshot)?.as_ref()))
}

/// # Errors
///
/// `NotFound` when the snapshot names a deployment that does not exist.
pub fn is_proposed<S: SnapshotStore + ?Sized>(store: &S, snapshot: &Snapshot) -> ExResult<bool> {
    Ok(snapshot.is_proposed(owning_deployment(store, snapshot)?.as_ref()))
}

// ===== Reach-through collections =====

/// Distinct node ids bound to any role of the snapshot, sorted
pub fn nodes<S: SnapshotStore + ?Sized>(store: &S, snapshot_id: &str) -> ExResult<Vec<String>> {
    let nodes: BTreeSet<String> = store
        .list_roles(snapshot_id)?
        .into_iter()
        .flat_map(|r| r.node_ids)
        .collect();
    Ok(nodes.into_iter().collect())
}

/// Every attrib of every role of the snapshot, in role order
pub fn attribs<S: SnapshotStore + ?Sized>(store: &S, snapshot_id: &str) -> ExResult<Vec<Attrib>> {
    Ok(store
        .list_roles(snapshot_id)?
        .into_iter()
        .flat_map(|r| r.attribs)
        .collect())
}

/// Distinct attribute-type names in use by the snapshot, sorted
pub fn attrib_types<S: SnapshotStore + ?Sized>(
    store: &S,
    snapshot_id: &str,
) -> ExResult<Vec<String>> {
    let types: BTreeSet<String> = attribs(store, snapshot_id)?
        .into_iter()
        .map(|a| a.attrib_type)
        .collect();
    Ok(types.into_iter().collect())
}
