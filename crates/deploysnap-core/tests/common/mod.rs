use deploysnap_core::errors::{ExError, ExErrorKind, ExResult};
use deploysnap_core::model::{
    Attrib, AttribType, Deployment, JigEvent, Role, RoleDraft, Snapshot,
};
use deploysnap_core::ops::lifecycle::{create_snapshot, NewSnapshot};
use deploysnap_core::{MemoryStore, SnapshotStore};
use uuid::Uuid;

/// Create a new empty store for testing
#[allow(dead_code)]
pub fn new_store() -> MemoryStore {
    MemoryStore::new()
}

/// Insert a deployment with a fresh id and return it
#[allow(dead_code)]
pub fn create_test_deployment(store: &mut impl SnapshotStore, name: &str) -> Deployment {
    let deployment = Deployment::new(Uuid::now_v7().to_string(), name.to_string());
    store.insert_deployment(&deployment).unwrap();
    deployment
}

/// Create a snapshot through the lifecycle operation
#[allow(dead_code)]
pub fn create_test_snapshot(
    store: &mut impl SnapshotStore,
    name: &str,
    deployment_id: Option<&str>,
    element_order: Option<&str>,
) -> Snapshot {
    let snapshot = create_snapshot(
        store,
        NewSnapshot {
            name: name.to_string(),
            deployment_id: deployment_id.map(str::to_string),
            ..Default::default()
        },
    )
    .unwrap();

    match element_order {
        Some(raw) => {
            let mut snapshot = snapshot;
            snapshot.element_order = Some(raw.to_string());
            store.save_snapshot(&snapshot).unwrap();
            snapshot
        }
        None => snapshot,
    }
}

/// Role names per group, for compact assertions
#[allow(dead_code)]
pub fn group_names(groups: &[Vec<Role>]) -> Vec<Vec<String>> {
    groups
        .iter()
        .map(|g| g.iter().map(|r| r.name.clone()).collect())
        .collect()
}

/// Store wrapper that injects failures into selected calls
///
/// `race_on_create` makes the next `find_or_create_role` create the role
/// behind the caller's back and then report a `ConstraintViolation`, the way
/// a store sees a concurrent creator. `fail_clone_after` lets that many
/// `clone_role` calls succeed and fails the rest. `fail_jig_events` fails
/// every `record_jig_event`.
#[allow(dead_code)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    pub race_on_create: bool,
    pub fail_clone_after: Option<usize>,
    pub fail_jig_events: bool,
    clones: usize,
}

#[allow(dead_code)]
impl FaultyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            race_on_create: false,
            fail_clone_after: None,
            fail_jig_events: false,
            clones: 0,
        }
    }
}

impl SnapshotStore for FaultyStore {
    fn get_snapshot(&self, id: &str) -> ExResult<Snapshot> {
        self.inner.get_snapshot(id)
    }

    fn list_snapshots(&self, deployment_id: Option<&str>) -> ExResult<Vec<Snapshot>> {
        self.inner.list_snapshots(deployment_id)
    }

    fn insert_snapshot(&mut self, snapshot: &Snapshot) -> ExResult<()> {
        self.inner.insert_snapshot(snapshot)
    }

    fn save_snapshot(&mut self, snapshot: &Snapshot) -> ExResult<()> {
        self.inner.save_snapshot(snapshot)
    }

    fn destroy_snapshot(&mut self, id: &str) -> ExResult<usize> {
        self.inner.destroy_snapshot(id)
    }

    fn get_deployment(&self, id: &str) -> ExResult<Deployment> {
        self.inner.get_deployment(id)
    }

    fn insert_deployment(&mut self, deployment: &Deployment) -> ExResult<()> {
        self.inner.insert_deployment(deployment)
    }

    fn save_deployment(&mut self, deployment: &Deployment) -> ExResult<()> {
        self.inner.save_deployment(deployment)
    }

    fn get_role(&self, role_id: &str) -> ExResult<Role> {
        self.inner.get_role(role_id)
    }

    fn find_role_by_name_and_snapshot(
        &self,
        name: &str,
        snapshot_id: &str,
    ) -> ExResult<Option<Role>> {
        self.inner.find_role_by_name_and_snapshot(name, snapshot_id)
    }

    fn create_role(&mut self, draft: RoleDraft) -> ExResult<Role> {
        self.inner.create_role(draft)
    }

    fn find_or_create_role(&mut self, draft: RoleDraft) -> ExResult<Role> {
        if self.race_on_create {
            self.race_on_create = false;
            self.inner.create_role(draft)?;
            return Err(ExError::new(ExErrorKind::ConstraintViolation)
                .with_message("Role created by another writer"));
        }
        self.inner.find_or_create_role(draft)
    }

    fn list_roles(&self, snapshot_id: &str) -> ExResult<Vec<Role>> {
        self.inner.list_roles(snapshot_id)
    }

    fn clone_role(
        &mut self,
        role_id: &str,
        target_snapshot_id: &str,
        with_nodes: bool,
    ) -> ExResult<Role> {
        if let Some(limit) = self.fail_clone_after {
            if self.clones >= limit {
                return Err(ExError::new(ExErrorKind::Persistence)
                    .with_entity_id(role_id)
                    .with_message("Injected clone failure"));
            }
        }
        self.clones += 1;
        self.inner.clone_role(role_id, target_snapshot_id, with_nodes)
    }

    fn bind_node(&mut self, role_id: &str, node_id: &str) -> ExResult<()> {
        self.inner.bind_node(role_id, node_id)
    }

    fn add_attrib(
        &mut self,
        role_id: &str,
        attrib_type: &AttribType,
        node_id: Option<&str>,
        label: &str,
    ) -> ExResult<Attrib> {
        self.inner.add_attrib(role_id, attrib_type, node_id, label)
    }

    fn record_jig_event(&mut self, event: &JigEvent) -> ExResult<()> {
        if self.fail_jig_events {
            return Err(ExError::new(ExErrorKind::Persistence)
                .with_entity_id(event.id.clone())
                .with_message("History unavailable"));
        }
        self.inner.record_jig_event(event)
    }

    fn list_jig_events(&self, snapshot_id: &str) -> ExResult<Vec<JigEvent>> {
        self.inner.list_jig_events(snapshot_id)
    }
}
