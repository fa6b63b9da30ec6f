use std::collections::HashMap;

use uuid::Uuid;

use super::store::SnapshotStore;
use crate::errors::{DeploySnapError, ExError, ExErrorKind, ExResult};
use crate::model::{
    sort_roles, Attrib, AttribType, Deployment, DeploymentSlot, JigEvent, Role, RoleDraft,
    Snapshot,
};

fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// In-memory store
///
/// HashMap-backed reference implementation of [`SnapshotStore`] for tests and
/// embedders that keep everything in process. Not thread-safe; wrap it in a
/// lock to share it.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshots: HashMap<String, Snapshot>,
    deployments: HashMap<String, Deployment>,
    /// Creation order, so equal sort keys list stably
    roles: Vec<Role>,
    jig_events: Vec<JigEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of role rows, across all snapshots
    pub fn role_count(&self) -> usize {
        self.roles.len()
    }

    /// Total number of attrib rows, across all roles
    pub fn attrib_count(&self) -> usize {
        self.roles.iter().map(|r| r.attribs.len()).sum()
    }

    fn role_mut(&mut self, role_id: &str) -> ExResult<&mut Role> {
        self.roles
            .iter_mut()
            .find(|r| r.id == role_id)
            .ok_or_else(|| role_not_found(role_id))
    }

    fn check_name_free(&self, snapshot: &Snapshot) -> ExResult<()> {
        let Some(deployment_id) = snapshot.deployment_id.as_deref() else {
            return Ok(());
        };
        let taken = self.snapshots.values().any(|s| {
            s.id != snapshot.id
                && s.deployment_id.as_deref() == Some(deployment_id)
                && s.name == snapshot.name
        });
        if taken {
            return Err(DeploySnapError::DuplicateSnapshotName {
                name: snapshot.name.clone(),
                deployment_id: deployment_id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn check_deployment_exists(&self, snapshot: &Snapshot) -> ExResult<()> {
        match snapshot.deployment_id.as_deref() {
            Some(id) if !self.deployments.contains_key(id) => {
                Err(DeploySnapError::DeploymentNotFound {
                    deployment_id: id.to_string(),
                }
                .into())
            }
            _ => Ok(()),
        }
    }
}

fn role_not_found(role_id: &str) -> ExError {
    ExError::new(ExErrorKind::NotFound)
        .with_entity_id(role_id)
        .with_message("Role not found")
}

impl SnapshotStore for MemoryStore {
    fn get_snapshot(&self, id: &str) -> ExResult<Snapshot> {
        self.snapshots.get(id).cloned().ok_or_else(|| {
            DeploySnapError::SnapshotNotFound {
                snapshot_id: id.to_string(),
            }
            .into()
        })
    }

    fn list_snapshots(&self, deployment_id: Option<&str>) -> ExResult<Vec<Snapshot>> {
        let mut snapshots: Vec<Snapshot> = self
            .snapshots
            .values()
            .filter(|s| deployment_id.is_none() || s.deployment_id.as_deref() == deployment_id)
            .cloned()
            .collect();
        snapshots.sort_by(|a, b| (a.order, &a.id).cmp(&(b.order, &b.id)));
        Ok(snapshots)
    }

    fn insert_snapshot(&mut self, snapshot: &Snapshot) -> ExResult<()> {
        snapshot.validate()?;
        if self.snapshots.contains_key(&snapshot.id) {
            return Err(ExError::new(ExErrorKind::ConstraintViolation)
                .with_op("insert_snapshot")
                .with_snapshot_id(snapshot.id.clone())
                .with_message("Snapshot id already exists"));
        }
        self.check_deployment_exists(snapshot)?;
        self.check_name_free(snapshot)?;
        self.snapshots.insert(snapshot.id.clone(), snapshot.clone());
        Ok(())
    }

    fn save_snapshot(&mut self, snapshot: &Snapshot) -> ExResult<()> {
        snapshot.validate()?;
        if !self.snapshots.contains_key(&snapshot.id) {
            return Err(DeploySnapError::SnapshotNotFound {
                snapshot_id: snapshot.id.clone(),
            }
            .into());
        }
        self.check_deployment_exists(snapshot)?;
        self.check_name_free(snapshot)?;
        self.snapshots.insert(snapshot.id.clone(), snapshot.clone());
        Ok(())
    }

    fn destroy_snapshot(&mut self, id: &str) -> ExResult<usize> {
        if self.snapshots.remove(id).is_none() {
            return Err(DeploySnapError::SnapshotNotFound {
                snapshot_id: id.to_string(),
            }
            .into());
        }
        let before = self.roles.len();
        self.roles.retain(|r| r.snapshot_id != id);
        for event in &mut self.jig_events {
            if event.snapshot_id.as_deref() == Some(id) {
                event.snapshot_id = None;
            }
        }
        for deployment in self.deployments.values_mut() {
            for slot in DeploymentSlot::ALL {
                if deployment.slot(slot) == Some(id) {
                    deployment.point(slot, None);
                }
            }
        }
        Ok(before - self.roles.len())
    }

    fn get_deployment(&self, id: &str) -> ExResult<Deployment> {
        self.deployments.get(id).cloned().ok_or_else(|| {
            DeploySnapError::DeploymentNotFound {
                deployment_id: id.to_string(),
            }
            .into()
        })
    }

    fn insert_deployment(&mut self, deployment: &Deployment) -> ExResult<()> {
        if self.deployments.contains_key(&deployment.id) {
            return Err(ExError::new(ExErrorKind::ConstraintViolation)
                .with_op("insert_deployment")
                .with_entity_id(deployment.id.clone())
                .with_message("Deployment id already exists"));
        }
        self.deployments
            .insert(deployment.id.clone(), deployment.clone());
        Ok(())
    }

    fn save_deployment(&mut self, deployment: &Deployment) -> ExResult<()> {
        match self.deployments.get_mut(&deployment.id) {
            Some(existing) => {
                *existing = deployment.clone();
                Ok(())
            }
            None => Err(DeploySnapError::DeploymentNotFound {
                deployment_id: deployment.id.clone(),
            }
            .into()),
        }
    }

    fn get_role(&self, role_id: &str) -> ExResult<Role> {
        self.roles
            .iter()
            .find(|r| r.id == role_id)
            .cloned()
            .ok_or_else(|| role_not_found(role_id))
    }

    fn find_role_by_name_and_snapshot(
        &self,
        name: &str,
        snapshot_id: &str,
    ) -> ExResult<Option<Role>> {
        Ok(self
            .roles
            .iter()
            .find(|r| r.name == name && r.snapshot_id == snapshot_id)
            .cloned())
    }

    fn create_role(&mut self, draft: RoleDraft) -> ExResult<Role> {
        if !self.snapshots.contains_key(&draft.snapshot_id) {
            return Err(DeploySnapError::SnapshotNotFound {
                snapshot_id: draft.snapshot_id,
            }
            .into());
        }
        if self
            .roles
            .iter()
            .any(|r| r.name == draft.name && r.snapshot_id == draft.snapshot_id)
        {
            return Err(DeploySnapError::DuplicateRole {
                name: draft.name,
                snapshot_id: draft.snapshot_id,
            }
            .into());
        }
        let role = draft.into_role(new_id());
        self.roles.push(role.clone());
        Ok(role)
    }

    fn list_roles(&self, snapshot_id: &str) -> ExResult<Vec<Role>> {
        let mut roles: Vec<Role> = self
            .roles
            .iter()
            .filter(|r| r.snapshot_id == snapshot_id)
            .cloned()
            .collect();
        sort_roles(&mut roles);
        Ok(roles)
    }

    fn clone_role(
        &mut self,
        role_id: &str,
        target_snapshot_id: &str,
        with_nodes: bool,
    ) -> ExResult<Role> {
        if !self.snapshots.contains_key(target_snapshot_id) {
            return Err(DeploySnapError::SnapshotNotFound {
                snapshot_id: target_snapshot_id.to_string(),
            }
            .into());
        }
        let source = self.get_role(role_id)?;
        if self
            .find_role_by_name_and_snapshot(&source.name, target_snapshot_id)?
            .is_some()
        {
            return Err(DeploySnapError::DuplicateRole {
                name: source.name,
                snapshot_id: target_snapshot_id.to_string(),
            }
            .into());
        }
        let copy = source.clone_into(new_id(), target_snapshot_id, with_nodes, new_id);
        self.roles.push(copy.clone());
        Ok(copy)
    }

    fn bind_node(&mut self, role_id: &str, node_id: &str) -> ExResult<()> {
        self.role_mut(role_id)?.bind_node(node_id);
        Ok(())
    }

    fn add_attrib(
        &mut self,
        role_id: &str,
        attrib_type: &AttribType,
        node_id: Option<&str>,
        label: &str,
    ) -> ExResult<Attrib> {
        let role = self.role_mut(role_id)?;
        let attrib = Attrib {
            id: new_id(),
            role_id: role.id.clone(),
            attrib_type: attrib_type.name.clone(),
            node_id: node_id.map(str::to_string),
            label: label.to_string(),
        };
        role.attribs.push(attrib.clone());
        Ok(attrib)
    }

    fn record_jig_event(&mut self, event: &JigEvent) -> ExResult<()> {
        self.jig_events.push(event.clone());
        Ok(())
    }

    fn list_jig_events(&self, snapshot_id: &str) -> ExResult<Vec<JigEvent>> {
        Ok(self
            .jig_events
            .iter()
            .filter(|e| e.snapshot_id.as_deref() == Some(snapshot_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_snapshot() -> (MemoryStore, Snapshot) {
        let mut store = MemoryStore::new();
        let snapshot = Snapshot::new("s1".into(), "base".into());
        store.insert_snapshot(&snapshot).unwrap();
        (store, snapshot)
    }

    #[test]
    fn test_get_missing_snapshot_is_not_found() {
        let store = MemoryStore::new();
        let err = store.get_snapshot("nope").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::NotFound);
    }

    #[test]
    fn test_create_role_rejects_duplicate_name() {
        let (mut store, snapshot) = store_with_snapshot();
        store.create_role(RoleDraft::new("db", &snapshot.id)).unwrap();
        let err = store
            .create_role(RoleDraft::new("db", &snapshot.id))
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::ConstraintViolation);
        assert_eq!(store.role_count(), 1);
    }

    #[test]
    fn test_same_role_name_in_two_snapshots() {
        let (mut store, snapshot) = store_with_snapshot();
        let other = Snapshot::new("s2".into(), "other".into());
        store.insert_snapshot(&other).unwrap();

        let a = store.create_role(RoleDraft::new("db", &snapshot.id)).unwrap();
        let b = store.create_role(RoleDraft::new("db", &other.id)).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_snapshot_name_unique_per_deployment_only() {
        let mut store = MemoryStore::new();
        store
            .insert_deployment(&Deployment::new("d1".into(), "prod".into()))
            .unwrap();

        let mut first = Snapshot::new("s1".into(), "base".into());
        first.deployment_id = Some("d1".into());
        store.insert_snapshot(&first).unwrap();

        let mut clash = Snapshot::new("s2".into(), "base".into());
        clash.deployment_id = Some("d1".into());
        let err = store.insert_snapshot(&clash).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::ValidationFailure);

        // templates share names freely
        store
            .insert_snapshot(&Snapshot::new("t1".into(), "base".into()))
            .unwrap();
        store
            .insert_snapshot(&Snapshot::new("t2".into(), "base".into()))
            .unwrap();
    }

    #[test]
    fn test_insert_snapshot_with_unknown_deployment() {
        let mut store = MemoryStore::new();
        let mut snapshot = Snapshot::new("s1".into(), "base".into());
        snapshot.deployment_id = Some("ghost".into());
        let err = store.insert_snapshot(&snapshot).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::NotFound);
    }

    #[test]
    fn test_destroy_cascades_roles_and_keeps_history() {
        let (mut store, snapshot) = store_with_snapshot();
        let role = store.create_role(RoleDraft::new("db", &snapshot.id)).unwrap();
        store
            .add_attrib(&role.id, &AttribType::new("port"), None, "base")
            .unwrap();
        store
            .record_jig_event(&JigEvent::new(
                "e1".into(),
                &snapshot.id,
                snapshot.status(),
                None,
            ))
            .unwrap();

        assert_eq!(store.destroy_snapshot(&snapshot.id).unwrap(), 1);
        assert_eq!(store.role_count(), 0);
        assert_eq!(store.attrib_count(), 0);
        assert!(store.list_jig_events(&snapshot.id).unwrap().is_empty());
        assert_eq!(store.jig_events.len(), 1);
        assert!(store.jig_events[0].snapshot_id.is_none());
    }

    #[test]
    fn test_destroy_missing_snapshot() {
        let mut store = MemoryStore::new();
        let err = store.destroy_snapshot("nope").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::NotFound);
    }
}
