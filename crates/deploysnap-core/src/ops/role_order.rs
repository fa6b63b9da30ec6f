//! Role ordering engine
//!
//! Turns a snapshot's element order into materialized roles, and hosts the
//! role lookups built on the (name, snapshot) key: get-or-create, lookup by
//! arbitrary name, the private/public partitions and the default bucket used
//! when an attrib is attached without naming a role.

use super::instrumented;
use super::store::{is_uniqueness_conflict, SnapshotStore};
use crate::catalog::{format_description, MessageCatalog, ROLE_ADDED_KEY};
use crate::errors::{DeploySnapError, ExResult};
use crate::model::{
    Attrib, AttribType, Role, RoleDraft, Snapshot, PRIVATE_ROLE_NAME, PRIVATE_RUN_ORDER,
};

/// Get-or-create through the store, absorbing a lost creation race
///
/// A `ConstraintViolation` means another writer created the row between our
/// lookup and insert; the row it created is the answer.
fn find_or_create<S: SnapshotStore + ?Sized>(store: &mut S, draft: RoleDraft) -> ExResult<Role> {
    let name = draft.name.clone();
    let snapshot_id = draft.snapshot_id.clone();

    match store.find_or_create_role(draft) {
        Err(err) if is_uniqueness_conflict(&err) => {
            tracing::debug!(
                snapshot_id = %snapshot_id,
                role_name = %name,
                "Role created concurrently, re-reading"
            );
            store
                .find_role_by_name_and_snapshot(&name, &snapshot_id)?
                .ok_or_else(|| {
                    DeploySnapError::RoleNotFound {
                        role: name,
                        snapshot_id,
                    }
                    .into()
                })
        }
        other => other,
    }
}

/// Add a role to a snapshot, or return the one already there
///
/// Calling this twice with the same name yields the same role.
///
/// # Errors
///
/// `InvalidInput` for a blank name, `NotFound` for an unknown snapshot.
pub fn add_role<S: SnapshotStore + ?Sized>(
    store: &mut S,
    snapshot: &Snapshot,
    role_name: &str,
) -> ExResult<Role> {
    if role_name.trim().is_empty() {
        return Err(DeploySnapError::InvalidName {
            reason: "role name cannot be empty or whitespace-only".to_string(),
        }
        .into());
    }
    find_or_create(store, RoleDraft::new(role_name, &snapshot.id))
}

/// Look up a role of this snapshot by name
pub fn get_role_by_name<S: SnapshotStore + ?Sized>(
    store: &S,
    snapshot: &Snapshot,
    role_name: &str,
) -> ExResult<Option<Role>> {
    store.find_role_by_name_and_snapshot(role_name, &snapshot.id)
}

/// The snapshot's `"private"` bucket, created with a negative run order if absent
pub fn private_role<S: SnapshotStore + ?Sized>(
    store: &mut S,
    snapshot: &Snapshot,
) -> ExResult<Role> {
    find_or_create(
        store,
        RoleDraft::new(PRIVATE_ROLE_NAME, &snapshot.id).with_run_order(PRIVATE_RUN_ORDER),
    )
}

/// Roles with a non-negative run order, in role order
pub fn public_roles<S: SnapshotStore + ?Sized>(
    store: &S,
    snapshot: &Snapshot,
) -> ExResult<Vec<Role>> {
    Ok(store
        .list_roles(&snapshot.id)?
        .into_iter()
        .filter(Role::is_public)
        .collect())
}

/// Roles with a negative run order, in role order
pub fn private_roles<S: SnapshotStore + ?Sized>(
    store: &S,
    snapshot: &Snapshot,
) -> ExResult<Vec<Role>> {
    Ok(store
        .list_roles(&snapshot.id)?
        .into_iter()
        .filter(Role::is_private)
        .collect())
}

/// Materialize the snapshot's element order as groups of roles
///
/// Groups and in-group positions follow the descriptor. Missing roles are
/// created; existing ones are reused. An absent or empty descriptor yields
/// no groups and creates nothing.
///
/// # Errors
///
/// `Deserialization` when `element_order` is malformed as a whole; nothing is
/// created in that case. Bad entries inside a group are skipped.
pub fn derive_role_order<S: SnapshotStore + ?Sized>(
    store: &mut S,
    snapshot: &Snapshot,
) -> ExResult<Vec<Vec<Role>>> {
    instrumented("derive_role_order", &snapshot.id, || {
        let order = snapshot.element_order()?;

        let mut groups = Vec::with_capacity(order.groups().len());
        for names in order.groups() {
            let mut group = Vec::with_capacity(names.len());
            for name in names {
                group.push(add_role(store, snapshot, name)?);
            }
            groups.push(group);
        }

        tracing::debug!(
            snapshot_id = %snapshot.id,
            group_count = groups.len(),
            role_count = groups.iter().map(Vec::len).sum::<usize>(),
            "Derived role order"
        );
        Ok(groups)
    })
}

/// Pick the role an attrib lands on when the caller names none
///
/// First public role, else first private role, else the `"private"` bucket.
fn default_attrib_role<S: SnapshotStore + ?Sized>(
    store: &mut S,
    snapshot: &Snapshot,
) -> ExResult<Role> {
    let roles = store.list_roles(&snapshot.id)?;
    if let Some(role) = roles.iter().find(|r| r.is_public()) {
        return Ok(role.clone());
    }
    if let Some(role) = roles.iter().find(|r| r.is_private()) {
        return Ok(role.clone());
    }
    private_role(store, snapshot)
}

/// Attach an attrib of `attrib_type` to one of the snapshot's roles
///
/// With `role_name`, that role is used (and created, described through
/// `catalog`, if missing). Without it, see the default bucket rules. The
/// attrib carries no node binding and is labelled with the snapshot name.
///
/// # Errors
///
/// `NotFound` for an unknown snapshot, `InvalidInput` for a blank role name.
pub fn add_attrib<S: SnapshotStore + ?Sized>(
    store: &mut S,
    snapshot: &Snapshot,
    attrib_type: &AttribType,
    role_name: Option<&str>,
    catalog: &dyn MessageCatalog,
) -> ExResult<Attrib> {
    instrumented("add_attrib", &snapshot.id, || {
        let role = match role_name {
            None => default_attrib_role(store, snapshot)?,
            Some(name) if name.trim().is_empty() => {
                return Err(DeploySnapError::InvalidName {
                    reason: "role name cannot be empty or whitespace-only".to_string(),
                }
                .into())
            }
            Some(name) => {
                let description = format_description(catalog, ROLE_ADDED_KEY, &snapshot.name);
                find_or_create(
                    store,
                    RoleDraft::new(name, &snapshot.id).with_description(Some(description)),
                )?
            }
        };
        store.add_attrib(&role.id, attrib_type, None, &snapshot.name)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::errors::ExErrorKind;
    use crate::ops::MemoryStore;

    fn setup(element_order: Option<&str>) -> (MemoryStore, Snapshot) {
        let mut store = MemoryStore::new();
        let mut snapshot = Snapshot::new("s1".into(), "base".into());
        snapshot.element_order = element_order.map(str::to_string);
        store.insert_snapshot(&snapshot).unwrap();
        (store, snapshot)
    }

    fn names(groups: &[Vec<Role>]) -> Vec<Vec<&str>> {
        groups
            .iter()
            .map(|g| g.iter().map(|r| r.name.as_str()).collect())
            .collect()
    }

    #[test]
    fn test_derive_creates_roles_in_group_order() {
        let (mut store, snapshot) = setup(Some(r#"[["a","b"],["c"]]"#));
        let groups = derive_role_order(&mut store, &snapshot).unwrap();
        assert_eq!(names(&groups), vec![vec!["a", "b"], vec!["c"]]);
        assert_eq!(store.role_count(), 3);
    }

    #[test]
    fn test_derive_reuses_existing_roles() {
        let (mut store, snapshot) = setup(Some(r#"[["a"],["a","b"]]"#));
        let existing = add_role(&mut store, &snapshot, "a").unwrap();

        let groups = derive_role_order(&mut store, &snapshot).unwrap();
        assert_eq!(groups[0][0].id, existing.id);
        assert_eq!(groups[1][0].id, existing.id);
        assert_eq!(store.role_count(), 2);
    }

    #[test]
    fn test_derive_malformed_creates_nothing() {
        let (mut store, snapshot) = setup(Some(r#"[["a"], 7]"#));
        let err = derive_role_order(&mut store, &snapshot).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Deserialization);
        assert_eq!(store.role_count(), 0);
    }

    #[test]
    fn test_derive_skips_bad_entries_inside_group() {
        let (mut store, snapshot) = setup(Some(r#"[["a", false, "b"], [7, "c"]]"#));
        let groups = derive_role_order(&mut store, &snapshot).unwrap();
        assert_eq!(names(&groups), vec![vec!["a", "b"], vec!["c"]]);
        assert_eq!(store.role_count(), 3);
    }

    #[test]
    fn test_add_role_rejects_blank_name() {
        let (mut store, snapshot) = setup(None);
        let err = add_role(&mut store, &snapshot, " ").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    }

    #[test]
    fn test_private_role_is_private() {
        let (mut store, snapshot) = setup(None);
        let role = private_role(&mut store, &snapshot).unwrap();
        assert_eq!(role.name, PRIVATE_ROLE_NAME);
        assert!(role.is_private());
        assert_eq!(private_roles(&store, &snapshot).unwrap().len(), 1);
        assert!(public_roles(&store, &snapshot).unwrap().is_empty());
    }

    #[test]
    fn test_named_role_gets_catalog_description() {
        let (mut store, snapshot) = setup(None);
        let catalog = StaticCatalog::english();
        add_attrib(
            &mut store,
            &snapshot,
            &AttribType::new("port"),
            Some("web"),
            &catalog,
        )
        .unwrap();

        let role = get_role_by_name(&store, &snapshot, "web").unwrap().unwrap();
        assert_eq!(role.description.as_deref(), Some("Added to snapshot base"));
        assert_eq!(role.attribs.len(), 1);
        assert_eq!(role.attribs[0].label, "base");
        assert_eq!(role.attribs[0].node_id, None);
    }
}
