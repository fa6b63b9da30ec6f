//! Snapshot deep clone
//!
//! Used to branch a template into a live deployment, to turn a live
//! snapshot back into a reusable template (usually without node bindings),
//! and to re-propose a configuration.

use chrono::Utc;
use uuid::Uuid;

use super::instrumented;
use super::store::SnapshotStore;
use crate::errors::ExResult;
use crate::model::Snapshot;

/// Options for [`deep_clone`]
#[derive(Debug, Clone)]
pub struct CloneOptions {
    /// Deployment the clone belongs to; `None` makes it a template
    pub deployment_id: Option<String>,
    /// Name of the clone; defaults to `"{name}_{id}"` of the source
    pub name: Option<String>,
    /// Carry node bindings (and node-bound attribs) over to the cloned roles
    pub with_nodes: bool,
}

impl Default for CloneOptions {
    fn default() -> Self {
        Self {
            deployment_id: None,
            name: None,
            with_nodes: true,
        }
    }
}

impl CloneOptions {
    pub fn into_deployment(mut self, deployment_id: impl Into<String>) -> Self {
        self.deployment_id = Some(deployment_id.into());
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn without_nodes(mut self) -> Self {
        self.with_nodes = false;
        self
    }
}

/// Copy a snapshot and every role it owns
///
/// The clone gets a fresh id, `Created` status and no failure reason. It is
/// inserted before any role is copied, so a failed insert leaves the store
/// untouched, while a failed role copy leaves the clone with the roles copied
/// so far. Wrap the call in a store transaction when that matters.
///
/// # Errors
///
/// `NotFound` for an unknown source snapshot or target deployment,
/// `ValidationFailure` when the clone cannot be inserted (e.g. the name is
/// already used in the target deployment), and any error from copying a role.
pub fn deep_clone<S: SnapshotStore + ?Sized>(
    store: &mut S,
    snapshot_id: &str,
    options: CloneOptions,
) -> ExResult<Snapshot> {
    instrumented("deep_clone", snapshot_id, || {
        let source = store.get_snapshot(snapshot_id)?;
        if let Some(deployment_id) = options.deployment_id.as_deref() {
            store.get_deployment(deployment_id)?;
        }

        let mut copy = source.clone();
        copy.id = Uuid::now_v7().to_string();
        copy.deployment_id = options.deployment_id;
        copy.name = options
            .name
            .unwrap_or_else(|| format!("{}_{}", source.name, source.id));
        copy.reset_lifecycle();
        let now = Utc::now();
        copy.created_at = now;
        copy.updated_at = now;

        store.insert_snapshot(&copy)?;

        let roles = store.list_roles(&source.id)?;
        for role in &roles {
            store.clone_role(&role.id, &copy.id, options.with_nodes)?;
        }

        tracing::debug!(
            snapshot_id = %source.id,
            clone_id = %copy.id,
            role_count = roles.len(),
            with_nodes = options.with_nodes,
            "Cloned snapshot"
        );
        Ok(copy)
    })
}
