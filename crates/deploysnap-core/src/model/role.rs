use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the default attribute bucket
pub const PRIVATE_ROLE_NAME: &str = "private";

/// Run order given to the default attribute bucket when it is created
pub const PRIVATE_RUN_ORDER: i64 = -1;

/// Attribute-type definition, owned outside this crate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttribType {
    pub name: String,
    pub description: Option<String>,
}

impl AttribType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }
}

/// An attribute instance attached to a role, optionally bound to a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attrib {
    pub id: String,
    pub role_id: String,
    pub attrib_type: String,
    pub node_id: Option<String>,
    pub label: String,
}

/// A named unit of configuration belonging to exactly one snapshot
///
/// Negative `run_order` marks a private role, anything else is public.
/// Roles list by `(order, run_order)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub snapshot_id: String,
    pub name: String,
    pub description: Option<String>,
    pub order: i64,
    pub run_order: i64,
    /// Node bindings, in binding order
    pub node_ids: Vec<String>,
    pub attribs: Vec<Attrib>,
    pub created_at: DateTime<Utc>,
}

impl Role {
    pub fn is_private(&self) -> bool {
        self.run_order < 0
    }

    pub fn is_public(&self) -> bool {
        !self.is_private()
    }

    pub fn sort_key(&self) -> (i64, i64) {
        (self.order, self.run_order)
    }

    /// Bind a node; binding the same node twice is a no-op
    pub fn bind_node(&mut self, node_id: impl Into<String>) {
        let node_id = node_id.into();
        if !self.node_ids.contains(&node_id) {
            self.node_ids.push(node_id);
        }
    }

    /// Copy this role into `target_snapshot_id`
    ///
    /// `new_id` names the copy; attrib ids come from `next_id`. Without
    /// `with_nodes` the copy has no node bindings and attribs bound to a node
    /// are left behind.
    pub fn clone_into(
        &self,
        new_id: String,
        target_snapshot_id: &str,
        with_nodes: bool,
        mut next_id: impl FnMut() -> String,
    ) -> Role {
        let attribs = self
            .attribs
            .iter()
            .filter(|a| with_nodes || a.node_id.is_none())
            .map(|a| Attrib {
                id: next_id(),
                role_id: new_id.clone(),
                attrib_type: a.attrib_type.clone(),
                node_id: a.node_id.clone(),
                label: a.label.clone(),
            })
            .collect();

        Role {
            id: new_id,
            snapshot_id: target_snapshot_id.to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
            order: self.order,
            run_order: self.run_order,
            node_ids: if with_nodes {
                self.node_ids.clone()
            } else {
                Vec::new()
            },
            attribs,
            created_at: Utc::now(),
        }
    }
}

/// Fields for a role about to be created by a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDraft {
    pub name: String,
    pub snapshot_id: String,
    pub description: Option<String>,
    pub order: i64,
    pub run_order: i64,
}

impl RoleDraft {
    pub fn new(name: impl Into<String>, snapshot_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            snapshot_id: snapshot_id.into(),
            description: None,
            order: 0,
            run_order: 0,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }

    pub fn with_run_order(mut self, run_order: i64) -> Self {
        self.run_order = run_order;
        self
    }

    pub fn into_role(self, id: String) -> Role {
        Role {
            id,
            snapshot_id: self.snapshot_id,
            name: self.name,
            description: self.description,
            order: self.order,
            run_order: self.run_order,
            node_ids: Vec::new(),
            attribs: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// Sort roles the way stores list them: `(order, run_order)`, stable
pub fn sort_roles(roles: &mut [Role]) {
    roles.sort_by_key(Role::sort_key);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_role() -> Role {
        let mut role = RoleDraft::new("web", "s1")
            .with_run_order(3)
            .into_role("r1".into());
        role.bind_node("n1");
        role.attribs.push(Attrib {
            id: "a1".into(),
            role_id: "r1".into(),
            attrib_type: "port".into(),
            node_id: None,
            label: "snap".into(),
        });
        role.attribs.push(Attrib {
            id: "a2".into(),
            role_id: "r1".into(),
            attrib_type: "ip".into(),
            node_id: Some("n1".into()),
            label: "snap".into(),
        });
        role
    }

    #[test]
    fn test_private_public_split_on_sign() {
        let mut role = RoleDraft::new("x", "s1").into_role("r".into());
        assert!(role.is_public());
        role.run_order = PRIVATE_RUN_ORDER;
        assert!(role.is_private());
    }

    #[test]
    fn test_bind_node_is_idempotent() {
        let mut role = sample_role();
        role.bind_node("n1");
        role.bind_node("n2");
        assert_eq!(role.node_ids, vec!["n1".to_string(), "n2".to_string()]);
    }

    #[test]
    fn test_clone_into_with_nodes() {
        let role = sample_role();
        let mut n = 0;
        let copy = role.clone_into("r2".into(), "s2", true, || {
            n += 1;
            format!("new-{}", n)
        });

        assert_eq!(copy.snapshot_id, "s2");
        assert_eq!(copy.name, "web");
        assert_eq!(copy.run_order, 3);
        assert_eq!(copy.node_ids, vec!["n1".to_string()]);
        assert_eq!(copy.attribs.len(), 2);
        assert!(copy.attribs.iter().all(|a| a.role_id == "r2"));
        assert_eq!(copy.attribs[0].id, "new-1");
    }

    #[test]
    fn test_clone_into_without_nodes_drops_bindings() {
        let role = sample_role();
        let copy = role.clone_into("r2".into(), "s2", false, || "a".into());

        assert!(copy.node_ids.is_empty());
        assert_eq!(copy.attribs.len(), 1);
        assert_eq!(copy.attribs[0].attrib_type, "port");
        // source untouched
        assert_eq!(role.node_ids.len(), 1);
        assert_eq!(role.attribs.len(), 2);
    }

    #[test]
    fn test_sort_roles_by_order_then_run_order() {
        let mut roles = vec![
            RoleDraft::new("c", "s").with_order(1).into_role("3".into()),
            RoleDraft::new("b", "s").with_run_order(5).into_role("2".into()),
            RoleDraft::new("a", "s").with_run_order(-1).into_role("1".into()),
        ];
        sort_roles(&mut roles);
        let names: Vec<_> = roles.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }
}
