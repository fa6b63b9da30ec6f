//! SQLite-backed snapshot store
//!
//! One connection, one writer. Multi-row writes (role copies, snapshot
//! destruction, a status change with its jig event) run in a transaction so
//! a failure leaves no partial rows.

#![allow(clippy::result_large_err)]

use std::path::Path;

use deploysnap_core::errors::{DeploySnapError, ExError, ExErrorKind, ExResult};
use deploysnap_core::model::{Attrib, AttribType, Deployment, JigEvent, Role, RoleDraft, Snapshot};
use deploysnap_core::SnapshotStore;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use uuid::Uuid;

use super::rows::{
    encode_time, DeploymentRow, JigEventRow, SnapshotRow, DEPLOYMENT_COLUMNS, ROLE_COLUMNS,
    SNAPSHOT_COLUMNS,
};
use crate::db;
use crate::errors::{from_rusqlite, Result};
use crate::migrations::apply_migrations;

fn new_id() -> String {
    Uuid::now_v7().to_string()
}

fn role_not_found(role_id: &str) -> ExError {
    ExError::new(ExErrorKind::NotFound)
        .with_entity_id(role_id)
        .with_message("Role not found")
}

/// [`SnapshotStore`] over a SQLite database
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and bring its schema up to date
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_connection(db::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(db::open_in_memory()?)
    }

    /// Configure `conn` and apply pending migrations
    pub fn from_connection(mut conn: Connection) -> Result<Self> {
        db::configure(&conn)?;
        apply_migrations(&mut conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn snapshot_exists(&self, id: &str) -> Result<bool> {
        exists(&self.conn, "SELECT 1 FROM snapshots WHERE id = ?1", id)
    }

    fn role_exists(&self, id: &str) -> Result<bool> {
        exists(&self.conn, "SELECT 1 FROM roles WHERE id = ?1", id)
    }

    /// Scalar checks shared by insert and save
    fn check_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        snapshot.validate()?;

        let Some(deployment_id) = snapshot.deployment_id.as_deref() else {
            return Ok(());
        };
        if !exists(&self.conn, "SELECT 1 FROM deployments WHERE id = ?1", deployment_id)? {
            return Err(DeploySnapError::DeploymentNotFound {
                deployment_id: deployment_id.to_string(),
            }
            .into());
        }

        let taken: bool = self
            .conn
            .query_row(
                "SELECT 1 FROM snapshots WHERE deployment_id = ?1 AND name = ?2 AND id != ?3",
                params![deployment_id, snapshot.name, snapshot.id],
                |_| Ok(true),
            )
            .optional()
            .map_err(from_rusqlite)?
            .unwrap_or(false);
        if taken {
            return Err(DeploySnapError::DuplicateSnapshotName {
                name: snapshot.name.clone(),
                deployment_id: deployment_id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Attach node bindings and attribs to a bare role row
    fn load_role_children(&self, role: &mut Role) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare("SELECT node_id FROM role_nodes WHERE role_id = ?1 ORDER BY rowid")
            .map_err(from_rusqlite)?;
        role.node_ids = stmt
            .query_map([&role.id], |row| row.get(0))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<String>, _>>()
            .map_err(from_rusqlite)?;

        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, role_id, attrib_type, node_id, label FROM attribs
                 WHERE role_id = ?1 ORDER BY seq",
            )
            .map_err(from_rusqlite)?;
        role.attribs = stmt
            .query_map([&role.id], |row| {
                Ok(Attrib {
                    id: row.get(0)?,
                    role_id: row.get(1)?,
                    attrib_type: row.get(2)?,
                    node_id: row.get(3)?,
                    label: row.get(4)?,
                })
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(())
    }

    fn query_roles(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Role>> {
        let mut stmt = self.conn.prepare(sql).map_err(from_rusqlite)?;
        let raw = stmt
            .query_map(params, role_from_row)
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;

        let mut roles = Vec::with_capacity(raw.len());
        for (created_at, mut role) in raw {
            role.created_at = super::rows::decode_time("roles", &role.id, &created_at)?;
            self.load_role_children(&mut role)?;
            roles.push(role);
        }
        Ok(roles)
    }
}

fn exists(conn: &Connection, sql: &str, id: &str) -> Result<bool> {
    Ok(conn
        .query_row(sql, [id], |_| Ok(true))
        .optional()
        .map_err(from_rusqlite)?
        .unwrap_or(false))
}

/// Role without children; `created_at` comes back raw for checked decoding
fn role_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, Role)> {
    let created_at: String = row.get(6)?;
    let role = RoleDraft {
        name: row.get(2)?,
        snapshot_id: row.get(1)?,
        description: row.get(3)?,
        order: row.get(4)?,
        run_order: row.get(5)?,
    }
    .into_role(row.get(0)?);
    Ok((created_at, role))
}

fn update_snapshot(conn: &Connection, snapshot: &Snapshot) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE snapshots SET name = ?2, description = ?3, sort_order = ?4,
                 element_order = ?5, status = ?6, failed_reason = ?7, deployment_id = ?8,
                 barclamp_id = ?9, updated_at = ?10
             WHERE id = ?1",
            params![
                snapshot.id,
                snapshot.name,
                snapshot.description,
                snapshot.order,
                snapshot.element_order,
                snapshot.status().ordinal(),
                snapshot.failed_reason(),
                snapshot.deployment_id,
                snapshot.barclamp_id,
                encode_time(&snapshot.updated_at),
            ],
        )
        .map_err(from_rusqlite)?;
    if updated == 0 {
        return Err(DeploySnapError::SnapshotNotFound {
            snapshot_id: snapshot.id.clone(),
        }
        .into());
    }
    Ok(())
}

fn insert_jig_event(conn: &Connection, event: &JigEvent) -> Result<()> {
    conn.execute(
        "INSERT INTO jig_events (id, snapshot_id, status, message, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            event.id,
            event.snapshot_id,
            event.status.ordinal(),
            event.message,
            encode_time(&event.created_at),
        ],
    )
    .map_err(from_rusqlite)?;
    Ok(())
}

/// Insert a complete role (row, node bindings, attribs) inside `tx`
fn insert_role_tx(tx: &Transaction<'_>, role: &Role) -> Result<()> {
    tx.execute(
        "INSERT INTO roles (id, snapshot_id, name, description, sort_order, run_order, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            role.id,
            role.snapshot_id,
            role.name,
            role.description,
            role.order,
            role.run_order,
            encode_time(&role.created_at),
        ],
    )
    .map_err(from_rusqlite)?;

    for node_id in &role.node_ids {
        tx.execute(
            "INSERT INTO role_nodes (role_id, node_id) VALUES (?1, ?2)",
            params![role.id, node_id],
        )
        .map_err(from_rusqlite)?;
    }

    for attrib in &role.attribs {
        tx.execute(
            "INSERT INTO attribs (id, role_id, attrib_type, node_id, label)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                attrib.id,
                attrib.role_id,
                attrib.attrib_type,
                attrib.node_id,
                attrib.label
            ],
        )
        .map_err(from_rusqlite)?;
    }
    Ok(())
}

impl SnapshotStore for SqliteStore {
    fn get_snapshot(&self, id: &str) -> ExResult<Snapshot> {
        let sql = format!("SELECT {} FROM snapshots WHERE id = ?1", SNAPSHOT_COLUMNS);
        self.conn
            .query_row(&sql, [id], SnapshotRow::from_row)
            .optional()
            .map_err(from_rusqlite)?
            .ok_or_else(|| {
                ExError::from(DeploySnapError::SnapshotNotFound {
                    snapshot_id: id.to_string(),
                })
            })?
            .into_snapshot()
    }

    fn list_snapshots(&self, deployment_id: Option<&str>) -> ExResult<Vec<Snapshot>> {
        let sql = format!(
            "SELECT {} FROM snapshots
             WHERE ?1 IS NULL OR deployment_id = ?1
             ORDER BY sort_order, id",
            SNAPSHOT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql).map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([deployment_id], SnapshotRow::from_row)
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        rows.into_iter().map(SnapshotRow::into_snapshot).collect()
    }

    fn insert_snapshot(&mut self, snapshot: &Snapshot) -> ExResult<()> {
        self.check_snapshot(snapshot)?;
        self.conn
            .execute(
                "INSERT INTO snapshots (id, name, description, sort_order, element_order, status,
                     failed_reason, deployment_id, barclamp_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    snapshot.id,
                    snapshot.name,
                    snapshot.description,
                    snapshot.order,
                    snapshot.element_order,
                    snapshot.status().ordinal(),
                    snapshot.failed_reason(),
                    snapshot.deployment_id,
                    snapshot.barclamp_id,
                    encode_time(&snapshot.created_at),
                    encode_time(&snapshot.updated_at),
                ],
            )
            .map_err(|e| from_rusqlite(e).with_snapshot_id(snapshot.id.clone()))?;
        Ok(())
    }

    fn save_snapshot(&mut self, snapshot: &Snapshot) -> ExResult<()> {
        self.check_snapshot(snapshot)?;
        update_snapshot(&self.conn, snapshot)
    }

    fn record_transition(&mut self, snapshot: &Snapshot, event: &JigEvent) -> ExResult<()> {
        self.check_snapshot(snapshot)?;
        let tx = self.conn.transaction().map_err(from_rusqlite)?;
        update_snapshot(&tx, snapshot)?;
        insert_jig_event(&tx, event)?;
        tx.commit().map_err(from_rusqlite)?;
        Ok(())
    }

    fn destroy_snapshot(&mut self, id: &str) -> ExResult<usize> {
        if !self.snapshot_exists(id)? {
            return Err(DeploySnapError::SnapshotNotFound {
                snapshot_id: id.to_string(),
            }
            .into());
        }

        let tx = self.conn.transaction().map_err(from_rusqlite)?;
        tx.execute(
            "DELETE FROM attribs WHERE role_id IN (SELECT id FROM roles WHERE snapshot_id = ?1)",
            [id],
        )
        .map_err(from_rusqlite)?;
        tx.execute(
            "DELETE FROM role_nodes WHERE role_id IN (SELECT id FROM roles WHERE snapshot_id = ?1)",
            [id],
        )
        .map_err(from_rusqlite)?;
        let removed = tx
            .execute("DELETE FROM roles WHERE snapshot_id = ?1", [id])
            .map_err(from_rusqlite)?;
        tx.execute(
            "UPDATE jig_events SET snapshot_id = NULL WHERE snapshot_id = ?1",
            [id],
        )
        .map_err(from_rusqlite)?;
        for column in ["active_snapshot_id", "committed_snapshot_id", "proposed_snapshot_id"] {
            tx.execute(
                &format!(
                    "UPDATE deployments SET {col} = NULL WHERE {col} = ?1",
                    col = column
                ),
                [id],
            )
            .map_err(from_rusqlite)?;
        }
        tx.execute("DELETE FROM snapshots WHERE id = ?1", [id])
            .map_err(from_rusqlite)?;
        tx.commit().map_err(from_rusqlite)?;

        tracing::debug!(snapshot_id = id, role_count = removed, "Destroyed snapshot");
        Ok(removed)
    }

    fn get_deployment(&self, id: &str) -> ExResult<Deployment> {
        let sql = format!("SELECT {} FROM deployments WHERE id = ?1", DEPLOYMENT_COLUMNS);
        self.conn
            .query_row(&sql, [id], DeploymentRow::from_row)
            .optional()
            .map_err(from_rusqlite)?
            .ok_or_else(|| {
                ExError::from(DeploySnapError::DeploymentNotFound {
                    deployment_id: id.to_string(),
                })
            })?
            .into_deployment()
    }

    fn insert_deployment(&mut self, deployment: &Deployment) -> ExResult<()> {
        self.conn
            .execute(
                "INSERT INTO deployments (id, name, active_snapshot_id, committed_snapshot_id,
                     proposed_snapshot_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    deployment.id,
                    deployment.name,
                    deployment.active_snapshot_id,
                    deployment.committed_snapshot_id,
                    deployment.proposed_snapshot_id,
                    encode_time(&deployment.created_at),
                    encode_time(&deployment.updated_at),
                ],
            )
            .map_err(|e| from_rusqlite(e).with_entity_id(deployment.id.clone()))?;
        Ok(())
    }

    fn save_deployment(&mut self, deployment: &Deployment) -> ExResult<()> {
        let updated = self
            .conn
            .execute(
                "UPDATE deployments SET name = ?2, active_snapshot_id = ?3,
                     committed_snapshot_id = ?4, proposed_snapshot_id = ?5, updated_at = ?6
                 WHERE id = ?1",
                params![
                    deployment.id,
                    deployment.name,
                    deployment.active_snapshot_id,
                    deployment.committed_snapshot_id,
                    deployment.proposed_snapshot_id,
                    encode_time(&deployment.updated_at),
                ],
            )
            .map_err(|e| from_rusqlite(e).with_entity_id(deployment.id.clone()))?;
        if updated == 0 {
            return Err(DeploySnapError::DeploymentNotFound {
                deployment_id: deployment.id.clone(),
            }
            .into());
        }
        Ok(())
    }

    fn get_role(&self, role_id: &str) -> ExResult<Role> {
        let sql = format!("SELECT {} FROM roles WHERE id = ?1", ROLE_COLUMNS);
        self.query_roles(&sql, [role_id])?
            .pop()
            .ok_or_else(|| role_not_found(role_id))
    }

    fn find_role_by_name_and_snapshot(
        &self,
        name: &str,
        snapshot_id: &str,
    ) -> ExResult<Option<Role>> {
        let sql = format!(
            "SELECT {} FROM roles WHERE name = ?1 AND snapshot_id = ?2",
            ROLE_COLUMNS
        );
        Ok(self.query_roles(&sql, [name, snapshot_id])?.pop())
    }

    fn create_role(&mut self, draft: RoleDraft) -> ExResult<Role> {
        if !self.snapshot_exists(&draft.snapshot_id)? {
            return Err(DeploySnapError::SnapshotNotFound {
                snapshot_id: draft.snapshot_id,
            }
            .into());
        }
        let role = draft.into_role(new_id());
        let tx = self.conn.transaction().map_err(from_rusqlite)?;
        insert_role_tx(&tx, &role).map_err(|e| e.with_snapshot_id(role.snapshot_id.clone()))?;
        tx.commit().map_err(from_rusqlite)?;
        Ok(role)
    }

    fn list_roles(&self, snapshot_id: &str) -> ExResult<Vec<Role>> {
        let sql = format!(
            "SELECT {} FROM roles WHERE snapshot_id = ?1 ORDER BY sort_order, run_order, seq",
            ROLE_COLUMNS
        );
        self.query_roles(&sql, [snapshot_id])
    }

    fn clone_role(
        &mut self,
        role_id: &str,
        target_snapshot_id: &str,
        with_nodes: bool,
    ) -> ExResult<Role> {
        if !self.snapshot_exists(target_snapshot_id)? {
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
        let tx = self.conn.transaction().map_err(from_rusqlite)?;
        insert_role_tx(&tx, &copy)?;
        tx.commit().map_err(from_rusqlite)?;
        Ok(copy)
    }

    fn bind_node(&mut self, role_id: &str, node_id: &str) -> ExResult<()> {
        if !self.role_exists(role_id)? {
            return Err(role_not_found(role_id));
        }
        self.conn
            .execute(
                "INSERT OR IGNORE INTO role_nodes (role_id, node_id) VALUES (?1, ?2)",
                params![role_id, node_id],
            )
            .map_err(from_rusqlite)?;
        Ok(())
    }

    fn add_attrib(
        &mut self,
        role_id: &str,
        attrib_type: &AttribType,
        node_id: Option<&str>,
        label: &str,
    ) -> ExResult<Attrib> {
        if !self.role_exists(role_id)? {
            return Err(role_not_found(role_id));
        }
        let attrib = Attrib {
            id: new_id(),
            role_id: role_id.to_string(),
            attrib_type: attrib_type.name.clone(),
            node_id: node_id.map(str::to_string),
            label: label.to_string(),
        };
        self.conn
            .execute(
                "INSERT INTO attribs (id, role_id, attrib_type, node_id, label)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    attrib.id,
                    attrib.role_id,
                    attrib.attrib_type,
                    attrib.node_id,
                    attrib.label
                ],
            )
            .map_err(from_rusqlite)?;
        Ok(attrib)
    }

    fn record_jig_event(&mut self, event: &JigEvent) -> ExResult<()> {
        insert_jig_event(&self.conn, event)
    }

    fn list_jig_events(&self, snapshot_id: &str) -> ExResult<Vec<JigEvent>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, snapshot_id, status, message, created_at FROM jig_events
                 WHERE snapshot_id = ?1 ORDER BY seq",
            )
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([snapshot_id], JigEventRow::from_row)
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        rows.into_iter().map(JigEventRow::into_event).collect()
    }
}
