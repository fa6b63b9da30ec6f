//! Role commands
//!
//! Usage: deploysnap role <add|list|bind|attrib> <SNAPSHOT_ID> ...

use clap::{Args, Subcommand};
use deploysnap_core::catalog::StaticCatalog;
use deploysnap_core::model::AttribType;
use deploysnap_core::ops::role_order::{add_attrib, add_role, get_role_by_name};
use deploysnap_core::SnapshotStore;
use deploysnap_store::SqliteStore;

#[derive(Debug, Args)]
pub struct RoleArgs {
    #[command(subcommand)]
    pub command: RoleCommand,
}

#[derive(Debug, Subcommand)]
pub enum RoleCommand {
    /// Add a role to a snapshot (no-op if it exists)
    Add(AddArgs),
    /// List a snapshot's roles in role order
    List(ListArgs),
    /// Bind a node to a role
    Bind(BindArgs),
    /// Attach an attrib, to the named role or the default bucket
    Attrib(AttribArgs),
}

#[derive(Debug, Args)]
pub struct AddArgs {
    pub snapshot_id: String,
    pub name: String,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    pub snapshot_id: String,
}

#[derive(Debug, Args)]
pub struct BindArgs {
    pub snapshot_id: String,
    pub role: String,
    pub node_id: String,
}

#[derive(Debug, Args)]
pub struct AttribArgs {
    pub snapshot_id: String,
    pub attrib_type: String,

    /// Role to attach to; created if missing
    #[arg(long)]
    pub role: Option<String>,
}

pub fn execute(args: RoleArgs, store: &mut SqliteStore) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        RoleCommand::Add(a) => {
            let snapshot = store.get_snapshot(&a.snapshot_id)?;
            let role = add_role(store, &snapshot, &a.name)?;
            println!("{} {}", role.id, role.name);
            Ok(())
        }
        RoleCommand::List(a) => {
            store.get_snapshot(&a.snapshot_id)?;
            for role in store.list_roles(&a.snapshot_id)? {
                let kind = if role.is_private() { "private" } else { "public" };
                println!("{}\t{}\t{}\t{}", role.id, role.name, role.run_order, kind);
            }
            Ok(())
        }
        RoleCommand::Bind(a) => {
            let snapshot = store.get_snapshot(&a.snapshot_id)?;
            let role = get_role_by_name(store, &snapshot, &a.role)?
                .ok_or_else(|| format!("Role {} not found in snapshot {}", a.role, snapshot.id))?;
            store.bind_node(&role.id, &a.node_id)?;
            println!("{} <- {}", role.name, a.node_id);
            Ok(())
        }
        RoleCommand::Attrib(a) => {
            let snapshot = store.get_snapshot(&a.snapshot_id)?;
            let attrib = add_attrib(
                store,
                &snapshot,
                &AttribType::new(a.attrib_type),
                a.role.as_deref(),
                &StaticCatalog::english(),
            )?;
            let role = store.get_role(&attrib.role_id)?;
            println!("{} on {}", attrib.attrib_type, role.name);
            Ok(())
        }
    }
}
