//! Snapshot commands
//!
//! Usage: deploysnap snapshot <COMMAND> ...
//!
//! Commands: create, list, show, queue, begin, apply, fail, order, clone,
//! destroy, history

use clap::{Args, Subcommand};
use deploysnap_core::model::{ElementOrder, Snapshot};
use deploysnap_core::ops::lifecycle::{self, NewSnapshot};
use deploysnap_core::ops::role_order::derive_role_order;
use deploysnap_core::{deep_clone, CloneOptions, SnapshotStore};
use deploysnap_store::SqliteStore;

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    #[command(subcommand)]
    pub command: SnapshotCommand,
}

#[derive(Debug, Subcommand)]
pub enum SnapshotCommand {
    /// Create a snapshot in CREATED status
    Create(CreateArgs),
    /// List snapshots, optionally of one deployment
    List(ListArgs),
    /// Show a snapshot, its predicates and roles
    Show(IdArgs),
    /// Request a commit (CREATED or FAILED -> QUEUED)
    Queue(IdArgs),
    /// Start commit processing (QUEUED -> COMMITTING)
    Begin(IdArgs),
    /// Record a successful commit (COMMITTING -> APPLIED)
    Apply(IdArgs),
    /// Record a failed commit (COMMITTING -> FAILED)
    Fail(FailArgs),
    /// Materialize the element order as roles and print the groups
    Order(IdArgs),
    /// Deep-clone a snapshot with its roles
    Clone(CloneArgs),
    /// Destroy a snapshot and its roles
    Destroy(IdArgs),
    /// Print the status history
    History(IdArgs),
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    pub name: String,

    #[arg(long)]
    pub deployment: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub barclamp: Option<String>,

    /// Element order as JSON, e.g. '[["a","b"],["c"]]'
    #[arg(long)]
    pub order: Option<String>,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long)]
    pub deployment: Option<String>,
}

#[derive(Debug, Args)]
pub struct IdArgs {
    pub id: String,
}

#[derive(Debug, Args)]
pub struct FailArgs {
    pub id: String,

    #[arg(long)]
    pub reason: String,
}

#[derive(Debug, Args)]
pub struct CloneArgs {
    pub id: String,

    /// Target deployment; omit to clone into a template
    #[arg(long)]
    pub deployment: Option<String>,

    /// Name of the clone (defaults to "<name>_<id>")
    #[arg(long)]
    pub name: Option<String>,

    /// Drop node bindings and node-bound attribs
    #[arg(long)]
    pub without_nodes: bool,
}

pub fn execute(
    args: SnapshotArgs,
    store: &mut SqliteStore,
) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        SnapshotCommand::Create(a) => execute_create(a, store),
        SnapshotCommand::List(a) => execute_list(a, store),
        SnapshotCommand::Show(a) => execute_show(a, store),
        SnapshotCommand::Queue(a) => {
            print_status(&lifecycle::queue_snapshot(store, &a.id)?);
            Ok(())
        }
        SnapshotCommand::Begin(a) => {
            print_status(&lifecycle::begin_commit(store, &a.id)?);
            Ok(())
        }
        SnapshotCommand::Apply(a) => {
            print_status(&lifecycle::mark_applied(store, &a.id)?);
            Ok(())
        }
        SnapshotCommand::Fail(a) => {
            print_status(&lifecycle::mark_failed(store, &a.id, &a.reason)?);
            Ok(())
        }
        SnapshotCommand::Order(a) => execute_order(a, store),
        SnapshotCommand::Clone(a) => execute_clone(a, store),
        SnapshotCommand::Destroy(a) => {
            let removed = lifecycle::destroy_snapshot(store, &a.id)?;
            println!("Snapshot destroyed:");
            println!("  snapshot_id: {}", a.id);
            println!("  roles_removed: {}", removed);
            Ok(())
        }
        SnapshotCommand::History(a) => execute_history(a, store),
    }
}

fn print_status(snapshot: &Snapshot) {
    println!("{} {}", snapshot.id, snapshot.status());
    if let Some(reason) = snapshot.failed_reason() {
        println!("  failed_reason: {}", reason);
    }
}

fn execute_create(
    args: CreateArgs,
    store: &mut SqliteStore,
) -> Result<(), Box<dyn std::error::Error>> {
    // Reject a malformed order up front rather than at derivation time
    let element_order = args
        .order
        .as_deref()
        .map(|raw| ElementOrder::parse(Some(raw)))
        .transpose()
        .map_err(|e| format!("Invalid --order: {}", e))?;

    let snapshot = lifecycle::create_snapshot(
        store,
        NewSnapshot {
            name: args.name,
            description: args.description,
            deployment_id: args.deployment,
            barclamp_id: args.barclamp,
            element_order,
        },
    )?;

    println!("Snapshot created:");
    println!("  snapshot_id: {}", snapshot.id);
    println!("  name: {}", snapshot.name);
    println!("  status: {}", snapshot.status());
    Ok(())
}

fn execute_list(args: ListArgs, store: &mut SqliteStore) -> Result<(), Box<dyn std::error::Error>> {
    for snapshot in store.list_snapshots(args.deployment.as_deref())? {
        println!(
            "{}\t{}\t{}\t{}",
            snapshot.id,
            snapshot.name,
            snapshot.status(),
            snapshot.deployment_id.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn execute_show(args: IdArgs, store: &mut SqliteStore) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = store.get_snapshot(&args.id)?;

    println!("snapshot_id: {}", snapshot.id);
    println!("name: {}", snapshot.name);
    println!("status: {}", snapshot.status());
    if let Some(reason) = snapshot.failed_reason() {
        println!("failed_reason: {}", reason);
    }
    println!(
        "deployment: {}",
        snapshot.deployment_id.as_deref().unwrap_or("-")
    );
    println!("active: {}", lifecycle::is_active(store, &snapshot)?);
    println!("committed: {}", lifecycle::is_committed(store, &snapshot)?);
    println!("proposed: {}", lifecycle::is_proposed(store, &snapshot)?);
    println!(
        "element_order: {}",
        snapshot.element_order.as_deref().unwrap_or("-")
    );

    let roles = store.list_roles(&snapshot.id)?;
    println!("roles: {}", roles.len());
    for role in roles {
        println!(
            "  {} (run_order {}, nodes {}, attribs {})",
            role.name,
            role.run_order,
            role.node_ids.len(),
            role.attribs.len()
        );
    }
    Ok(())
}

fn execute_order(args: IdArgs, store: &mut SqliteStore) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = store.get_snapshot(&args.id)?;
    let groups = derive_role_order(store, &snapshot)?;

    for (index, group) in groups.iter().enumerate() {
        let names: Vec<&str> = group.iter().map(|r| r.name.as_str()).collect();
        println!("group {}: {}", index, names.join(", "));
    }
    Ok(())
}

fn execute_clone(
    args: CloneArgs,
    store: &mut SqliteStore,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = CloneOptions {
        deployment_id: args.deployment,
        name: args.name,
        with_nodes: !args.without_nodes,
    };
    let clone = deep_clone(store, &args.id, options)?;

    println!("Snapshot cloned:");
    println!("  snapshot_id: {}", clone.id);
    println!("  name: {}", clone.name);
    println!("  roles: {}", store.list_roles(&clone.id)?.len());
    Ok(())
}

fn execute_history(
    args: IdArgs,
    store: &mut SqliteStore,
) -> Result<(), Box<dyn std::error::Error>> {
    store.get_snapshot(&args.id)?;
    for event in store.list_jig_events(&args.id)? {
        match event.message {
            Some(message) => println!("{} {} {}", event.created_at, event.status, message),
            None => println!("{} {}", event.created_at, event.status),
        }
    }
    Ok(())
}
