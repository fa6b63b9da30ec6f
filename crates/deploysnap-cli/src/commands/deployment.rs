//! Deployment commands
//!
//! Usage: deploysnap deployment <create|show|point> ...

use clap::{Args, Subcommand, ValueEnum};
use deploysnap_core::model::{Deployment, DeploymentSlot};
use deploysnap_core::SnapshotStore;
use deploysnap_store::SqliteStore;

#[derive(Debug, Args)]
pub struct DeploymentArgs {
    #[command(subcommand)]
    pub command: DeploymentCommand,
}

#[derive(Debug, Subcommand)]
pub enum DeploymentCommand {
    /// Create a deployment
    Create(CreateArgs),
    /// Show a deployment and its slots
    Show(ShowArgs),
    /// Point a slot at a snapshot, or empty it
    Point(PointArgs),
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    pub name: String,

    /// Deployment id (defaults to the name)
    #[arg(long)]
    pub id: Option<String>,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    pub id: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SlotArg {
    Active,
    Committed,
    Proposed,
}

impl From<SlotArg> for DeploymentSlot {
    fn from(slot: SlotArg) -> Self {
        match slot {
            SlotArg::Active => DeploymentSlot::Active,
            SlotArg::Committed => DeploymentSlot::Committed,
            SlotArg::Proposed => DeploymentSlot::Proposed,
        }
    }
}

#[derive(Debug, Args)]
pub struct PointArgs {
    pub id: String,

    #[arg(value_enum)]
    pub slot: SlotArg,

    /// Snapshot to point at; omit to empty the slot
    pub snapshot_id: Option<String>,
}

pub fn execute(
    args: DeploymentArgs,
    store: &mut SqliteStore,
) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        DeploymentCommand::Create(a) => execute_create(a, store),
        DeploymentCommand::Show(a) => execute_show(a, store),
        DeploymentCommand::Point(a) => execute_point(a, store),
    }
}

fn execute_create(
    args: CreateArgs,
    store: &mut SqliteStore,
) -> Result<(), Box<dyn std::error::Error>> {
    if args.name.trim().is_empty() {
        return Err("Deployment name cannot be empty".into());
    }
    let id = args.id.unwrap_or_else(|| args.name.clone());
    let deployment = Deployment::new(id, args.name);
    store.insert_deployment(&deployment)?;

    println!("Deployment created:");
    println!("  deployment_id: {}", deployment.id);
    println!("  name: {}", deployment.name);
    Ok(())
}

fn execute_show(args: ShowArgs, store: &mut SqliteStore) -> Result<(), Box<dyn std::error::Error>> {
    let deployment = store.get_deployment(&args.id)?;
    println!("deployment_id: {}", deployment.id);
    println!("name: {}", deployment.name);
    for slot in DeploymentSlot::ALL {
        println!("{}: {}", slot.as_str(), deployment.slot(slot).unwrap_or("-"));
    }
    Ok(())
}

fn execute_point(
    args: PointArgs,
    store: &mut SqliteStore,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut deployment = store.get_deployment(&args.id)?;
    if let Some(snapshot_id) = args.snapshot_id.as_deref() {
        let snapshot = store.get_snapshot(snapshot_id)?;
        if snapshot.deployment_id.as_deref() != Some(deployment.id.as_str()) {
            return Err(format!(
                "Snapshot {} does not belong to deployment {}",
                snapshot_id, deployment.id
            )
            .into());
        }
    }

    let slot = DeploymentSlot::from(args.slot);
    deployment.point(slot, args.snapshot_id);
    store.save_deployment(&deployment)?;

    println!(
        "{} -> {}",
        slot.as_str(),
        deployment.slot(slot).unwrap_or("-")
    );
    Ok(())
}
