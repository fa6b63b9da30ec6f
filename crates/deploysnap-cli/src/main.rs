//! deploysnap CLI
//!
//! Operator command line over a SQLite snapshot store

use clap::{Parser, Subcommand};
use deploysnap_core::logging_facility::{self, Profile};
use deploysnap_store::SqliteStore;
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "deploysnap")]
#[command(about = "deploysnap - Deployment configuration snapshots", long_about = None)]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "DEPLOYSNAP_DB", default_value = ".deploysnap/store.db")]
    db: PathBuf,

    /// Log output: dev, json or off
    #[arg(long, global = true, env = "DEPLOYSNAP_LOG", default_value = "off")]
    log: Profile,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Deployment operations
    Deployment(commands::deployment::DeploymentArgs),
    /// Snapshot lifecycle, ordering and cloning
    Snapshot(commands::snapshot::SnapshotArgs),
    /// Role and attrib operations
    Role(commands::role::RoleArgs),
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    logging_facility::init(cli.log);
    tracing::debug!(db = %cli.db.display(), "Opening store");
    let mut store = SqliteStore::open(&cli.db)?;

    match cli.command {
        Commands::Deployment(args) => commands::deployment::execute(args, &mut store),
        Commands::Snapshot(args) => commands::snapshot::execute(args, &mut store),
        Commands::Role(args) => commands::role::execute(args, &mut store),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
