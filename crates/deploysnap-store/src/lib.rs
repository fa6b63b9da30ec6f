//! deploysnap store - SQLite persistence for deployment snapshots
//!
//! Provides:
//! - Connection management and pragmas
//! - Checksummed, idempotent schema migrations
//! - `SqliteStore`, a `SnapshotStore` backed by a single SQLite connection

pub mod db;
pub mod errors;
pub mod migrations;
pub mod repo;

// Re-export key types
pub use errors::Result;
pub use repo::SqliteStore;
