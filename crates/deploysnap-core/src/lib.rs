//! deploysnap core - deployment configuration snapshots
//!
//! This crate provides the snapshot domain and the operations over it:
//! - Snapshot, Role, Attrib and Deployment models
//! - The snapshot commit state machine and its derived predicates
//! - Role order derivation from a snapshot's element order
//! - Deep clone of a snapshot and its role graph
//! - The `SnapshotStore` collaborator contract with an in-memory implementation
//! - Error and logging facilities shared with the store and CLI crates

pub mod catalog;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod ops;

// Re-export commonly used types
pub use catalog::{MessageCatalog, StaticCatalog};
pub use errors::{DeploySnapError, ExError, ExErrorKind, ExResult, Result};
pub use model::{Deployment, ElementOrder, Role, Snapshot, SnapshotStatus};
pub use ops::{deep_clone, CloneOptions, MemoryStore, SnapshotStore};
