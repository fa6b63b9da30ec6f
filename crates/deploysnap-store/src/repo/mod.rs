//! Repository layer persisting the snapshot domain to SQLite

mod rows;
pub mod sqlite_store;

pub use sqlite_store::SqliteStore;
