pub mod deployment;
pub mod role;
pub mod snapshot;
