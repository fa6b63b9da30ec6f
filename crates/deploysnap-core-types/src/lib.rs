//! Core types shared across deploysnap facilities
//!
//! **Schema constants**: canonical field keys and event names used by the
//! logging facility and its test capture layer.

pub mod schema;
