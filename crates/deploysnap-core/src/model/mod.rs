pub mod deployment;
pub mod element_order;
pub mod jig_event;
pub mod role;
pub mod snapshot;
pub mod status;

pub use deployment::{Deployment, DeploymentSlot};
pub use element_order::ElementOrder;
pub use jig_event::JigEvent;
pub use role::{
    sort_roles, Attrib, AttribType, Role, RoleDraft, PRIVATE_ROLE_NAME, PRIVATE_RUN_ORDER,
};
pub use snapshot::Snapshot;
pub use status::SnapshotStatus;
