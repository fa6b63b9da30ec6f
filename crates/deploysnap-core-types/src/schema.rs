//! Canonical schema constants for structured logging and events

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";

// Entity identifiers
pub const FIELD_SNAPSHOT_ID: &str = "snapshot_id";
pub const FIELD_DEPLOYMENT_ID: &str = "deployment_id";
pub const FIELD_ROLE_NAME: &str = "role_name";

// Lifecycle
pub const FIELD_STATUS_FROM: &str = "status_from";
pub const FIELD_STATUS_TO: &str = "status_to";

// Collection sizes
pub const FIELD_GROUP_COUNT: &str = "group_count";
pub const FIELD_ROLE_COUNT: &str = "role_count";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
