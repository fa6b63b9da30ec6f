use thiserror::Error;

use crate::model::SnapshotStatus;

/// Result type alias using DeploySnapError
pub type Result<T> = std::result::Result<T, DeploySnapError>;

/// Result type alias using the canonical ExError
///
/// Store implementations and store-backed operations return this so that
/// persistence failures and domain failures travel through one type.
pub type ExResult<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code usable for programmatic handling,
/// tests and CLI exit reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Lookup / structure
    InvalidInput,
    NotFound,
    ConstraintViolation,
    ValidationFailure,

    // Lifecycle
    InvalidTransition,

    // Encoding
    Deserialization,
    Serialization,

    // Integration/IO
    Io,
    Persistence,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::ConstraintViolation => "ERR_CONSTRAINT_VIOLATION",
            ExErrorKind::ValidationFailure => "ERR_VALIDATION_FAILURE",
            ExErrorKind::InvalidTransition => "ERR_INVALID_TRANSITION",
            ExErrorKind::Deserialization => "ERR_DESERIALIZATION",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification kind plus optional context (operation, entity,
/// owning snapshot) for debugging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    snapshot_id: Option<String>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            snapshot_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity ID context (role, deployment, attrib...)
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add owning snapshot context
    pub fn with_snapshot_id(mut self, id: impl Into<String>) -> Self {
        self.snapshot_id = Some(id.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn snapshot_id(&self) -> Option<&str> {
        self.snapshot_id.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(snapshot_id) = &self.snapshot_id {
            write!(f, " (snapshot_id: {})", snapshot_id)?;
        }
        if let Some(source) = &self.source {
            write!(f, " caused by {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|s| s as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain error taxonomy for snapshot operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeploySnapError {
    // ===== Lookup Errors =====
    #[error("Snapshot not found: {snapshot_id}")]
    SnapshotNotFound { snapshot_id: String },

    #[error("Deployment not found: {deployment_id}")]
    DeploymentNotFound { deployment_id: String },

    /// Role lookup by id or by (name, snapshot) came back empty
    #[error("Role {role} not found in snapshot {snapshot_id}")]
    RoleNotFound { role: String, snapshot_id: String },

    // ===== Constraint Errors =====
    /// A role with this name already exists in the snapshot
    #[error("Role {name} already exists in snapshot {snapshot_id}")]
    DuplicateRole { name: String, snapshot_id: String },

    // ===== Validation Errors =====
    #[error("Invalid snapshot {snapshot_id}: {reason}")]
    InvalidSnapshot { snapshot_id: String, reason: String },

    /// Snapshot names are unique within a deployment
    #[error("Snapshot name {name} already used in deployment {deployment_id}")]
    DuplicateSnapshotName { name: String, deployment_id: String },

    #[error("Invalid name: {reason}")]
    InvalidName { reason: String },

    // ===== Lifecycle Errors =====
    #[error("Snapshot {snapshot_id} cannot move from {from} to {to}")]
    InvalidTransition {
        snapshot_id: String,
        from: SnapshotStatus,
        to: SnapshotStatus,
    },

    // ===== Decoding Errors =====
    /// Persisted status ordinal outside 1..=5
    #[error("Unknown snapshot status ordinal: {value}")]
    UnknownStatus { value: i64 },

    #[error("Malformed element order for snapshot {snapshot_id}: {reason}")]
    InvalidElementOrder { snapshot_id: String, reason: String },

    // ===== Generic Errors =====
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl From<DeploySnapError> for ExError {
    fn from(err: DeploySnapError) -> Self {
        match err {
            DeploySnapError::SnapshotNotFound { snapshot_id } => {
                ExError::new(ExErrorKind::NotFound)
                    .with_snapshot_id(snapshot_id)
                    .with_message("Snapshot not found")
            }

            DeploySnapError::DeploymentNotFound { deployment_id } => {
                ExError::new(ExErrorKind::NotFound)
                    .with_entity_id(deployment_id)
                    .with_message("Deployment not found")
            }

            DeploySnapError::RoleNotFound { role, snapshot_id } => {
                ExError::new(ExErrorKind::NotFound)
                    .with_entity_id(role)
                    .with_snapshot_id(snapshot_id)
                    .with_message("Role not found")
            }

            DeploySnapError::DuplicateRole { name, snapshot_id } => {
                ExError::new(ExErrorKind::ConstraintViolation)
                    .with_entity_id(name)
                    .with_snapshot_id(snapshot_id)
                    .with_message("Role name already exists in snapshot")
            }

            DeploySnapError::InvalidSnapshot {
                snapshot_id,
                reason,
            } => ExError::new(ExErrorKind::ValidationFailure)
                .with_snapshot_id(snapshot_id)
                .with_message(reason),

            DeploySnapError::DuplicateSnapshotName {
                name,
                deployment_id,
            } => ExError::new(ExErrorKind::ValidationFailure)
                .with_entity_id(deployment_id)
                .with_message(format!("Snapshot name {} already used", name)),

            DeploySnapError::InvalidName { reason } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(reason)
            }

            DeploySnapError::InvalidTransition {
                snapshot_id,
                from,
                to,
            } => ExError::new(ExErrorKind::InvalidTransition)
                .with_snapshot_id(snapshot_id)
                .with_message(format!("Cannot move from {} to {}", from, to)),

            DeploySnapError::UnknownStatus { value } => ExError::new(ExErrorKind::Deserialization)
                .with_message(format!("Unknown snapshot status ordinal {}", value)),

            DeploySnapError::InvalidElementOrder {
                snapshot_id,
                reason,
            } => ExError::new(ExErrorKind::Deserialization)
                .with_op("parse_element_order")
                .with_snapshot_id(snapshot_id)
                .with_message(reason),

            DeploySnapError::Serialization { message } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }

        }
    }
}

/// Conversion from serde_json::Error to DeploySnapError
impl From<serde_json::Error> for DeploySnapError {
    fn from(err: serde_json::Error) -> Self {
        DeploySnapError::Serialization {
            message: err.to_string(),
        }
    }
}
