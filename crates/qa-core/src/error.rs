//! Error types for qa-core

use thiserror::Error;

/// Broad category of a [`CoreError`], used by callers that need to react to
/// the class of failure rather than the exact variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input shape
    Validation,
    /// Illegal state transition
    PreconditionNotMet,
    /// Version mismatch, token reuse, or duplicate write
    Conflict,
    /// An external generation or analysis call failed
    DependencyFailure,
    /// Referenced entity does not exist
    NotFound,
    /// Configuration, IO, or parse failure
    Environment,
}

/// Core error type for the QA platform
#[derive(Error, Debug)]
pub enum CoreError {
    /// V001: Input failed shape validation
    #[error("[V001] Invalid {entity}: {message}")]
    Validation { entity: String, message: String },

    /// P001: Transition attempted from a state that does not allow it
    #[error("[P001] Cannot {action} {entity} '{id}': status is {actual}, requires {required}")]
    PreconditionNotMet {
        entity: String,
        id: String,
        action: String,
        actual: String,
        required: String,
    },

    /// C001: Optimistic concurrency or idempotency conflict on an entity
    #[error("[C001] Conflict on {entity} '{id}': {message}")]
    Conflict {
        entity: String,
        id: String,
        message: String,
    },

    /// C002: The persisted ledger moved on since it was loaded
    #[error("[C002] Ledger revision conflict: loaded {expected}, store is at {found}")]
    RevisionConflict { expected: u64, found: u64 },

    /// D001: Generation or analysis backend failed
    #[error("[D001] {operation} failed: {message}")]
    DependencyFailure { operation: String, message: String },

    /// N001: Entity not found
    #[error("[N001] {entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E002: Invalid configuration value
    #[error("[E002] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E003: IO error
    #[error("[E003] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// E004: IO error with file path context
    #[error("[E004] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// E005: YAML parse error
    #[error("[E005] YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// E006: JSON serialization/deserialization error
    #[error("[E006] JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Validation { .. } => ErrorKind::Validation,
            CoreError::PreconditionNotMet { .. } => ErrorKind::PreconditionNotMet,
            CoreError::Conflict { .. } | CoreError::RevisionConflict { .. } => {
                ErrorKind::Conflict
            }
            CoreError::DependencyFailure { .. } => ErrorKind::DependencyFailure,
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::ConfigNotFound { .. }
            | CoreError::ConfigInvalid { .. }
            | CoreError::Io(_)
            | CoreError::IoWithPath { .. }
            | CoreError::YamlParse(_)
            | CoreError::Json(_) => ErrorKind::Environment,
        }
    }

    pub(crate) fn validation(entity: &str, message: impl Into<String>) -> Self {
        CoreError::Validation {
            entity: entity.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn not_found(entity: &str, id: impl ToString) -> Self {
        CoreError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub(crate) fn conflict(entity: &str, id: impl ToString, message: impl Into<String>) -> Self {
        CoreError::Conflict {
            entity: entity.to_string(),
            id: id.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
