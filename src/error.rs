use thiserror::Error;

use crate::db::DbError;

/// Errors raised by the migration engine.
///
/// Everything here is fatal to the current run: validation problems surface
/// before any SQL executes, and execution problems leave the surrounding
/// transaction uncommitted. Nothing is retried.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("action `{action}` is missing required field `{field}`")]
    MissingField {
        action: &'static str,
        field: &'static str,
    },

    #[error("invalid value for field `{field}` in action `{action}`: {message}")]
    InvalidField {
        action: &'static str,
        field: &'static str,
        message: String,
    },

    #[error("no handler registered for action type `{0}`")]
    UnknownAction(String),

    #[error(
        "invalid identifier `{0}`: identifiers must match [A-Za-z_][A-Za-z0-9_]* \
         and cannot be interpolated into SQL otherwise"
    )]
    InvalidIdentifier(String),

    #[error(
        "schema version mismatch: change set targets version {target} \
         but the stored version is {current} (expected {expected})"
    )]
    VersionMismatch {
        target: u32,
        current: u32,
        expected: u32,
    },

    #[error("change set has no target_version and version checking was requested")]
    MissingTargetVersion,

    #[error("task `{0}` could not be resolved to an executable migration task")]
    TaskResolution(String),

    #[error("task `{name}` failed: {message}")]
    TaskFailed { name: String, message: String },

    #[error("migration `{0}` has no `down` actions and cannot be rolled back")]
    MissingDown(String),

    #[error("could not detect a legacy schema version: {0}")]
    Detection(String),

    #[error("failed to load migration file {path}: {message}")]
    MigrationFile { path: String, message: String },

    #[error(transparent)]
    Database(#[from] DbError),
}

impl EngineError {
    pub fn missing_field(action: &'static str, field: &'static str) -> Self {
        EngineError::MissingField { action, field }
    }

    pub fn invalid_field(
        action: &'static str,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        EngineError::InvalidField {
            action,
            field,
            message: message.into(),
        }
    }
}
