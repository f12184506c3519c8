//! Error types for advisory lock operations.

use thiserror::Error;

use crate::request::SubId;

/// Error type for registry, key resolution and lock protocol failures.
///
/// Registration and resolution errors are raised before any statement is
/// sent to the database. Transport faults surface as [`Error::Database`]
/// and are never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A lock was registered with something other than one or two keys.
    #[error("lock definition for '{name}' must be one or two integer keys, got {count}")]
    InvalidDefinition { name: String, count: usize },

    /// A request referenced a name never registered on this registry.
    #[error("unknown lock name '{name}'")]
    UnknownLockName { name: String },

    /// An id was supplied for a definition that already carries two keys.
    #[error("lock '{name}' already maps to two keys and cannot take an id")]
    KeyArityExceeded { name: String },

    /// A lock request needs a work closure to bound the lock's lifetime.
    #[error("lock '{name}' requires a work closure: {reason}")]
    BlockRequired { name: String, reason: String },

    /// A non-blocking acquisition found the lock already held elsewhere.
    #[error("advisory lock '{name}'{} is already held elsewhere", fmt_sub_id(.sub_id))]
    LockNotObtained {
        name: String,
        sub_id: Option<SubId>,
    },

    /// Database errors
    #[error("database error: {0}")]
    Database(String),
}

fn fmt_sub_id(sub_id: &Option<SubId>) -> String {
    sub_id
        .as_ref()
        .map(|id| format!(" (id {id})"))
        .unwrap_or_default()
}

impl Error {
    /// Stable machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidDefinition { .. } => "INVALID_DEFINITION",
            Self::UnknownLockName { .. } => "UNKNOWN_LOCK_NAME",
            Self::KeyArityExceeded { .. } => "KEY_ARITY_EXCEEDED",
            Self::BlockRequired { .. } => "BLOCK_REQUIRED",
            Self::LockNotObtained { .. } => "LOCK_NOT_OBTAINED",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Result type alias for advisory lock operations.
pub type Result<T> = std::result::Result<T, Error>;
