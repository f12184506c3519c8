//! Lock request types.
//!
//! A [`LockRequest`] describes one acquisition attempt: which named lock,
//! which scope, which mode, and an optional discriminator appended to the
//! registered key. Requests are constructed fresh per call and never
//! persisted.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Optional discriminator paired with a single-key lock definition.
///
/// An integer id becomes the second lock key verbatim. A text id is hashed
/// by the database itself at execution time, so that every process sharing
/// the database derives the same key from the same string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubId {
    /// Used verbatim as the second lock key.
    Int(i64),
    /// Hashed server-side into the second lock key.
    Text(String),
}

impl fmt::Display for SubId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(text) => write!(f, "{text}"),
        }
    }
}

impl From<i64> for SubId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for SubId {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for SubId {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for SubId {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// One acquisition attempt against a named lock.
///
/// Defaults to a transaction-scoped exclusive lock with no id. The
/// blocking/non-blocking axis is chosen by the entry point
/// (`with_lock` vs `try_with_lock`), not stored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockRequest {
    name: String,
    transaction: bool,
    shared: bool,
    sub_id: Option<SubId>,
}

impl LockRequest {
    /// Create a request for `name` with the default shape:
    /// transaction-scoped, exclusive, no id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transaction: true,
            shared: false,
            sub_id: None,
        }
    }

    /// Hold the lock for the duration of the work closure instead of the
    /// enclosing transaction.
    #[must_use]
    pub fn session_scoped(mut self) -> Self {
        self.transaction = false;
        self
    }

    /// Request the shared flavor of the lock.
    #[must_use]
    pub fn shared(mut self) -> Self {
        self.shared = true;
        self
    }

    /// Append a discriminator to the registered key.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<SubId>) -> Self {
        self.sub_id = Some(id.into());
        self
    }

    /// The symbolic lock name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the lock is released by the enclosing transaction.
    #[must_use]
    pub const fn is_transaction_scoped(&self) -> bool {
        self.transaction
    }

    /// Whether the shared flavor was requested.
    #[must_use]
    pub const fn is_shared(&self) -> bool {
        self.shared
    }

    /// The discriminator, if any.
    #[must_use]
    pub const fn sub_id(&self) -> Option<&SubId> {
        self.sub_id.as_ref()
    }
}

impl From<&str> for LockRequest {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for LockRequest {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}
