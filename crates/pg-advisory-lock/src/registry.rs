//! Lock name registry.
//!
//! Maps symbolic lock names onto the numeric keys PostgreSQL advisory lock
//! functions accept. A registry is built once at startup and shared by
//! reference with every lock-issuing component; it is read-only afterwards,
//! so concurrent readers need no additional synchronization.
//!
//! A component that wants its own lock namespace composes a fresh registry
//! instead of sharing this one. Registries never inherit entries from each
//! other, and registering on one never mutates another.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The key(s) a lock name maps to.
///
/// PostgreSQL advisory lock functions take either one 64-bit key or a pair
/// of keys; no other arity exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeySpec {
    /// A single key.
    Single(i64),
    /// Two keys, in registration order.
    Pair(i64, i64),
}

impl KeySpec {
    /// Number of keys in this definition.
    #[must_use]
    pub const fn arity(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Pair(..) => 2,
        }
    }
}

/// Registry of named lock definitions.
///
/// Deserializes from a plain map so lock tables can live in configuration
/// files: a name maps to either one integer or a two-integer array.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockRegistry {
    entries: HashMap<String, KeySpec>,
}

impl LockRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` as `keys`, overwriting any prior entry for that name
    /// in this registry only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDefinition`] unless `keys` holds exactly one
    /// or two values.
    pub fn register(&mut self, name: impl Into<String>, keys: &[i64]) -> Result<()> {
        let name = name.into();
        let entry = match *keys {
            [key] => KeySpec::Single(key),
            [first, second] => KeySpec::Pair(first, second),
            _ => {
                return Err(Error::InvalidDefinition {
                    name,
                    count: keys.len(),
                })
            }
        };
        self.entries.insert(name, entry);
        Ok(())
    }

    /// Look up the keys registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownLockName`] if `name` was never registered
    /// on this registry.
    pub fn resolve(&self, name: &str) -> Result<KeySpec> {
        self.entries
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownLockName {
                name: name.to_string(),
            })
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of registered definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no definitions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
