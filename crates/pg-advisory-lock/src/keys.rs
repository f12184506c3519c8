//! Key resolution.
//!
//! Turns a registered definition plus an optional sub-id into the final
//! ordered key list embedded in the generated statement. Text sub-ids are
//! not hashed here: they are rendered as a `hashtext(...)` expression so
//! the database computes the key at execution time, and every client stack
//! sharing the database derives the same key from the same string.

use crate::error::{Error, Result};
use crate::registry::{KeySpec, LockRegistry};
use crate::request::SubId;

/// One key position in a generated statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedKey {
    /// A literal 64-bit key.
    Int(i64),
    /// A text value hashed server-side via `hashtext`.
    TextHash(String),
}

/// The ordered key list for one acquisition, always one or two keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKeys {
    first: ResolvedKey,
    second: Option<ResolvedKey>,
}

impl ResolvedKeys {
    /// A single-key set.
    #[must_use]
    pub const fn single(first: ResolvedKey) -> Self {
        Self {
            first,
            second: None,
        }
    }

    /// A two-key set, in order.
    #[must_use]
    pub const fn pair(first: ResolvedKey, second: ResolvedKey) -> Self {
        Self {
            first,
            second: Some(second),
        }
    }

    /// Number of keys.
    #[must_use]
    pub const fn arity(&self) -> usize {
        match self.second {
            Some(_) => 2,
            None => 1,
        }
    }

    /// Render the argument list of an advisory lock call, quoting text
    /// sub-ids with the connection's own literal quoting.
    pub fn render(&self, quote: impl Fn(&str) -> String) -> String {
        match &self.second {
            Some(second) => format!(
                "{}, {}",
                render_key(&self.first, &quote),
                render_key(second, &quote)
            ),
            None => render_key(&self.first, &quote),
        }
    }
}

fn render_key(key: &ResolvedKey, quote: &impl Fn(&str) -> String) -> String {
    match key {
        ResolvedKey::Int(value) => value.to_string(),
        ResolvedKey::TextHash(text) => format!("hashtext({})", quote(text)),
    }
}

/// Resolve `name` (and an optional sub-id) into the final key list.
///
/// # Errors
///
/// - [`Error::UnknownLockName`] if `name` is not registered.
/// - [`Error::KeyArityExceeded`] if a sub-id is supplied against a
///   definition that already pairs two keys.
pub fn resolve_keys(
    registry: &LockRegistry,
    name: &str,
    sub_id: Option<&SubId>,
) -> Result<ResolvedKeys> {
    let base = registry.resolve(name)?;
    match (base, sub_id) {
        (KeySpec::Single(key), None) => Ok(ResolvedKeys::single(ResolvedKey::Int(key))),
        (KeySpec::Single(key), Some(SubId::Int(id))) => Ok(ResolvedKeys::pair(
            ResolvedKey::Int(key),
            ResolvedKey::Int(*id),
        )),
        (KeySpec::Single(key), Some(SubId::Text(text))) => Ok(ResolvedKeys::pair(
            ResolvedKey::Int(key),
            ResolvedKey::TextHash(text.clone()),
        )),
        (KeySpec::Pair(first, second), None) => Ok(ResolvedKeys::pair(
            ResolvedKey::Int(first),
            ResolvedKey::Int(second),
        )),
        (KeySpec::Pair(..), Some(_)) => Err(Error::KeyArityExceeded {
            name: name.to_string(),
        }),
    }
}
