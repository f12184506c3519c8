//! Statement selection and rendering.
//!
//! Four boolean axes (blocking, scope, mode, acquire/release) collapse onto
//! ten PostgreSQL advisory lock functions. Selection is a pure mapping from
//! the flag tuple onto an enum tag; rendering produces the exact statement
//! text sent to the connection.

use crate::keys::ResolvedKeys;

/// The acquisition function chosen for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcquireFunction {
    /// Blocking, session-scoped, exclusive.
    Lock,
    /// Blocking, session-scoped, shared.
    LockShared,
    /// Non-blocking, session-scoped, exclusive.
    TryLock,
    /// Non-blocking, session-scoped, shared.
    TryLockShared,
    /// Blocking, transaction-scoped, exclusive.
    XactLock,
    /// Blocking, transaction-scoped, shared.
    XactLockShared,
    /// Non-blocking, transaction-scoped, exclusive.
    TryXactLock,
    /// Non-blocking, transaction-scoped, shared.
    TryXactLockShared,
}

/// Map the request flags onto the acquisition function.
#[must_use]
pub const fn acquire_function(wait: bool, transaction: bool, shared: bool) -> AcquireFunction {
    match (wait, transaction, shared) {
        (true, false, false) => AcquireFunction::Lock,
        (true, false, true) => AcquireFunction::LockShared,
        (false, false, false) => AcquireFunction::TryLock,
        (false, false, true) => AcquireFunction::TryLockShared,
        (true, true, false) => AcquireFunction::XactLock,
        (true, true, true) => AcquireFunction::XactLockShared,
        (false, true, false) => AcquireFunction::TryXactLock,
        (false, true, true) => AcquireFunction::TryXactLockShared,
    }
}

impl AcquireFunction {
    /// The PostgreSQL function name.
    #[must_use]
    pub const fn sql_name(self) -> &'static str {
        match self {
            Self::Lock => "pg_advisory_lock",
            Self::LockShared => "pg_advisory_lock_shared",
            Self::TryLock => "pg_try_advisory_lock",
            Self::TryLockShared => "pg_try_advisory_lock_shared",
            Self::XactLock => "pg_advisory_xact_lock",
            Self::XactLockShared => "pg_advisory_xact_lock_shared",
            Self::TryXactLock => "pg_try_advisory_xact_lock",
            Self::TryXactLockShared => "pg_try_advisory_xact_lock_shared",
        }
    }

    /// Whether the function returns a boolean instead of blocking.
    #[must_use]
    pub const fn is_nonblocking(self) -> bool {
        matches!(
            self,
            Self::TryLock | Self::TryLockShared | Self::TryXactLock | Self::TryXactLockShared
        )
    }
}

/// The explicit release function, session scope only.
///
/// Transaction-scoped locks are released by the database when the owning
/// transaction ends; no release function exists for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseFunction {
    /// Release an exclusive session lock.
    Unlock,
    /// Release a shared session lock.
    UnlockShared,
}

/// Map the mode flag onto the release function.
#[must_use]
pub const fn release_function(shared: bool) -> ReleaseFunction {
    if shared {
        ReleaseFunction::UnlockShared
    } else {
        ReleaseFunction::Unlock
    }
}

impl ReleaseFunction {
    /// The PostgreSQL function name.
    #[must_use]
    pub const fn sql_name(self) -> &'static str {
        match self {
            Self::Unlock => "pg_advisory_unlock",
            Self::UnlockShared => "pg_advisory_unlock_shared",
        }
    }
}

/// Render the acquisition statement for `keys`.
pub fn acquire_statement(
    function: AcquireFunction,
    keys: &ResolvedKeys,
    quote: impl Fn(&str) -> String,
) -> String {
    format!("SELECT {}({})", function.sql_name(), keys.render(quote))
}

/// Render the explicit release statement for `keys`.
pub fn release_statement(
    function: ReleaseFunction,
    keys: &ResolvedKeys,
    quote: impl Fn(&str) -> String,
) -> String {
    format!("SELECT {}({})", function.sql_name(), keys.render(quote))
}
