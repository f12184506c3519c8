//! Lock acquisition and release protocol.
//!
//! [`LockManager`] drives the full acquire → work → release sequence
//! against the SQL collaborator. The scope flag selects one of two code
//! paths: transaction-scoped locks ride the enclosing transaction and are
//! never explicitly unlocked; session-scoped locks are released in every
//! exit path of the work closure.
//!
//! Nothing here tracks whether a lock is already held: every call is a
//! fresh statement, and reentrancy is whatever the database's own lock
//! manager provides.

use std::future::Future;
use std::sync::Arc;

use crate::caller::SqlCaller;
use crate::error::{Error, Result};
use crate::keys::{resolve_keys, ResolvedKeys};
use crate::registry::LockRegistry;
use crate::request::LockRequest;
use crate::statement::{
    acquire_function, acquire_statement, release_function, release_statement,
};

/// Issues named advisory locks over one SQL collaborator.
///
/// Holds the registry by reference so many managers (or many components)
/// can share one lock table built at startup. A component wanting an
/// independent lock namespace composes its own registry and its own
/// manager.
#[derive(Debug, Clone)]
pub struct LockManager<C> {
    registry: Arc<LockRegistry>,
    caller: C,
}

impl<C: SqlCaller> LockManager<C> {
    /// Create a manager over `registry` and `caller`.
    pub fn new(registry: Arc<LockRegistry>, caller: C) -> Self {
        Self { registry, caller }
    }

    /// The registry this manager resolves names against.
    #[must_use]
    pub fn registry(&self) -> &LockRegistry {
        &self.registry
    }

    /// The underlying SQL collaborator.
    #[must_use]
    pub const fn caller(&self) -> &C {
        &self.caller
    }

    /// Acquire the lock, waiting for it if necessary, run `work` while it
    /// is held, and release it.
    ///
    /// Transaction-scoped requests run `work` inside a transaction (joining
    /// an ambient one when open) with the acquisition as its first
    /// statement; the database releases the lock when that transaction
    /// ends. Session-scoped requests acquire, run `work`, and always issue
    /// exactly one release: a work error still releases and then
    /// propagates unchanged.
    pub async fn with_lock<T, F, Fut>(&self, request: impl Into<LockRequest>, work: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run(request.into(), true, work).await
    }

    /// Like [`Self::with_lock`], but fail immediately with
    /// [`Error::LockNotObtained`] instead of waiting. `work` never runs
    /// when the lock is unavailable, and nothing is released.
    pub async fn try_with_lock<T, F, Fut>(
        &self,
        request: impl Into<LockRequest>,
        work: F,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run(request.into(), false, work).await
    }

    /// Acquire a transaction-scoped lock with no work closure, waiting for
    /// it if necessary. The ambient transaction must already be open; the
    /// lock is released when it ends.
    ///
    /// # Errors
    ///
    /// [`Error::BlockRequired`] for session-scoped requests (nothing would
    /// ever release the lock) and when no transaction is open.
    pub async fn lock(&self, request: impl Into<LockRequest>) -> Result<()> {
        self.bare_lock(request.into(), true).await
    }

    /// Like [`Self::lock`], but fail immediately with
    /// [`Error::LockNotObtained`] instead of waiting.
    pub async fn try_lock(&self, request: impl Into<LockRequest>) -> Result<()> {
        self.bare_lock(request.into(), false).await
    }

    async fn run<T, F, Fut>(&self, request: LockRequest, wait: bool, work: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let keys = resolve_keys(&self.registry, request.name(), request.sub_id())?;
        if request.is_transaction_scoped() {
            self.transaction_lock(self.acquire(&request, &keys, wait, true), work)
                .await
        } else {
            self.session_lock(&request, &keys, wait, work).await
        }
    }

    /// Acquisition rides the transaction; no explicit unlock is ever
    /// issued on this path.
    ///
    /// The acquisition is handed in as an already-constructed (but, like
    /// every future, not-yet-polled) future, so it is first awaited inside
    /// the transaction exactly as before. Passing it by value rather than
    /// rebuilding it from a borrowed `&self` inside the transaction closure
    /// keeps that closure free of any `self` borrow, which is what lets the
    /// resulting future satisfy `Send + 'static` under `tokio::spawn`.
    async fn transaction_lock<T, F, Fut, A>(&self, acquire: A, work: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
        A: Future<Output = Result<()>>,
    {
        self.caller
            .transaction(move || async move {
                acquire.await?;
                work().await
            })
            .await
    }

    /// Acquire, run work, release. The release fires whether or not the
    /// work succeeded; the work's own error wins over a release failure.
    async fn session_lock<T, F, Fut>(
        &self,
        request: &LockRequest,
        keys: &ResolvedKeys,
        wait: bool,
        work: F,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.acquire(request, keys, wait, false).await?;
        let outcome = work().await;
        let released = self.release(request, keys).await;
        match (outcome, released) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(release_err)) => Err(release_err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(release_err)) => {
                tracing::warn!(
                    name = %request.name(),
                    error = %release_err,
                    "failed to release advisory lock after work error"
                );
                Err(err)
            }
        }
    }

    async fn bare_lock(&self, request: LockRequest, wait: bool) -> Result<()> {
        let keys = resolve_keys(&self.registry, request.name(), request.sub_id())?;
        if !request.is_transaction_scoped() {
            return Err(Error::BlockRequired {
                name: request.name().to_string(),
                reason: "session-scoped locks are only released by a work closure".into(),
            });
        }
        if !self.caller.transaction_open() {
            return Err(Error::BlockRequired {
                name: request.name().to_string(),
                reason: "no open transaction to release the lock at commit or rollback".into(),
            });
        }
        self.acquire(&request, &keys, wait, true).await
    }

    async fn acquire(
        &self,
        request: &LockRequest,
        keys: &ResolvedKeys,
        wait: bool,
        transaction: bool,
    ) -> Result<()> {
        let function = acquire_function(wait, transaction, request.is_shared());
        let sql = acquire_statement(function, keys, |raw| self.caller.quote_literal(raw));
        tracing::debug!(name = %request.name(), statement = %sql, "acquiring advisory lock");

        if function.is_nonblocking() {
            let obtained = self.caller.select_value(&sql).await?;
            if !obtained {
                return Err(Error::LockNotObtained {
                    name: request.name().to_string(),
                    sub_id: request.sub_id().cloned(),
                });
            }
            Ok(())
        } else {
            self.caller.execute(&sql).await
        }
    }

    async fn release(&self, request: &LockRequest, keys: &ResolvedKeys) -> Result<()> {
        let function = release_function(request.is_shared());
        let sql = release_statement(function, keys, |raw| self.caller.quote_literal(raw));
        tracing::debug!(name = %request.name(), statement = %sql, "releasing advisory lock");

        let released = self.caller.select_value(&sql).await?;
        if !released {
            // The database also logs a warning in this situation.
            tracing::warn!(name = %request.name(), "advisory unlock reported no lock held");
        }
        Ok(())
    }
}
