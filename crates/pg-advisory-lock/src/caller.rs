//! SQL execution collaborator.
//!
//! The lock protocol only needs a handful of capabilities from the
//! connection layer; this trait is that seam. The production implementation
//! is [`crate::postgres::PgSession`]; tests substitute an in-memory
//! recording connection.

use std::future::Future;

use crate::error::Result;

/// The connection capabilities required by the lock protocol.
///
/// Implementations must route every call through a single database
/// connection: advisory locks belong to the connection that took them, so
/// spreading statements over a pool would acquire and release on different
/// sessions.
#[allow(async_fn_in_trait)]
pub trait SqlCaller {
    /// Run a statement, discarding its result. Blocking acquisitions go
    /// through here; the call itself suspends until the lock is granted.
    async fn execute(&self, sql: &str) -> Result<()>;

    /// Run a statement returning a single boolean scalar. Non-blocking
    /// acquisitions and explicit releases report through here.
    async fn select_value(&self, sql: &str) -> Result<bool>;

    /// Run `work` inside a database transaction, committing on `Ok` and
    /// rolling back on `Err`. Joins the ambient transaction when one is
    /// already open instead of nesting.
    async fn transaction<T, F, Fut>(&self, work: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>;

    /// Whether a transaction is currently open on this connection.
    fn transaction_open(&self) -> bool;

    /// Quote `raw` as a SQL string literal. Used only to embed text sub-ids
    /// in a server-side hash expression.
    fn quote_literal(&self, raw: &str) -> String {
        format!("'{}'", raw.replace('\'', "''"))
    }
}
