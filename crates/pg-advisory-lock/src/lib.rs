//! Named cross-process mutexes on top of PostgreSQL advisory locks.
//!
//! Processes that share a database often need to serialize work across
//! machines ("only one worker may reindex at a time") without standing up a
//! separate coordination service. PostgreSQL already ships a lock manager
//! for exactly this; what it wants is numeric keys. This crate maps
//! symbolic names onto those keys and drives the acquire → work → release
//! protocol so a lock can never leak on an error path.
//!
//! - A [`LockRegistry`] is built once at startup and maps each name to one
//!   or two 64-bit keys.
//! - A [`LockManager`] resolves a [`LockRequest`] against that registry,
//!   picks the matching `pg_advisory_*` function from the request's flags,
//!   and issues the statements through a [`SqlCaller`].
//! - Transaction-scoped locks (the default) are released by the database
//!   when the enclosing transaction ends; session-scoped locks are released
//!   explicitly in every exit path of the caller's work closure.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use pg_advisory_lock::{LockManager, LockRegistry, LockRequest, PgSession};
//!
//! # async fn demo() -> pg_advisory_lock::Result<()> {
//! let mut registry = LockRegistry::new();
//! registry.register("reindex", &[4_200])?;
//! registry.register("jobs", &[4_300])?;
//!
//! let session = PgSession::connect("postgres://localhost/app").await?;
//! let locks = LockManager::new(Arc::new(registry), session);
//!
//! // Serialized across every process sharing the database.
//! locks
//!     .with_lock("reindex", || async {
//!         // rebuild the index
//!         Ok(())
//!     })
//!     .await?;
//!
//! // Per-job mutex: the id becomes the second lock key.
//! locks
//!     .try_with_lock(LockRequest::new("jobs").with_id(17).session_scoped(), || async {
//!         // run job 17, or fail fast if another worker already is
//!         Ok(())
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod caller;
mod error;
pub mod keys;
pub mod manager;
pub mod postgres;
pub mod registry;
pub mod request;
pub mod statement;

pub use caller::SqlCaller;
pub use error::{Error, Result};
pub use keys::{resolve_keys, ResolvedKey, ResolvedKeys};
pub use manager::LockManager;
pub use postgres::PgSession;
pub use registry::{KeySpec, LockRegistry};
pub use request::{LockRequest, SubId};
pub use statement::{
    acquire_function, release_function, AcquireFunction, ReleaseFunction,
};
