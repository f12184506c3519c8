//! In-memory stand-in for the SQL collaborator.
//!
//! [`FakeConn`] implements [`SqlCaller`] by interpreting the generated
//! advisory lock statements against a [`LockTable`] shared between
//! connections, with real blocking and waking, so protocol and concurrency
//! behavior can be exercised without a database. Every statement is
//! recorded verbatim, along with the `BEGIN`/`COMMIT`/`ROLLBACK` envelope,
//! for bit-exact assertions.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use pg_advisory_lock::{Error, LockManager, LockRegistry, Result, SqlCaller};
use tokio::sync::{Mutex, Notify};

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

/// Install a test subscriber once so `RUST_LOG`-style debugging works.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// The lock table every test case registers: `test1` with a single key,
/// `test2` with a key pair.
pub fn fixture_registry() -> Arc<LockRegistry> {
    let mut registry = LockRegistry::new();
    registry.register("test1", &[1_000]).expect("register test1");
    registry
        .register("test2", &[1_001, 1_002])
        .expect("register test2");
    Arc::new(registry)
}

/// A manager over a fresh private lock table.
pub fn manager() -> (LockManager<FakeConn>, FakeConn) {
    manager_with_table(&LockTable::new())
}

/// A manager whose connection contends on `table` with other connections.
pub fn manager_with_table(table: &Arc<LockTable>) -> (LockManager<FakeConn>, FakeConn) {
    init_tracing();
    let conn = FakeConn::new(table);
    (LockManager::new(fixture_registry(), conn.clone()), conn)
}

#[derive(Debug)]
struct Holder {
    conn: u64,
    shared: bool,
    count: u32,
}

#[derive(Debug, Default)]
struct KeyState {
    holders: Vec<Holder>,
}

impl KeyState {
    // A connection never conflicts with itself; shared holders coexist.
    fn compatible(&self, conn: u64, shared: bool) -> bool {
        self.holders
            .iter()
            .all(|holder| holder.conn == conn || (shared && holder.shared))
    }

    fn add(&mut self, conn: u64, shared: bool) {
        if let Some(holder) = self
            .holders
            .iter_mut()
            .find(|holder| holder.conn == conn && holder.shared == shared)
        {
            holder.count += 1;
        } else {
            self.holders.push(Holder {
                conn,
                shared,
                count: 1,
            });
        }
    }

    fn remove(&mut self, conn: u64, shared: bool) -> bool {
        let Some(index) = self
            .holders
            .iter()
            .position(|holder| holder.conn == conn && holder.shared == shared)
        else {
            return false;
        };
        self.holders[index].count -= 1;
        if self.holders[index].count == 0 {
            self.holders.swap_remove(index);
        }
        true
    }
}

/// Shared advisory lock state, keyed by the rendered argument list of the
/// generated statement (identical arguments are the same lock, which is
/// exactly the database's own notion of identity here).
#[derive(Debug, Default)]
pub struct LockTable {
    keys: Mutex<HashMap<String, KeyState>>,
    released: Notify,
}

impl LockTable {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    async fn acquire(&self, conn: u64, key: &str, shared: bool) {
        loop {
            let notified = self.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut keys = self.keys.lock().await;
                let state = keys.entry(key.to_string()).or_default();
                if state.compatible(conn, shared) {
                    state.add(conn, shared);
                    return;
                }
            }
            notified.await;
        }
    }

    async fn try_acquire(&self, conn: u64, key: &str, shared: bool) -> bool {
        let mut keys = self.keys.lock().await;
        let state = keys.entry(key.to_string()).or_default();
        if state.compatible(conn, shared) {
            state.add(conn, shared);
            true
        } else {
            false
        }
    }

    async fn release(&self, conn: u64, key: &str, shared: bool) -> bool {
        let removed = {
            let mut keys = self.keys.lock().await;
            keys.get_mut(key)
                .is_some_and(|state| state.remove(conn, shared))
        };
        if removed {
            self.released.notify_waiters();
        }
        removed
    }

    /// Whether any connection currently holds `key` in any mode.
    pub async fn is_held(&self, key: &str) -> bool {
        let keys = self.keys.lock().await;
        keys.get(key).is_some_and(|state| !state.holders.is_empty())
    }
}

#[derive(Debug)]
struct ConnState {
    id: u64,
    table: Arc<LockTable>,
    statements: StdMutex<Vec<String>>,
    depth: AtomicU32,
    xact_held: StdMutex<Vec<(String, bool)>>,
}

/// One simulated database connection. Clones share the same connection;
/// hand a clone to the manager and keep one for assertions.
#[derive(Debug, Clone)]
pub struct FakeConn {
    state: Arc<ConnState>,
}

impl FakeConn {
    pub fn new(table: &Arc<LockTable>) -> Self {
        Self {
            state: Arc::new(ConnState {
                id: NEXT_CONN_ID.fetch_add(1, Ordering::SeqCst),
                table: Arc::clone(table),
                statements: StdMutex::new(Vec::new()),
                depth: AtomicU32::new(0),
                xact_held: StdMutex::new(Vec::new()),
            }),
        }
    }

    /// Every statement this connection has seen, in order, including the
    /// transaction envelope.
    pub fn statements(&self) -> Vec<String> {
        self.state.statements.lock().expect("statement log").clone()
    }

    fn log(&self, sql: &str) {
        self.state
            .statements
            .lock()
            .expect("statement log")
            .push(sql.to_string());
    }

    async fn run(&self, sql: &str) -> Result<bool> {
        self.log(sql);
        let op = parse_statement(sql)
            .ok_or_else(|| Error::Database(format!("unsupported statement: {sql}")))?;

        if op.unlock {
            return Ok(self.state.table.release(self.state.id, &op.key, op.shared).await);
        }

        if op.transaction && !self.transaction_open() {
            return Err(Error::Database(
                "transaction-scoped advisory lock issued outside a transaction".into(),
            ));
        }

        let obtained = if op.nonblocking {
            self.state
                .table
                .try_acquire(self.state.id, &op.key, op.shared)
                .await
        } else {
            self.state.table.acquire(self.state.id, &op.key, op.shared).await;
            true
        };

        if obtained && op.transaction {
            self.state
                .xact_held
                .lock()
                .expect("xact lock list")
                .push((op.key, op.shared));
        }
        Ok(obtained)
    }

    async fn release_transaction_locks(&self) {
        let held: Vec<(String, bool)> = {
            let mut held = self.state.xact_held.lock().expect("xact lock list");
            held.drain(..).collect()
        };
        for (key, shared) in held {
            self.state.table.release(self.state.id, &key, shared).await;
        }
    }
}

impl SqlCaller for FakeConn {
    async fn execute(&self, sql: &str) -> Result<()> {
        self.run(sql).await.map(|_| ())
    }

    async fn select_value(&self, sql: &str) -> Result<bool> {
        self.run(sql).await
    }

    async fn transaction<T, F, Fut>(&self, work: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if self.transaction_open() {
            return work().await;
        }

        self.log("BEGIN");
        self.state.depth.store(1, Ordering::SeqCst);
        let outcome = work().await;
        self.log(if outcome.is_ok() { "COMMIT" } else { "ROLLBACK" });
        self.state.depth.store(0, Ordering::SeqCst);
        self.release_transaction_locks().await;
        outcome
    }

    fn transaction_open(&self) -> bool {
        self.state.depth.load(Ordering::SeqCst) > 0
    }
}

struct AdvisoryOp {
    key: String,
    shared: bool,
    transaction: bool,
    nonblocking: bool,
    unlock: bool,
}

fn parse_statement(sql: &str) -> Option<AdvisoryOp> {
    let rest = sql.strip_prefix("SELECT ")?;
    let open = rest.find('(')?;
    let name = rest.get(..open)?;
    let args = rest.get(open + 1..)?.strip_suffix(')')?;
    if !name.starts_with("pg_") || !name.contains("advisory") {
        return None;
    }
    Some(AdvisoryOp {
        key: args.to_string(),
        shared: name.ends_with("_shared"),
        transaction: name.contains("_xact_"),
        nonblocking: name.starts_with("pg_try_"),
        unlock: name.contains("_unlock"),
    })
}
