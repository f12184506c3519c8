//! PostgreSQL connection wrapper.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};

use sqlx::{Connection, PgConnection};
use tokio::sync::Mutex;

use crate::caller::SqlCaller;
use crate::error::{Error, Result};

/// A single dedicated PostgreSQL connection.
///
/// Advisory locks are owned by the connection that acquired them, so this
/// wrapper pins every statement to one `PgConnection` rather than borrowing
/// from a pool. Statements are serialized through an internal mutex; a
/// session is meant to be driven by one task at a time, and transactions
/// must not be interleaved across tasks.
#[derive(Debug)]
pub struct PgSession {
    conn: Mutex<PgConnection>,
    depth: AtomicU32,
}

impl PgSession {
    /// Connect to `url` and wrap the resulting connection.
    pub async fn connect(url: &str) -> Result<Self> {
        let conn = PgConnection::connect(url)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    /// Wrap an already-established connection.
    #[must_use]
    pub fn from_connection(conn: PgConnection) -> Self {
        Self {
            conn: Mutex::new(conn),
            depth: AtomicU32::new(0),
        }
    }
}

impl SqlCaller for PgSession {
    async fn execute(&self, sql: &str) -> Result<()> {
        let mut conn = self.conn.lock().await;
        sqlx::query(sql)
            .execute(&mut *conn)
            .await
            .map(|_| ())
            .map_err(|e| Error::Database(e.to_string()))
    }

    async fn select_value(&self, sql: &str) -> Result<bool> {
        let mut conn = self.conn.lock().await;
        sqlx::query_scalar::<_, bool>(sql)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    async fn transaction<T, F, Fut>(&self, work: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if self.transaction_open() {
            return work().await;
        }

        self.execute("BEGIN").await?;
        self.depth.store(1, Ordering::SeqCst);
        let outcome = work().await;
        match outcome {
            Ok(value) => {
                let committed = self.execute("COMMIT").await;
                self.depth.store(0, Ordering::SeqCst);
                committed.map(|()| value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.execute("ROLLBACK").await {
                    tracing::warn!(error = %rollback_err, "rollback failed after work error");
                }
                self.depth.store(0, Ordering::SeqCst);
                Err(err)
            }
        }
    }

    fn transaction_open(&self) -> bool {
        self.depth.load(Ordering::SeqCst) > 0
    }
}
