//! Statement-scoped and cursor-scoped SQL execution, transaction
//! demarcation, and generic row collection against one live connection.

mod rows;

pub use rows::{map_rows, row_handler};

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::driver::{DriverConnection, DriverStatement};
use crate::effect::{Effects, ExitCase, ReleaseGuard, settle};
use crate::error::ScopedDbError;
use crate::results::{Cursor, Row};

/// Executes statements against one live connection, with every statement
/// and result cursor individually resource-scoped.
///
/// Cloning is cheap and yields a handle to the same connection; a
/// transaction body receives such a clone, so statements it issues join the
/// transaction. The connection must not be driven from two concurrently
/// running call chains; this layer adds no locking of its own.
#[derive(Clone)]
pub struct QueryExecutor {
    conn: Arc<dyn DriverConnection>,
    effects: Arc<dyn Effects>,
}

impl QueryExecutor {
    #[must_use]
    pub fn new(conn: Arc<dyn DriverConnection>, effects: Arc<dyn Effects>) -> Self {
        Self { conn, effects }
    }

    /// Run a statement with no structured result; reports whether it
    /// produced a result set. The statement is closed on every exit path.
    ///
    /// # Errors
    /// Returns `ScopedDbError` if statement creation, execution, or closing
    /// fails.
    pub async fn execute(&self, sql: &str) -> Result<bool, ScopedDbError> {
        let mut guard = self.statement_guard().await?;
        let outcome = guard.get_mut().execute(sql).await;
        settle(guard, outcome).await
    }

    /// Run a mutating statement, returning the affected-row count. The
    /// statement is closed on every exit path.
    ///
    /// # Errors
    /// Returns `ScopedDbError` if statement creation, execution, or closing
    /// fails.
    pub async fn insert(&self, sql: &str) -> Result<usize, ScopedDbError> {
        let mut guard = self.statement_guard().await?;
        let outcome = guard.get_mut().execute_update(sql).await;
        settle(guard, outcome).await
    }

    /// Alias of [`insert`](Self::insert): both mean "execute a mutating
    /// statement".
    ///
    /// # Errors
    /// See [`insert`](Self::insert).
    pub async fn update(&self, sql: &str) -> Result<usize, ScopedDbError> {
        self.insert(sql).await
    }

    /// Run a query, handing the open cursor to `handler`.
    ///
    /// The cursor scope nests inside the statement scope; both handles are
    /// closed on every exit path, and the cursor is unreachable once the
    /// handler returns. Handlers are usually built with [`map_rows`]; use
    /// [`row_handler`] to shape a custom one.
    ///
    /// # Errors
    /// Returns `ScopedDbError` if statement or cursor handling fails, or
    /// whatever failure `handler` produced.
    pub async fn query<A, H>(&self, sql: &str, handler: H) -> Result<A, ScopedDbError>
    where
        H: for<'c> FnOnce(&'c mut Cursor) -> BoxFuture<'c, Result<A, ScopedDbError>> + Send,
    {
        let mut stmt_guard = self.statement_guard().await?;
        let outcome = match stmt_guard.get_mut().execute_query(sql).await {
            Err(err) => Err(err),
            Ok(raw) => {
                let mut cursor_guard = ReleaseGuard::new(
                    Cursor::new(raw),
                    Arc::clone(&self.effects),
                    |mut cursor, _exit| async move { cursor.close().await },
                );
                let handled = handler(cursor_guard.get_mut()).await;
                settle(cursor_guard, handled).await
            }
        };
        settle(stmt_guard, outcome).await
    }

    /// [`query`](Self::query) composed with [`map_rows`]: runs `sql` and
    /// collects the mapped rows in result order.
    ///
    /// # Errors
    /// See [`query`](Self::query); a mapper failure propagates as-is.
    pub async fn query_rows<A, M>(&self, sql: &str, mapper: M) -> Result<Vec<A>, ScopedDbError>
    where
        M: FnMut(&Row<'_>) -> Result<A, ScopedDbError> + Send + 'static,
        A: Send + 'static,
    {
        self.query(sql, map_rows(mapper)).await
    }

    /// Run `body` inside a transaction: autocommit is disabled, the body
    /// runs with a clone of this executor, and the exit case decides the
    /// outcome: normal completion commits, an error or cancellation rolls
    /// back. Exactly one of commit/rollback happens per call.
    ///
    /// # Errors
    /// A commit failure propagates as [`ScopedDbError::Commit`]. A body
    /// failure triggers a rollback attempt before propagating; if the
    /// rollback itself fails, [`ScopedDbError::Rollback`] propagates
    /// instead and the connection must be discarded.
    pub async fn transaction<T, F, Fut>(&self, body: F) -> Result<T, ScopedDbError>
    where
        F: FnOnce(QueryExecutor) -> Fut,
        Fut: Future<Output = Result<T, ScopedDbError>>,
    {
        self.conn.set_autocommit(false).await?;
        debug!("transaction begun");
        let guard = ReleaseGuard::new(
            Arc::clone(&self.conn),
            Arc::clone(&self.effects),
            finish_transaction,
        );
        match body(self.clone()).await {
            Ok(value) => {
                guard.release(ExitCase::Completed).await?;
                Ok(value)
            }
            Err(primary) => match guard.release(ExitCase::Errored).await {
                Ok(()) => Err(primary),
                Err(rollback_err) => {
                    warn!(
                        error = %primary,
                        "rollback failed; surfacing the rollback failure, connection must be discarded"
                    );
                    Err(rollback_err)
                }
            },
        }
    }

    /// [`transaction`](Self::transaction) composed with
    /// [`query_rows`](Self::query_rows).
    ///
    /// # Errors
    /// See [`transaction`](Self::transaction) and
    /// [`query_rows`](Self::query_rows).
    pub async fn transactional_query_rows<A, M>(
        &self,
        sql: &str,
        mapper: M,
    ) -> Result<Vec<A>, ScopedDbError>
    where
        M: FnMut(&Row<'_>) -> Result<A, ScopedDbError> + Send + 'static,
        A: Send + 'static,
    {
        let sql = sql.to_owned();
        self.transaction(move |exec| async move { exec.query_rows(&sql, mapper).await })
            .await
    }

    /// Commit the current transaction on the underlying connection.
    ///
    /// # Errors
    /// Returns [`ScopedDbError::Commit`] if the driver rejects the commit.
    pub async fn commit(&self) -> Result<(), ScopedDbError> {
        self.conn.commit().await
    }

    /// Roll back the current transaction on the underlying connection.
    ///
    /// # Errors
    /// Returns [`ScopedDbError::Rollback`] if the driver rejects the
    /// rollback.
    pub async fn rollback(&self) -> Result<(), ScopedDbError> {
        self.conn.rollback().await
    }

    async fn statement_guard(
        &self,
    ) -> Result<ReleaseGuard<Box<dyn DriverStatement>>, ScopedDbError> {
        let stmt = self.conn.create_statement().await?;
        Ok(ReleaseGuard::new(
            stmt,
            Arc::clone(&self.effects),
            |mut stmt, _exit| async move { stmt.close().await },
        ))
    }
}

/// Release action of a transaction scope: commit on completion, roll back
/// on error or cancellation, then restore autocommit (a no-op on drivers
/// whose commit/rollback already restore it).
async fn finish_transaction(
    conn: Arc<dyn DriverConnection>,
    exit: ExitCase,
) -> Result<(), ScopedDbError> {
    match exit {
        ExitCase::Completed => {
            conn.commit().await?;
            restore_autocommit(conn.as_ref()).await;
            debug!("transaction committed");
        }
        ExitCase::Errored | ExitCase::Cancelled => {
            conn.rollback().await?;
            restore_autocommit(conn.as_ref()).await;
            debug!("transaction rolled back");
        }
    }
    Ok(())
}

async fn restore_autocommit(conn: &dyn DriverConnection) {
    if let Err(err) = conn.set_autocommit(true).await {
        warn!(error = %err, "failed to restore autocommit after transaction");
    }
}
