use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::Connection;

use crate::driver::{Driver, DriverConnection, DriverCursor, DriverStatement};
use crate::error::ScopedDbError;
use crate::manager::DbConfig;

use super::query::build_cursor;

pub(crate) type SharedConnection = Arc<Mutex<Option<Connection>>>;

/// Opens embedded `SQLite` databases. Username and password are ignored;
/// the url is a filesystem path, `:memory:`, or a `file:` URI.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDriver;

#[async_trait]
impl Driver for SqliteDriver {
    async fn open(&self, config: &DbConfig) -> Result<Arc<dyn DriverConnection>, ScopedDbError> {
        let conn = Connection::open(&config.url).map_err(|e| {
            ScopedDbError::Connection(format!("failed to open '{}': {e}", config.url))
        })?;
        Ok(Arc::new(SqliteConnection {
            conn: Arc::new(Mutex::new(Some(conn))),
        }))
    }
}

/// A live embedded session.
pub struct SqliteConnection {
    conn: SharedConnection,
}

fn closed_connection() -> ScopedDbError {
    ScopedDbError::Connection("connection is closed".into())
}

fn lock_connection(conn: &SharedConnection) -> MutexGuard<'_, Option<Connection>> {
    match conn.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[async_trait]
impl DriverConnection for SqliteConnection {
    async fn close(&self) -> Result<(), ScopedDbError> {
        let conn = lock_connection(&self.conn).take();
        match conn {
            Some(conn) => conn.close().map_err(|(_conn, e)| {
                ScopedDbError::Connection(format!("failed to close connection: {e}"))
            }),
            // Closing twice is a no-op.
            None => Ok(()),
        }
    }

    async fn set_autocommit(&self, enabled: bool) -> Result<(), ScopedDbError> {
        if enabled {
            // COMMIT/ROLLBACK already ended the BEGIN scope; SQLite is back
            // in autocommit mode.
            return Ok(());
        }
        let guard = lock_connection(&self.conn);
        let conn = guard.as_ref().ok_or_else(closed_connection)?;
        conn.execute_batch("BEGIN").map_err(|e| {
            ScopedDbError::Statement(format!("failed to begin transaction: {e}"))
        })
    }

    async fn commit(&self) -> Result<(), ScopedDbError> {
        let guard = lock_connection(&self.conn);
        let conn = guard.as_ref().ok_or_else(closed_connection)?;
        conn.execute_batch("COMMIT")
            .map_err(|e| ScopedDbError::Commit(e.to_string()))
    }

    async fn rollback(&self) -> Result<(), ScopedDbError> {
        let guard = lock_connection(&self.conn);
        let conn = guard.as_ref().ok_or_else(closed_connection)?;
        conn.execute_batch("ROLLBACK")
            .map_err(|e| ScopedDbError::Rollback(e.to_string()))
    }

    async fn create_statement(&self) -> Result<Box<dyn DriverStatement>, ScopedDbError> {
        if lock_connection(&self.conn).is_none() {
            return Err(ScopedDbError::Statement(
                "cannot create a statement on a closed connection".into(),
            ));
        }
        Ok(Box::new(SqliteStatement {
            conn: Arc::clone(&self.conn),
            closed: false,
        }))
    }
}

/// Statement handle. `SQLite` prepares at execution time, so the handle is
/// just the connection plus a closed flag.
pub(crate) struct SqliteStatement {
    conn: SharedConnection,
    closed: bool,
}

impl SqliteStatement {
    fn guard(&self) -> Result<MutexGuard<'_, Option<Connection>>, ScopedDbError> {
        if self.closed {
            return Err(ScopedDbError::Statement("statement is closed".into()));
        }
        Ok(lock_connection(&self.conn))
    }
}

fn statement_error(e: &rusqlite::Error) -> ScopedDbError {
    ScopedDbError::Statement(format!("failed to execute statement: {e}"))
}

#[async_trait]
impl DriverStatement for SqliteStatement {
    async fn execute(&mut self, sql: &str) -> Result<bool, ScopedDbError> {
        let guard = self.guard()?;
        let conn = guard.as_ref().ok_or_else(closed_connection)?;
        let mut stmt = conn.prepare(sql).map_err(|e| statement_error(&e))?;
        let produced_rows = stmt.column_count() > 0;
        if produced_rows {
            let mut rows = stmt.query([]).map_err(|e| statement_error(&e))?;
            while rows.next().map_err(|e| statement_error(&e))?.is_some() {}
        } else {
            stmt.execute([]).map_err(|e| statement_error(&e))?;
        }
        Ok(produced_rows)
    }

    async fn execute_update(&mut self, sql: &str) -> Result<usize, ScopedDbError> {
        let guard = self.guard()?;
        let conn = guard.as_ref().ok_or_else(closed_connection)?;
        conn.execute(sql, []).map_err(|e| statement_error(&e))
    }

    async fn execute_query(&mut self, sql: &str) -> Result<Box<dyn DriverCursor>, ScopedDbError> {
        let guard = self.guard()?;
        let conn = guard.as_ref().ok_or_else(closed_connection)?;
        let cursor = build_cursor(conn, sql)?;
        Ok(Box::new(cursor))
    }

    async fn close(&mut self) -> Result<(), ScopedDbError> {
        self.closed = true;
        Ok(())
    }
}
