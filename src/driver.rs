//! The consumed driver capability boundary.
//!
//! The core is written against these object-safe traits only; anything that
//! can open a session, run SQL text, and walk a result cursor can plug in.
//! Adapters for embedded `SQLite` ([`crate::sqlite`]) and networked Postgres
//! ([`crate::postgres`]) ship behind feature flags.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ScopedDbError;
use crate::manager::DbConfig;
use crate::value::SqlValue;

/// Entry point of the driver boundary: opens physical connections.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Open a new physical connection. Credential validation happens below
    /// this call, never above it.
    async fn open(&self, config: &DbConfig) -> Result<Arc<dyn DriverConnection>, ScopedDbError>;
}

/// A live database session.
///
/// Exclusively owned by the scope that opened it; the layer above never
/// interleaves statements or cursors on one connection.
#[async_trait]
pub trait DriverConnection: Send + Sync {
    /// Release the session. Idempotent: closing twice is a no-op.
    async fn close(&self) -> Result<(), ScopedDbError>;

    /// `false` begins a transaction; `true` restores statement-at-a-time
    /// commit mode (a no-op on drivers where commit/rollback already do).
    async fn set_autocommit(&self, enabled: bool) -> Result<(), ScopedDbError>;

    async fn commit(&self) -> Result<(), ScopedDbError>;

    async fn rollback(&self) -> Result<(), ScopedDbError>;

    /// Create a statement handle bound to this connection.
    async fn create_statement(&self) -> Result<Box<dyn DriverStatement>, ScopedDbError>;
}

/// One submitted SQL command, scoped to one execution.
#[async_trait]
pub trait DriverStatement: Send {
    /// Run `sql` and report whether it produced a result set.
    async fn execute(&mut self, sql: &str) -> Result<bool, ScopedDbError>;

    /// Run a mutating statement, returning the affected-row count.
    async fn execute_update(&mut self, sql: &str) -> Result<usize, ScopedDbError>;

    /// Run a query, producing a forward-only cursor over its rows.
    async fn execute_query(&mut self, sql: &str) -> Result<Box<dyn DriverCursor>, ScopedDbError>;

    async fn close(&mut self) -> Result<(), ScopedDbError>;
}

/// Forward-only cursor over the rows produced by a query.
#[async_trait]
pub trait DriverCursor: Send {
    /// Move to the next row; `false` once the rows are exhausted.
    async fn advance(&mut self) -> Result<bool, ScopedDbError>;

    /// Read a field of the current row. Synchronous by contract: adapters
    /// buffer the current row, so row mapping never suspends.
    fn read(&self, field: &str) -> Result<SqlValue, ScopedDbError>;

    async fn close(&mut self) -> Result<(), ScopedDbError>;
}
