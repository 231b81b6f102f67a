//! Scoped SQL execution with guaranteed resource cleanup and transaction
//! safety, generic over the effect runtime and the database driver.
//!
//! Connections, statements, and result cursors are released exactly once on
//! every exit path (normal completion, error, or cancellation), and
//! transactions commit on normal completion and roll back otherwise. The
//! core is written against two capability seams: the [`driver`] traits
//! (what a database backend must provide) and the [`effect`] contract (what
//! the surrounding runtime must provide). Adapters ship for embedded
//! `SQLite` and Postgres on the driver side, and for tokio and blocking
//! executors on the runtime side.
//!
//! # Examples
//! ```rust,no_run
//! use sql_scoped::prelude::*;
//!
//! # async fn demo() -> Result<(), ScopedDbError> {
//! let manager = ConnectionManager::new_sqlite("app.db");
//! let names = manager
//!     .with_connection(|exec| async move {
//!         exec.execute("CREATE TABLE IF NOT EXISTS t (id INT, name TEXT)")
//!             .await?;
//!         exec.transaction(|tx| async move {
//!             tx.insert("INSERT INTO t VALUES (1, 'foo')").await?;
//!             tx.query_rows("SELECT name FROM t ORDER BY id", |row| row.string("name"))
//!                 .await
//!         })
//!         .await
//!     })
//!     .await?;
//! assert_eq!(names, vec!["foo".to_string()]);
//! # Ok(()) }
//! ```

pub mod driver;
pub mod effect;
pub mod error;
pub mod executor;
pub mod manager;
pub mod prelude;
pub mod results;
pub mod value;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use error::ScopedDbError;
