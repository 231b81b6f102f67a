//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions to
//! make it easier to get started with the library.

pub use crate::driver::{Driver, DriverConnection, DriverCursor, DriverStatement};
pub use crate::effect::{BlockingEffects, Effects, ExitCase, ReleaseGuard, TokioEffects};
pub use crate::error::ScopedDbError;
pub use crate::executor::{QueryExecutor, map_rows, row_handler};
pub use crate::manager::{ConnectionManager, DbConfig};
pub use crate::results::{Cursor, Row};
pub use crate::value::SqlValue;

#[cfg(feature = "postgres")]
pub use crate::postgres::PostgresDriver;
#[cfg(feature = "sqlite")]
pub use crate::sqlite::SqliteDriver;
