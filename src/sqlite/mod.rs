//! `rusqlite`-backed driver adapter: the blocking instantiation of the
//! driver capability boundary.
//!
//! One physical `rusqlite::Connection` per [`crate::driver::Driver::open`]
//! call, held behind a mutex. Driver calls run inline: embedded `SQLite`
//! calls are local and fast, and the layer above never interleaves scopes
//! on one connection, so the lock is uncontended.

mod connection;
mod query;

pub use connection::{SqliteConnection, SqliteDriver};
