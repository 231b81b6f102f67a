//! `tokio-postgres`-backed driver adapter: the fully asynchronous
//! instantiation of the driver capability boundary.

mod connection;
mod query;

pub use connection::{PostgresConnection, PostgresDriver};
