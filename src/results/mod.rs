//! Caller-facing views over query results: the open [`Cursor`] handed to
//! row handlers and the per-row [`Row`] accessor view.

mod cursor;
mod row;

pub use cursor::Cursor;
pub use row::Row;
