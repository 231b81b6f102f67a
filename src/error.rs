use thiserror::Error;

/// Errors surfaced by the scoped SQL layer.
///
/// Every driver-level failure is classified by the operation that triggered
/// it and propagates to the immediate caller. Nothing here is retried, and
/// nothing is fatal to the process.
#[derive(Debug, Error)]
pub enum ScopedDbError {
    /// Failed to establish or close a connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Failed to create or close a statement, or to execute a query/update.
    #[error("Statement error: {0}")]
    Statement(String),

    /// Failed to advance, read from, or close a result cursor.
    #[error("Cursor error: {0}")]
    Cursor(String),

    /// Commit failed; none of the transaction's work took effect.
    #[error("Commit error: {0}")]
    Commit(String),

    /// Rollback failed; the connection must be treated as unusable and
    /// discarded by the caller.
    #[error("Rollback error: {0}")]
    Rollback(String),

    /// A caller-supplied row mapper failed.
    #[error("Row mapping error: {0}")]
    Mapping(String),
}
