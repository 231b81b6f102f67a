use futures::future::BoxFuture;

use crate::error::ScopedDbError;
use crate::results::{Cursor, Row};

/// Shape a closure into the row-handler form expected by
/// [`QueryExecutor::query`](super::QueryExecutor::query): the handler
/// borrows the open cursor for exactly the duration of the returned future.
pub fn row_handler<A, H>(handler: H) -> H
where
    H: for<'c> FnOnce(&'c mut Cursor) -> BoxFuture<'c, Result<A, ScopedDbError>>,
{
    handler
}

/// The canonical adapter between raw cursor consumption and a per-row
/// mapping function: advances the cursor until exhausted, invokes `mapper`
/// on each row, and accumulates the results in original row order.
pub fn map_rows<A, M>(
    mut mapper: M,
) -> impl for<'c> FnOnce(&'c mut Cursor) -> BoxFuture<'c, Result<Vec<A>, ScopedDbError>> + Send
where
    M: FnMut(&Row<'_>) -> Result<A, ScopedDbError> + Send + 'static,
    A: Send + 'static,
{
    row_handler(move |cursor| {
        Box::pin(async move {
            let mut rows = Vec::new();
            while cursor.advance().await? {
                // Row views never cross an advance; mapping is synchronous.
                let row = cursor.row();
                rows.push(mapper(&row)?);
            }
            Ok(rows)
        })
    })
}
