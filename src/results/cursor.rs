use crate::driver::DriverCursor;
use crate::error::ScopedDbError;

use super::Row;

/// Owned handle over an open driver cursor, handed to row handlers by
/// [`crate::executor::QueryExecutor::query`].
///
/// The cursor is only valid for the duration of the handler call; it is
/// closed as soon as the handler returns, on every exit path.
pub struct Cursor {
    inner: Box<dyn DriverCursor>,
}

impl Cursor {
    pub(crate) fn new(inner: Box<dyn DriverCursor>) -> Self {
        Self { inner }
    }

    /// Advance to the next row. Returns `false` once the rows are exhausted.
    pub async fn advance(&mut self) -> Result<bool, ScopedDbError> {
        self.inner.advance().await
    }

    /// View of the current row. Only meaningful between a successful
    /// [`advance`](Self::advance) and the next one.
    #[must_use]
    pub fn row(&self) -> Row<'_> {
        Row::new(self.inner.as_ref())
    }

    pub(crate) async fn close(&mut self) -> Result<(), ScopedDbError> {
        self.inner.close().await
    }
}
