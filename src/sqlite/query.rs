use std::collections::VecDeque;

use async_trait::async_trait;
use rusqlite::Connection;
use rusqlite::types::Value;

use crate::driver::DriverCursor;
use crate::error::ScopedDbError;
use crate::value::SqlValue;

/// Buffered forward-only cursor. Query results are materialized up front so
/// `read` never touches the database.
pub(crate) struct SqliteCursor {
    columns: Vec<String>,
    rows: VecDeque<Vec<SqlValue>>,
    current: Option<Vec<SqlValue>>,
    closed: bool,
}

/// Run `sql` as a query and collect column names plus all rows.
pub(crate) fn build_cursor(conn: &Connection, sql: &str) -> Result<SqliteCursor, ScopedDbError> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| ScopedDbError::Statement(format!("failed to prepare query: {e}")))?;
    let columns: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();

    let mut rows = VecDeque::new();
    let mut rows_iter = stmt
        .query([])
        .map_err(|e| ScopedDbError::Statement(format!("failed to execute query: {e}")))?;
    while let Some(row) = rows_iter
        .next()
        .map_err(|e| ScopedDbError::Cursor(format!("failed to fetch row: {e}")))?
    {
        let mut values = Vec::with_capacity(columns.len());
        for idx in 0..columns.len() {
            values.push(extract_value(row, idx)?);
        }
        rows.push_back(values);
    }

    Ok(SqliteCursor {
        columns,
        rows,
        current: None,
        closed: false,
    })
}

/// Extract a [`SqlValue`] from a `SQLite` row.
fn extract_value(row: &rusqlite::Row, idx: usize) -> Result<SqlValue, ScopedDbError> {
    let value: Value = row
        .get(idx)
        .map_err(|e| ScopedDbError::Cursor(format!("failed to read column {idx}: {e}")))?;
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Int(i),
        Value::Real(f) => SqlValue::Float(f),
        Value::Text(s) => SqlValue::Text(s),
        Value::Blob(b) => SqlValue::Blob(b),
    })
}

fn closed_cursor() -> ScopedDbError {
    ScopedDbError::Cursor("cursor is closed".into())
}

#[async_trait]
impl DriverCursor for SqliteCursor {
    async fn advance(&mut self) -> Result<bool, ScopedDbError> {
        if self.closed {
            return Err(closed_cursor());
        }
        self.current = self.rows.pop_front();
        Ok(self.current.is_some())
    }

    fn read(&self, field: &str) -> Result<SqlValue, ScopedDbError> {
        if self.closed {
            return Err(closed_cursor());
        }
        let row = self
            .current
            .as_ref()
            .ok_or_else(|| ScopedDbError::Cursor("cursor is not positioned on a row".into()))?;
        let idx = self
            .columns
            .iter()
            .position(|c| c == field)
            .ok_or_else(|| ScopedDbError::Cursor(format!("no such column '{field}'")))?;
        Ok(row[idx].clone())
    }

    async fn close(&mut self) -> Result<(), ScopedDbError> {
        self.closed = true;
        self.rows.clear();
        self.current = None;
        Ok(())
    }
}
