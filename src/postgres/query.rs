use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value as JsonValue;
use tokio_postgres::Client;

use crate::driver::{DriverCursor, DriverStatement};
use crate::error::ScopedDbError;
use crate::value::SqlValue;

use super::connection::SharedClient;

/// Statement handle: prepares on execute, so the handle is just the shared
/// client plus a closed flag.
pub(crate) struct PostgresStatement {
    client: SharedClient,
    closed: bool,
}

impl PostgresStatement {
    pub(crate) fn new(client: SharedClient) -> Self {
        Self {
            client,
            closed: false,
        }
    }

    async fn guard(
        &self,
    ) -> Result<tokio::sync::MutexGuard<'_, Option<Client>>, ScopedDbError> {
        if self.closed {
            return Err(ScopedDbError::Statement("statement is closed".into()));
        }
        Ok(self.client.lock().await)
    }
}

fn closed_connection() -> ScopedDbError {
    ScopedDbError::Connection("connection is closed".into())
}

fn statement_error(e: &tokio_postgres::Error) -> ScopedDbError {
    ScopedDbError::Statement(format!("failed to execute statement: {e}"))
}

#[async_trait]
impl DriverStatement for PostgresStatement {
    async fn execute(&mut self, sql: &str) -> Result<bool, ScopedDbError> {
        let guard = self.guard().await?;
        let client = guard.as_ref().ok_or_else(closed_connection)?;
        let stmt = client.prepare(sql).await.map_err(|e| statement_error(&e))?;
        if stmt.columns().is_empty() {
            client
                .execute(&stmt, &[])
                .await
                .map_err(|e| statement_error(&e))?;
            Ok(false)
        } else {
            client
                .query(&stmt, &[])
                .await
                .map_err(|e| statement_error(&e))?;
            Ok(true)
        }
    }

    async fn execute_update(&mut self, sql: &str) -> Result<usize, ScopedDbError> {
        let guard = self.guard().await?;
        let client = guard.as_ref().ok_or_else(closed_connection)?;
        let rows = client
            .execute(sql, &[])
            .await
            .map_err(|e| statement_error(&e))?;
        usize::try_from(rows).map_err(|e| {
            ScopedDbError::Statement(format!("invalid affected-row count: {e}"))
        })
    }

    async fn execute_query(&mut self, sql: &str) -> Result<Box<dyn DriverCursor>, ScopedDbError> {
        let guard = self.guard().await?;
        let client = guard.as_ref().ok_or_else(closed_connection)?;
        let stmt = client.prepare(sql).await.map_err(|e| statement_error(&e))?;
        let rows = client
            .query(&stmt, &[])
            .await
            .map_err(|e| statement_error(&e))?;

        let columns: Vec<String> = stmt
            .columns()
            .iter()
            .map(|col| col.name().to_string())
            .collect();
        let mut buffered = VecDeque::with_capacity(rows.len());
        for row in &rows {
            let mut values = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                values.push(extract_value(row, idx)?);
            }
            buffered.push_back(values);
        }

        Ok(Box::new(PostgresCursor {
            columns,
            rows: buffered,
            current: None,
            closed: false,
        }))
    }

    async fn close(&mut self) -> Result<(), ScopedDbError> {
        self.closed = true;
        Ok(())
    }
}

/// Extract a [`SqlValue`] from a `tokio_postgres` row, dispatching on the
/// column's declared type.
fn extract_value(row: &tokio_postgres::Row, idx: usize) -> Result<SqlValue, ScopedDbError> {
    let type_name = row.columns()[idx].type_().name();
    let wrap = |e: tokio_postgres::Error| {
        ScopedDbError::Cursor(format!("failed to read column {idx}: {e}"))
    };

    match type_name {
        "int2" => {
            let val: Option<i16> = row.try_get(idx).map_err(wrap)?;
            Ok(val.map_or(SqlValue::Null, |v| SqlValue::Int(i64::from(v))))
        }
        "int4" => {
            let val: Option<i32> = row.try_get(idx).map_err(wrap)?;
            Ok(val.map_or(SqlValue::Null, |v| SqlValue::Int(i64::from(v))))
        }
        "int8" => {
            let val: Option<i64> = row.try_get(idx).map_err(wrap)?;
            Ok(val.map_or(SqlValue::Null, SqlValue::Int))
        }
        "float4" | "float8" => {
            let val: Option<f64> = row.try_get(idx).map_err(wrap)?;
            Ok(val.map_or(SqlValue::Null, SqlValue::Float))
        }
        "bool" => {
            let val: Option<bool> = row.try_get(idx).map_err(wrap)?;
            Ok(val.map_or(SqlValue::Null, SqlValue::Bool))
        }
        "date" => {
            let val: Option<NaiveDate> = row.try_get(idx).map_err(wrap)?;
            Ok(val.map_or(SqlValue::Null, SqlValue::Date))
        }
        "time" => {
            let val: Option<NaiveTime> = row.try_get(idx).map_err(wrap)?;
            Ok(val.map_or(SqlValue::Null, SqlValue::Time))
        }
        "timestamp" | "timestamptz" => {
            let val: Option<NaiveDateTime> = row.try_get(idx).map_err(wrap)?;
            Ok(val.map_or(SqlValue::Null, SqlValue::Timestamp))
        }
        "json" | "jsonb" => {
            let val: Option<JsonValue> = row.try_get(idx).map_err(wrap)?;
            Ok(val.map_or(SqlValue::Null, SqlValue::Json))
        }
        "bytea" => {
            let val: Option<Vec<u8>> = row.try_get(idx).map_err(wrap)?;
            Ok(val.map_or(SqlValue::Null, SqlValue::Blob))
        }
        // Text, plus anything else that can surface as text.
        _ => {
            let val: Option<String> = row.try_get(idx).map_err(wrap)?;
            Ok(val.map_or(SqlValue::Null, SqlValue::Text))
        }
    }
}

/// Buffered forward-only cursor over materialized rows.
struct PostgresCursor {
    columns: Vec<String>,
    rows: VecDeque<Vec<SqlValue>>,
    current: Option<Vec<SqlValue>>,
    closed: bool,
}

fn closed_cursor() -> ScopedDbError {
    ScopedDbError::Cursor("cursor is closed".into())
}

#[async_trait]
impl DriverCursor for PostgresCursor {
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
