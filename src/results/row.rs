use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value as JsonValue;

use crate::driver::DriverCursor;
use crate::error::ScopedDbError;
use crate::value::SqlValue;

/// Accessor view over the row a cursor is currently positioned on.
///
/// Borrowed from the cursor, so it cannot outlive the mapping call it was
/// handed to. One checked reader per supported SQL type; each takes a field
/// name and returns the typed value, or fails if the field is missing or the
/// stored type is incompatible.
pub struct Row<'a> {
    cursor: &'a dyn DriverCursor,
}

impl<'a> Row<'a> {
    pub(crate) fn new(cursor: &'a dyn DriverCursor) -> Self {
        Self { cursor }
    }

    /// Raw value of a field in the current row.
    pub fn value(&self, field: &str) -> Result<SqlValue, ScopedDbError> {
        self.cursor.read(field)
    }

    pub fn is_null(&self, field: &str) -> Result<bool, ScopedDbError> {
        Ok(self.value(field)?.is_null())
    }

    pub fn bool(&self, field: &str) -> Result<bool, ScopedDbError> {
        match self.value(field)? {
            SqlValue::Bool(v) => Ok(v),
            SqlValue::Int(v) => Ok(v != 0),
            other => Err(mismatch(field, "BOOLEAN", &other)),
        }
    }

    pub fn byte(&self, field: &str) -> Result<i8, ScopedDbError> {
        self.narrowed(field, "TINYINT")
    }

    pub fn short(&self, field: &str) -> Result<i16, ScopedDbError> {
        self.narrowed(field, "SMALLINT")
    }

    pub fn int(&self, field: &str) -> Result<i32, ScopedDbError> {
        self.narrowed(field, "INTEGER")
    }

    pub fn long(&self, field: &str) -> Result<i64, ScopedDbError> {
        match self.value(field)? {
            SqlValue::Int(v) => Ok(v),
            other => Err(mismatch(field, "BIGINT", &other)),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn float(&self, field: &str) -> Result<f32, ScopedDbError> {
        self.double(field).map(|v| v as f32)
    }

    pub fn double(&self, field: &str) -> Result<f64, ScopedDbError> {
        match self.value(field)? {
            SqlValue::Float(v) => Ok(v),
            #[allow(clippy::cast_precision_loss)]
            SqlValue::Int(v) => Ok(v as f64),
            other => Err(mismatch(field, "DOUBLE", &other)),
        }
    }

    /// Decimal columns surface as whatever the driver stored; exact decimal
    /// coercion is the driver's concern, not this layer's.
    pub fn decimal(&self, field: &str) -> Result<f64, ScopedDbError> {
        match self.value(field)? {
            SqlValue::Float(v) => Ok(v),
            #[allow(clippy::cast_precision_loss)]
            SqlValue::Int(v) => Ok(v as f64),
            SqlValue::Text(s) => s.parse::<f64>().map_err(|_| {
                ScopedDbError::Cursor(format!("field '{field}': '{s}' is not a valid DECIMAL"))
            }),
            other => Err(mismatch(field, "DECIMAL", &other)),
        }
    }

    pub fn string(&self, field: &str) -> Result<String, ScopedDbError> {
        match self.value(field)? {
            SqlValue::Text(v) => Ok(v),
            other => Err(mismatch(field, "VARCHAR", &other)),
        }
    }

    pub fn bytes(&self, field: &str) -> Result<Vec<u8>, ScopedDbError> {
        match self.value(field)? {
            SqlValue::Blob(v) => Ok(v),
            other => Err(mismatch(field, "BLOB", &other)),
        }
    }

    pub fn date(&self, field: &str) -> Result<NaiveDate, ScopedDbError> {
        match self.value(field)? {
            SqlValue::Date(v) => Ok(v),
            SqlValue::Timestamp(v) => Ok(v.date()),
            SqlValue::Text(s) => NaiveDate::parse_from_str(&s, "%F").map_err(|_| {
                ScopedDbError::Cursor(format!("field '{field}': '{s}' is not a valid DATE"))
            }),
            other => Err(mismatch(field, "DATE", &other)),
        }
    }

    pub fn time(&self, field: &str) -> Result<NaiveTime, ScopedDbError> {
        match self.value(field)? {
            SqlValue::Time(v) => Ok(v),
            SqlValue::Text(s) => NaiveTime::parse_from_str(&s, "%T%.f").map_err(|_| {
                ScopedDbError::Cursor(format!("field '{field}': '{s}' is not a valid TIME"))
            }),
            other => Err(mismatch(field, "TIME", &other)),
        }
    }

    /// Timestamps stored as text (the `SQLite` convention) parse with the
    /// `%F %T%.f` encoding, with `T`-separated text accepted as well.
    pub fn timestamp(&self, field: &str) -> Result<NaiveDateTime, ScopedDbError> {
        match self.value(field)? {
            SqlValue::Timestamp(v) => Ok(v),
            SqlValue::Text(s) => NaiveDateTime::parse_from_str(&s, "%F %T%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(&s, "%FT%T%.f"))
                .map_err(|_| {
                    ScopedDbError::Cursor(format!(
                        "field '{field}': '{s}' is not a valid TIMESTAMP"
                    ))
                }),
            other => Err(mismatch(field, "TIMESTAMP", &other)),
        }
    }

    pub fn json(&self, field: &str) -> Result<JsonValue, ScopedDbError> {
        match self.value(field)? {
            SqlValue::Json(v) => Ok(v),
            SqlValue::Text(s) => serde_json::from_str(&s).map_err(|e| {
                ScopedDbError::Cursor(format!("field '{field}': invalid JSON: {e}"))
            }),
            other => Err(mismatch(field, "JSON", &other)),
        }
    }

    pub fn array(&self, field: &str) -> Result<Vec<SqlValue>, ScopedDbError> {
        match self.value(field)? {
            SqlValue::Array(v) => Ok(v),
            other => Err(mismatch(field, "ARRAY", &other)),
        }
    }

    pub fn row_id(&self, field: &str) -> Result<i64, ScopedDbError> {
        match self.value(field)? {
            SqlValue::Int(v) => Ok(v),
            other => Err(mismatch(field, "ROWID", &other)),
        }
    }

    pub fn url(&self, field: &str) -> Result<String, ScopedDbError> {
        match self.value(field)? {
            SqlValue::Text(v) => Ok(v),
            other => Err(mismatch(field, "URL", &other)),
        }
    }

    fn narrowed<T: TryFrom<i64>>(&self, field: &str, sql_type: &str) -> Result<T, ScopedDbError> {
        let v = match self.value(field)? {
            SqlValue::Int(v) => v,
            other => return Err(mismatch(field, sql_type, &other)),
        };
        T::try_from(v).map_err(|_| {
            ScopedDbError::Cursor(format!("field '{field}': value {v} out of range for {sql_type}"))
        })
    }
}

fn mismatch(field: &str, expected: &str, got: &SqlValue) -> ScopedDbError {
    ScopedDbError::Cursor(format!(
        "field '{field}': expected {expected}, got {}",
        got.type_name()
    ))
}
