#![cfg(feature = "sqlite")]

use chrono::{NaiveDate, NaiveTime};
use sql_scoped::prelude::*;
use tokio::runtime::Runtime;

#[test]
fn typed_readers_return_each_type() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let manager = ConnectionManager::new_sqlite(":memory:");
        manager
            .with_connection(|exec| async move {
                exec.execute(
                    "CREATE TABLE typed (
                        i INTEGER, big INTEGER, f REAL, t TEXT, b BLOB,
                        flag INTEGER, ts TEXT, d TEXT, tm TEXT, j TEXT, n INTEGER
                    )",
                )
                .await?;
                exec.insert(
                    "INSERT INTO typed VALUES (
                        7, 9000000000, 2.5, 'hello', X'DEADBEEF',
                        1, '2024-03-01 12:30:45', '2024-03-01', '12:30:45',
                        '{\"a\": 1}', NULL
                    )",
                )
                .await?;

                let rows = exec
                    .query_rows("SELECT * FROM typed", |row| {
                        assert_eq!(row.int("i")?, 7);
                        assert_eq!(row.byte("i")?, 7);
                        assert_eq!(row.short("i")?, 7);
                        assert_eq!(row.long("big")?, 9_000_000_000);
                        assert_eq!(row.row_id("i")?, 7);
                        assert!((row.double("f")? - 2.5).abs() < f64::EPSILON);
                        assert!((row.float("f")? - 2.5_f32).abs() < f32::EPSILON);
                        assert!((row.decimal("f")? - 2.5).abs() < f64::EPSILON);
                        assert_eq!(row.string("t")?, "hello");
                        assert_eq!(row.url("t")?, "hello");
                        assert_eq!(row.bytes("b")?, vec![0xDE, 0xAD, 0xBE, 0xEF]);
                        assert!(row.bool("flag")?);
                        assert_eq!(
                            row.timestamp("ts")?,
                            NaiveDate::from_ymd_opt(2024, 3, 1)
                                .unwrap()
                                .and_hms_opt(12, 30, 45)
                                .unwrap()
                        );
                        assert_eq!(row.date("d")?, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
                        assert_eq!(
                            row.time("tm")?,
                            NaiveTime::from_hms_opt(12, 30, 45).unwrap()
                        );
                        assert_eq!(row.json("j")?, serde_json::json!({"a": 1}));
                        assert!(row.is_null("n")?);
                        assert_eq!(row.value("n")?, SqlValue::Null);
                        Ok(())
                    })
                    .await?;
                assert_eq!(rows.len(), 1);
                Ok(())
            })
            .await
    })?;
    Ok(())
}

#[test]
fn narrowing_rejects_out_of_range_values() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let manager = ConnectionManager::new_sqlite(":memory:");
        let result: Result<Vec<i8>, _> = manager
            .with_connection(|exec| async move {
                exec.execute("CREATE TABLE t (id INT)").await?;
                exec.insert("INSERT INTO t VALUES (300)").await?;
                exec.query_rows("SELECT id FROM t", |row| row.byte("id")).await
            })
            .await;
        assert!(matches!(result, Err(ScopedDbError::Cursor(msg)) if msg.contains("out of range")));
        Ok::<_, ScopedDbError>(())
    })?;
    Ok(())
}

#[test]
fn type_mismatch_and_missing_fields_are_cursor_errors() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let manager = ConnectionManager::new_sqlite(":memory:");
        manager
            .with_connection(|exec| async move {
                exec.execute("CREATE TABLE t (id INT, name TEXT)").await?;
                exec.insert("INSERT INTO t VALUES (1, 'foo')").await?;

                let mismatch: Result<Vec<String>, _> = exec
                    .query_rows("SELECT id, name FROM t", |row| row.string("id"))
                    .await;
                assert!(
                    matches!(mismatch, Err(ScopedDbError::Cursor(msg)) if msg.contains("expected VARCHAR"))
                );

                let missing: Result<Vec<i32>, _> = exec
                    .query_rows("SELECT id FROM t", |row| row.int("nope"))
                    .await;
                assert!(
                    matches!(missing, Err(ScopedDbError::Cursor(msg)) if msg.contains("no such column"))
                );

                let null_read: Result<Vec<i64>, _> = exec
                    .query_rows("SELECT NULL AS empty FROM t", |row| row.long("empty"))
                    .await;
                assert!(
                    matches!(null_read, Err(ScopedDbError::Cursor(msg)) if msg.contains("got NULL"))
                );
                Ok(())
            })
            .await
    })?;
    Ok(())
}
