#![cfg(feature = "sqlite")]

use sql_scoped::prelude::*;
use tokio::runtime::Runtime;

#[test]
fn records_scenario_maps_rows_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let manager = ConnectionManager::new_sqlite(":memory:");
        let rows = manager
            .with_connection(|exec| async move {
                exec.execute("CREATE TABLE records (id INT, name VARCHAR)")
                    .await?;
                exec.transaction(|tx| async move {
                    tx.insert("INSERT INTO records (id, name) VALUES (1, 'foo')")
                        .await?;
                    tx.insert("INSERT INTO records (id, name) VALUES (2, 'bar')")
                        .await?;
                    Ok(())
                })
                .await?;
                exec.query_rows("SELECT id, name FROM records ORDER BY id ASC", |row| {
                    Ok((row.int("id")?, row.string("name")?))
                })
                .await
            })
            .await?;
        assert_eq!(rows, vec![(1, "foo".to_string()), (2, "bar".to_string())]);
        Ok::<_, ScopedDbError>(())
    })?;
    Ok(())
}

#[test]
fn rows_come_back_in_cursor_order() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let manager = ConnectionManager::new_sqlite(":memory:");
        let ids = manager
            .with_connection(|exec| async move {
                exec.execute("CREATE TABLE t (id INT)").await?;
                // Inserted out of order on purpose.
                for id in [5, 1, 9, 3, 7] {
                    exec.insert(&format!("INSERT INTO t VALUES ({id})")).await?;
                }
                exec.query_rows("SELECT id FROM t ORDER BY id DESC", |row| row.int("id"))
                    .await
            })
            .await?;
        assert_eq!(ids, vec![9, 7, 5, 3, 1]);
        Ok::<_, ScopedDbError>(())
    })?;
    Ok(())
}

#[test]
fn empty_result_set_maps_to_empty_sequence() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let manager = ConnectionManager::new_sqlite(":memory:");
        let rows = manager
            .with_connection(|exec| async move {
                exec.execute("CREATE TABLE t (id INT)").await?;
                exec.query_rows("SELECT id FROM t", |row| row.int("id")).await
            })
            .await?;
        assert!(rows.is_empty());
        Ok::<_, ScopedDbError>(())
    })?;
    Ok(())
}

#[test]
fn custom_row_handler_consumes_the_cursor() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let manager = ConnectionManager::new_sqlite(":memory:");
        let total = manager
            .with_connection(|exec| async move {
                exec.execute("CREATE TABLE t (id INT)").await?;
                exec.insert("INSERT INTO t VALUES (10)").await?;
                exec.insert("INSERT INTO t VALUES (32)").await?;
                exec.query(
                    "SELECT id FROM t",
                    row_handler(|cursor| {
                        Box::pin(async move {
                            let mut total = 0;
                            while cursor.advance().await? {
                                total += cursor.row().long("id")?;
                            }
                            Ok(total)
                        })
                    }),
                )
                .await
            })
            .await?;
        assert_eq!(total, 42);
        Ok::<_, ScopedDbError>(())
    })?;
    Ok(())
}
