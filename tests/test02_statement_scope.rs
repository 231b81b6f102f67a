#![cfg(feature = "sqlite")]

use std::sync::Arc;
use std::sync::atomic::Ordering;

use sql_scoped::prelude::*;
use sql_scoped::test_utils::{DriverStats, RecordingDriver};
use tokio::runtime::Runtime;

fn recording_manager() -> (ConnectionManager, Arc<DriverStats>) {
    let driver = RecordingDriver::new(Arc::new(SqliteDriver));
    let stats = driver.stats();
    let manager = ConnectionManager::new(Arc::new(driver), DbConfig::new(":memory:", "", ""));
    (manager, stats)
}

#[test]
fn execute_reports_result_set_production() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let (manager, _stats) = recording_manager();
        manager
            .with_connection(|exec| async move {
                assert!(!exec.execute("CREATE TABLE t (id INT)").await?);
                assert!(!exec.execute("INSERT INTO t VALUES (1)").await?);
                assert!(exec.execute("SELECT id FROM t").await?);
                Ok(())
            })
            .await
    })?;
    Ok(())
}

#[test]
fn insert_and_update_return_affected_rows() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let (manager, _stats) = recording_manager();
        manager
            .with_connection(|exec| async move {
                exec.execute("CREATE TABLE t (id INT, flag INT)").await?;
                assert_eq!(exec.insert("INSERT INTO t VALUES (1, 0)").await?, 1);
                assert_eq!(exec.insert("INSERT INTO t VALUES (2, 0)").await?, 1);
                // `update` is an alias of `insert`: any mutating statement.
                assert_eq!(exec.update("UPDATE t SET flag = 1").await?, 2);
                Ok(())
            })
            .await
    })?;
    Ok(())
}

#[test]
fn handles_balance_after_success_and_failure() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let (manager, stats) = recording_manager();
        let in_body = Arc::clone(&stats);
        manager
            .with_connection(|exec| async move {
                exec.execute("CREATE TABLE t (id INT)").await?;
                // Only the connection itself remains open between calls.
                assert_eq!(in_body.open_handles(), 1);

                exec.insert("INSERT INTO t VALUES (1)").await?;
                assert_eq!(in_body.open_handles(), 1);

                let rows = exec.query_rows("SELECT id FROM t", |row| row.int("id")).await?;
                assert_eq!(rows, vec![1]);
                assert_eq!(in_body.open_handles(), 1);

                // A failing statement still closes its handle.
                let result = exec.execute("SELECT nope FROM missing").await;
                assert!(matches!(result, Err(ScopedDbError::Statement(_))));
                assert_eq!(in_body.open_handles(), 1);

                Ok(())
            })
            .await?;
        assert_eq!(stats.open_handles(), 0);
        Ok::<_, ScopedDbError>(())
    })?;
    Ok(())
}

#[test]
fn mapper_failure_propagates_and_closes_handles() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let (manager, stats) = recording_manager();
        let result: Result<Vec<i32>, _> = manager
            .with_connection(|exec| async move {
                exec.execute("CREATE TABLE t (id INT)").await?;
                exec.insert("INSERT INTO t VALUES (1)").await?;
                exec.query_rows("SELECT id FROM t", |_row| {
                    Err(ScopedDbError::Mapping("mapper rejected row".into()))
                })
                .await
            })
            .await;
        assert!(matches!(result, Err(ScopedDbError::Mapping(_))));
        assert_eq!(stats.open_handles(), 0);
        assert_eq!(stats.cursors_opened.load(Ordering::SeqCst), 1);
        assert_eq!(stats.cursors_closed.load(Ordering::SeqCst), 1);
        Ok::<_, ScopedDbError>(())
    })?;
    Ok(())
}
