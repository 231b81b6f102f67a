#![cfg(feature = "sqlite")]

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::task::noop_waker;
use sql_scoped::prelude::*;
use sql_scoped::test_utils::{DriverStats, RecordingDriver};
use tokio::runtime::Runtime;

fn recording_manager(url: &str) -> (ConnectionManager, Arc<DriverStats>) {
    let driver = RecordingDriver::new(Arc::new(SqliteDriver));
    let stats = driver.stats();
    let manager = ConnectionManager::new(Arc::new(driver), DbConfig::new(url, "", ""));
    (manager, stats)
}

/// Dropping an in-flight transaction rolls back before control returns to
/// the canceller. `BlockingEffects` runs the deferred releases in place, so
/// the assertion right after `drop` is deterministic.
#[test]
fn dropped_transaction_rolls_back_under_blocking_effects()
-> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("cancel.db").to_string_lossy().to_string();
    let (manager, stats) = recording_manager(&path);
    let manager = manager.with_effects(Arc::new(BlockingEffects));

    futures::executor::block_on(async {
        manager
            .with_connection(|exec| async move {
                exec.execute("CREATE TABLE t (id INT)").await?;
                Ok(())
            })
            .await
    })?;

    {
        let fut = manager.with_connection(|exec| async move {
            exec.transaction(|tx| async move {
                tx.insert("INSERT INTO t VALUES (1)").await?;
                // Never completes; the test cancels us here.
                futures::future::pending::<()>().await;
                Ok(())
            })
            .await
        });
        let mut fut = Box::pin(fut);
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        assert!(matches!(fut.as_mut().poll(&mut cx), Poll::Pending));
        drop(fut);
    }

    assert_eq!(stats.rollbacks.load(Ordering::SeqCst), 1);
    assert_eq!(stats.commits.load(Ordering::SeqCst), 0);
    assert_eq!(stats.open_handles(), 0);

    let ids = futures::executor::block_on(async {
        manager
            .with_connection(|exec| async move {
                exec.query_rows("SELECT id FROM t", |row| row.int("id")).await
            })
            .await
    })?;
    assert!(ids.is_empty());
    Ok(())
}

/// The same property under tokio: aborting the task that runs the
/// transaction fires the rollback on a spawned cleanup task.
#[test]
fn aborted_transaction_rolls_back_under_tokio() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("abort.db").to_string_lossy().to_string();
    rt.block_on(async {
        let (manager, stats) = recording_manager(&path);
        let manager = Arc::new(manager);

        manager
            .with_connection(|exec| async move {
                exec.execute("CREATE TABLE t (id INT)").await?;
                Ok(())
            })
            .await?;

        let task_manager = Arc::clone(&manager);
        let handle = tokio::spawn(async move {
            task_manager
                .with_connection(|exec| async move {
                    exec.transaction(|tx| async move {
                        tx.insert("INSERT INTO t VALUES (1)").await?;
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        Ok(())
                    })
                    .await
                })
                .await
        });

        // Let the task reach the sleep inside the transaction body.
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.abort();
        let joined = handle.await;
        assert!(joined.is_err());

        // Give the spawned rollback and close a moment to run. Their
        // relative order is up to the scheduler, but either way the insert
        // must never become visible.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(stats.commits.load(Ordering::SeqCst), 0);

        let ids = manager
            .with_connection(|exec| async move {
                exec.query_rows("SELECT id FROM t", |row| row.int("id")).await
            })
            .await?;
        assert!(ids.is_empty());
        Ok::<_, ScopedDbError>(())
    })?;
    Ok(())
}
