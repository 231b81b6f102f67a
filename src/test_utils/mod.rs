//! Recording and fault-injecting driver decorator for tests.
//!
//! [`RecordingDriver`] wraps any [`Driver`] and counts every open/close of
//! connections, statements, and cursors, so tests can assert that handle
//! counts return to baseline after each call. Failure switches let tests
//! exercise the commit/rollback/close failure paths without a broken
//! database.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::driver::{Driver, DriverConnection, DriverCursor, DriverStatement};
use crate::error::ScopedDbError;
use crate::manager::DbConfig;
use crate::value::SqlValue;

/// Counters and failure switches shared with a [`RecordingDriver`].
#[derive(Debug, Default)]
pub struct DriverStats {
    pub connections_opened: AtomicUsize,
    pub connections_closed: AtomicUsize,
    pub statements_opened: AtomicUsize,
    pub statements_closed: AtomicUsize,
    pub cursors_opened: AtomicUsize,
    pub cursors_closed: AtomicUsize,
    pub commits: AtomicUsize,
    pub rollbacks: AtomicUsize,
    pub fail_commit: AtomicBool,
    pub fail_rollback: AtomicBool,
    pub fail_close: AtomicBool,
}

impl DriverStats {
    /// Handles opened but not yet closed, across all three kinds.
    pub fn open_handles(&self) -> usize {
        let opened = self.connections_opened.load(Ordering::SeqCst)
            + self.statements_opened.load(Ordering::SeqCst)
            + self.cursors_opened.load(Ordering::SeqCst);
        let closed = self.connections_closed.load(Ordering::SeqCst)
            + self.statements_closed.load(Ordering::SeqCst)
            + self.cursors_closed.load(Ordering::SeqCst);
        opened - closed
    }
}

/// Decorates a driver, recording handle lifecycles into a [`DriverStats`].
pub struct RecordingDriver {
    inner: Arc<dyn Driver>,
    stats: Arc<DriverStats>,
}

impl RecordingDriver {
    pub fn new(inner: Arc<dyn Driver>) -> Self {
        Self {
            inner,
            stats: Arc::new(DriverStats::default()),
        }
    }

    #[must_use]
    pub fn stats(&self) -> Arc<DriverStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait]
impl Driver for RecordingDriver {
    async fn open(&self, config: &DbConfig) -> Result<Arc<dyn DriverConnection>, ScopedDbError> {
        let conn = self.inner.open(config).await?;
        self.stats.connections_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(RecordingConnection {
            inner: conn,
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct RecordingConnection {
    inner: Arc<dyn DriverConnection>,
    stats: Arc<DriverStats>,
}

#[async_trait]
impl DriverConnection for RecordingConnection {
    async fn close(&self) -> Result<(), ScopedDbError> {
        if self.stats.fail_close.load(Ordering::SeqCst) {
            return Err(ScopedDbError::Connection("injected close failure".into()));
        }
        self.inner.close().await?;
        self.stats.connections_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn set_autocommit(&self, enabled: bool) -> Result<(), ScopedDbError> {
        self.inner.set_autocommit(enabled).await
    }

    async fn commit(&self) -> Result<(), ScopedDbError> {
        if self.stats.fail_commit.load(Ordering::SeqCst) {
            return Err(ScopedDbError::Commit("injected commit failure".into()));
        }
        self.inner.commit().await?;
        self.stats.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&self) -> Result<(), ScopedDbError> {
        if self.stats.fail_rollback.load(Ordering::SeqCst) {
            return Err(ScopedDbError::Rollback("injected rollback failure".into()));
        }
        self.inner.rollback().await?;
        self.stats.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn create_statement(&self) -> Result<Box<dyn DriverStatement>, ScopedDbError> {
        let stmt = self.inner.create_statement().await?;
        self.stats.statements_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingStatement {
            inner: stmt,
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct RecordingStatement {
    inner: Box<dyn DriverStatement>,
    stats: Arc<DriverStats>,
}

#[async_trait]
impl DriverStatement for RecordingStatement {
    async fn execute(&mut self, sql: &str) -> Result<bool, ScopedDbError> {
        self.inner.execute(sql).await
    }

    async fn execute_update(&mut self, sql: &str) -> Result<usize, ScopedDbError> {
        self.inner.execute_update(sql).await
    }

    async fn execute_query(&mut self, sql: &str) -> Result<Box<dyn DriverCursor>, ScopedDbError> {
        let cursor = self.inner.execute_query(sql).await?;
        self.stats.cursors_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingCursor {
            inner: cursor,
            stats: Arc::clone(&self.stats),
        }))
    }

    async fn close(&mut self) -> Result<(), ScopedDbError> {
        self.inner.close().await?;
        self.stats.statements_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct RecordingCursor {
    inner: Box<dyn DriverCursor>,
    stats: Arc<DriverStats>,
}

#[async_trait]
impl DriverCursor for RecordingCursor {
    async fn advance(&mut self) -> Result<bool, ScopedDbError> {
        self.inner.advance().await
    }

    fn read(&self, field: &str) -> Result<SqlValue, ScopedDbError> {
        self.inner.read(field)
    }

    async fn close(&mut self) -> Result<(), ScopedDbError> {
        self.inner.close().await?;
        self.stats.cursors_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
