//! Connection lifecycle: open one physical connection per call, hand it to
//! caller logic, and guarantee it is closed on every exit path.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::driver::Driver;
use crate::effect::{Effects, ReleaseGuard, TokioEffects, settle};
use crate::error::ScopedDbError;
use crate::executor::QueryExecutor;

/// Connection credentials. Plain strings; validation is the driver's job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DbConfig {
    /// Driver-specific connection URL (filesystem path, `file:` URI,
    /// `postgres://` URL, ...).
    pub url: String,
    pub username: String,
    pub password: String,
}

impl DbConfig {
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Opens a new physical connection per [`with_connection`] call (no
/// pooling) and scopes its lifetime to the caller-supplied body.
///
/// [`with_connection`]: Self::with_connection
pub struct ConnectionManager {
    driver: Arc<dyn Driver>,
    config: DbConfig,
    effects: Arc<dyn Effects>,
}

impl ConnectionManager {
    /// Manager over an arbitrary driver, deferring cancellation cleanup to
    /// the current tokio runtime. See [`with_effects`](Self::with_effects)
    /// to plug in a different runtime adapter.
    pub fn new(driver: Arc<dyn Driver>, config: DbConfig) -> Self {
        Self {
            driver,
            config,
            effects: Arc::new(TokioEffects),
        }
    }

    /// Swap the runtime adapter used for deferred releases.
    #[must_use]
    pub fn with_effects(mut self, effects: Arc<dyn Effects>) -> Self {
        self.effects = effects;
        self
    }

    /// Manager over an embedded `SQLite` database. The path may be a
    /// filesystem path, `:memory:`, or a `file:` URI.
    #[cfg(feature = "sqlite")]
    pub fn new_sqlite(path: impl Into<String>) -> Self {
        Self::new(
            Arc::new(crate::sqlite::SqliteDriver),
            DbConfig::new(path, "", ""),
        )
    }

    /// Manager over a Postgres server.
    #[cfg(feature = "postgres")]
    pub fn new_postgres(config: DbConfig) -> Self {
        Self::new(Arc::new(crate::postgres::PostgresDriver), config)
    }

    /// Open a connection, hand a [`QueryExecutor`] bound to it to `body`,
    /// and close the connection once `body` finishes, fails, or is
    /// cancelled.
    ///
    /// # Errors
    /// A connection-open failure surfaces as [`ScopedDbError::Connection`];
    /// a body failure surfaces as-is (close still runs, a close failure is
    /// then only logged); a close failure after a successful body surfaces
    /// as [`ScopedDbError::Connection`].
    pub async fn with_connection<T, F, Fut>(&self, body: F) -> Result<T, ScopedDbError>
    where
        F: FnOnce(QueryExecutor) -> Fut,
        Fut: Future<Output = Result<T, ScopedDbError>>,
    {
        let conn = self.driver.open(&self.config).await?;
        debug!(url = %self.config.url, "connection opened");
        let guard = ReleaseGuard::new(
            Arc::clone(&conn),
            Arc::clone(&self.effects),
            |conn, _exit| async move { conn.close().await },
        );
        let executor = QueryExecutor::new(conn, Arc::clone(&self.effects));
        let outcome = body(executor).await;
        settle(guard, outcome).await
    }
}
