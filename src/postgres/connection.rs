use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_postgres::{Client, NoTls};
use tracing::warn;

use crate::driver::{Driver, DriverConnection, DriverStatement};
use crate::error::ScopedDbError;
use crate::manager::DbConfig;

use super::query::PostgresStatement;

pub(crate) type SharedClient = Arc<Mutex<Option<Client>>>;

/// Opens connections to a Postgres server. The url is a `postgres://` URL
/// or key-value connection string; explicit username/password override
/// whatever the url carries.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDriver;

#[async_trait]
impl Driver for PostgresDriver {
    async fn open(&self, config: &DbConfig) -> Result<Arc<dyn DriverConnection>, ScopedDbError> {
        let mut pg_config = config.url.parse::<tokio_postgres::Config>().map_err(|e| {
            ScopedDbError::Connection(format!("invalid postgres url '{}': {e}", config.url))
        })?;
        if !config.username.is_empty() {
            pg_config.user(&config.username);
        }
        if !config.password.is_empty() {
            pg_config.password(&config.password);
        }
        let (client, connection) = pg_config
            .connect(NoTls)
            .await
            .map_err(|e| ScopedDbError::Connection(format!("failed to connect: {e}")))?;
        // The connection task ends on its own once the client is dropped.
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                warn!(error = %err, "postgres connection task failed");
            }
        });
        Ok(Arc::new(PostgresConnection {
            client: Arc::new(Mutex::new(Some(client))),
        }))
    }
}

/// A live Postgres session.
pub struct PostgresConnection {
    client: SharedClient,
}

impl PostgresConnection {
    async fn batch(
        &self,
        sql: &str,
        wrap: impl FnOnce(String) -> ScopedDbError + Send,
    ) -> Result<(), ScopedDbError> {
        let guard = self.client.lock().await;
        let client = guard
            .as_ref()
            .ok_or_else(|| ScopedDbError::Connection("connection is closed".into()))?;
        client.batch_execute(sql).await.map_err(|e| wrap(e.to_string()))
    }
}

#[async_trait]
impl DriverConnection for PostgresConnection {
    async fn close(&self) -> Result<(), ScopedDbError> {
        // Dropping the client terminates the connection task; closing twice
        // is a no-op.
        self.client.lock().await.take();
        Ok(())
    }

    async fn set_autocommit(&self, enabled: bool) -> Result<(), ScopedDbError> {
        if enabled {
            // COMMIT/ROLLBACK already returned the session to autocommit.
            return Ok(());
        }
        self.batch("BEGIN", |e| {
            ScopedDbError::Statement(format!("failed to begin transaction: {e}"))
        })
        .await
    }

    async fn commit(&self) -> Result<(), ScopedDbError> {
        self.batch("COMMIT", ScopedDbError::Commit).await
    }

    async fn rollback(&self) -> Result<(), ScopedDbError> {
        self.batch("ROLLBACK", ScopedDbError::Rollback).await
    }

    async fn create_statement(&self) -> Result<Box<dyn DriverStatement>, ScopedDbError> {
        if self.client.lock().await.is_none() {
            return Err(ScopedDbError::Statement(
                "cannot create a statement on a closed connection".into(),
            ));
        }
        Ok(Box::new(PostgresStatement::new(Arc::clone(&self.client))))
    }
}
