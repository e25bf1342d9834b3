//! SQL capability boundary
//!
//! The lifecycle manager only needs four things from a SQL client: open a handle
//! from a connection string, ping it, execute a statement, and close it.
//! `PostgresDriver` provides them on top of `tokio-postgres`; tests plug in
//! their own drivers.

use crate::{Error, Result};
use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_postgres::NoTls;

/// Opens database handles
#[async_trait]
pub trait SqlDriver: Send + Sync + 'static {
    /// Live handle type
    type Handle: SqlHandle;

    /// Open a new handle from a libpq-style keyword/value connection string
    async fn open(&self, dsn: &str) -> Result<Self::Handle>;
}

/// A live database handle, usable concurrently through `&self`
#[async_trait]
pub trait SqlHandle: Send + Sync + 'static {
    /// Cheap health probe
    async fn ping(&self) -> Result<()>;

    /// Execute one statement (or one procedural body) without parameters
    async fn exec(&self, statement: &str) -> Result<()>;

    /// Release the handle
    async fn close(&self) -> Result<()>;
}

/// Postgres/YSQL driver backed by `tokio-postgres`
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDriver;

/// `tokio-postgres` client plus the task driving its socket
pub struct PostgresHandle {
    client: tokio_postgres::Client,
    driver_task: JoinHandle<()>,
}

impl std::fmt::Debug for PostgresHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresHandle")
            .field("closed", &self.client.is_closed())
            .finish()
    }
}

#[async_trait]
impl SqlDriver for PostgresDriver {
    type Handle = PostgresHandle;

    async fn open(&self, dsn: &str) -> Result<PostgresHandle> {
        let (client, connection) = tokio_postgres::connect(dsn, NoTls).await?;

        let driver_task = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::debug!(error = %e, "postgres connection task ended");
            }
        });

        tracing::debug!("postgres handle opened");
        Ok(PostgresHandle {
            client,
            driver_task,
        })
    }
}

#[async_trait]
impl SqlHandle for PostgresHandle {
    async fn ping(&self) -> Result<()> {
        if self.client.is_closed() {
            return Err(Error::Connection("connection closed".into()));
        }
        self.client.simple_query("SELECT 1").await?;
        Ok(())
    }

    async fn exec(&self, statement: &str) -> Result<()> {
        // Simple query protocol: procedural bodies go through as one message
        self.client.batch_execute(statement).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.driver_task.abort();
        Ok(())
    }
}

impl Drop for PostgresHandle {
    fn drop(&mut self) {
        self.driver_task.abort();
    }
}
