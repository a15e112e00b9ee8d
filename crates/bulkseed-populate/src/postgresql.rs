//! PostgreSQL store backed by `tokio-postgres` and `COPY ... FROM STDIN`.

use crate::error::LoadError;
use crate::store::{copy_statement, quote_ident, RowReader, Store, StoreTransaction};
use async_trait::async_trait;
use futures::SinkExt;
use futures::StreamExt;
use std::pin::pin;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, Config, NoTls};
use tokio_util::io::ReaderStream;
use tracing::{debug, error};

/// Opens a fresh PostgreSQL connection per transaction.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    config: Config,
}

impl PostgresStore {
    /// Parse a connection string (key/value or `postgresql://` URL form).
    ///
    /// # Example
    ///
    /// ```ignore
    /// let store = PostgresStore::new("host=localhost user=postgres password=postgres dbname=performance_study")?;
    /// ```
    pub fn new(connection_string: &str) -> Result<Self, LoadError> {
        let config = connection_string
            .parse::<Config>()
            .map_err(|e| LoadError::Connection(format!("invalid connection string: {e}")))?;
        Ok(Self { config })
    }

    async fn connect(&self) -> Result<(Client, JoinHandle<()>), LoadError> {
        let (client, connection) = self.config.connect(NoTls).await?;

        // Spawn the connection task
        let handle = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("PostgreSQL connection error: {}", e);
            }
        });

        Ok((client, handle))
    }

    /// Check that the server is reachable.
    pub async fn ping(&self) -> Result<(), LoadError> {
        let (client, _handle) = self.connect().await?;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }

    /// Get the row count for a table.
    pub async fn row_count(&self, table: &str) -> Result<u64, LoadError> {
        let (client, _handle) = self.connect().await?;
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        let row = client.query_one(&sql, &[]).await?;
        let count: i64 = row.get(0);
        Ok(count as u64)
    }

    /// Truncate the given tables (delete all rows).
    pub async fn truncate(&self, tables: &[&str]) -> Result<(), LoadError> {
        if tables.is_empty() {
            return Ok(());
        }
        let (client, _handle) = self.connect().await?;
        let sql = format!(
            "TRUNCATE TABLE {}",
            tables
                .iter()
                .map(|t| quote_ident(t))
                .collect::<Vec<_>>()
                .join(", ")
        );
        client.batch_execute(&sql).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, LoadError> {
        let (client, connection) = self.connect().await?;
        client.batch_execute("BEGIN").await?;
        Ok(Box::new(PostgresTransaction { client, connection }))
    }
}

/// A transaction that owns its connection. Dropping it closes the
/// connection, which makes the server roll back anything uncommitted.
pub struct PostgresTransaction {
    client: Client,
    connection: JoinHandle<()>,
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn copy_in(
        &mut self,
        table: &str,
        columns: &[&str],
        rows: RowReader,
    ) -> Result<u64, LoadError> {
        let statement = copy_statement(table, columns);
        debug!("{}", statement);

        let sink = self.client.copy_in(statement.as_str()).await?;
        let mut sink = pin!(sink);
        let mut chunks = ReaderStream::new(rows);

        while let Some(chunk) = chunks.next().await {
            sink.send(chunk?).await?;
        }

        let copied = sink.as_mut().finish().await?;
        Ok(copied)
    }

    async fn commit(self: Box<Self>) -> Result<(), LoadError> {
        self.client.batch_execute("COMMIT").await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), LoadError> {
        self.client.batch_execute("ROLLBACK").await?;
        Ok(())
    }
}

impl Drop for PostgresTransaction {
    fn drop(&mut self) {
        // Closing the socket makes the server roll back an open transaction.
        self.connection.abort();
    }
}
