//! Store abstraction used by the loader.
//!
//! A [`Store`] hands out one transaction per call, each on its own
//! connection. Workers never share a transaction.

use crate::error::LoadError;
use async_trait::async_trait;
use tokio::io::AsyncRead;

/// Byte stream of staged CSV rows, header first.
pub type RowReader = Box<dyn AsyncRead + Send + Unpin>;

/// Connection factory for the target store.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Open a dedicated connection and start a transaction on it.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, LoadError>;
}

/// One open transaction. Dropping it without [`commit`](Self::commit) aborts it.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Bulk-copy CSV rows into `table`, restricted to `columns`.
    ///
    /// Returns the number of rows the store accepted.
    async fn copy_in(
        &mut self,
        table: &str,
        columns: &[&str],
        rows: RowReader,
    ) -> Result<u64, LoadError>;

    async fn commit(self: Box<Self>) -> Result<(), LoadError>;

    async fn rollback(self: Box<Self>) -> Result<(), LoadError>;
}

/// `"col"` with embedded quotes doubled.
pub(crate) fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// `COPY` statement reading CSV with a header row from stdin.
pub fn copy_statement(table: &str, columns: &[&str]) -> String {
    format!(
        "COPY {} ({}) FROM STDIN WITH (FORMAT csv, HEADER true)",
        quote_ident(table),
        columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ")
    )
}
