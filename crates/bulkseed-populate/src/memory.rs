//! In-process store for dry runs and tests.
//!
//! Rows are parsed back out of the staged CSV, so a dry run exercises the
//! same staging and loading path as a real load. Committed rows are kept per
//! table; uncommitted rows vanish with their transaction.

use crate::error::LoadError;
use crate::store::{RowReader, Store, StoreTransaction};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::sync::Mutex;

type Rows = Vec<csv::StringRecord>;

#[derive(Debug, Default)]
struct Shared {
    tables: Mutex<HashMap<String, Rows>>,
    open: AtomicUsize,
    peak_open: AtomicUsize,
    copies: AtomicU64,
    commits: AtomicU64,
    rollbacks: AtomicU64,
    fail_table: Option<String>,
    fail_copy_at: Option<u64>,
}

/// Store that keeps committed rows in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every copy into `table`.
    pub fn with_rejected_table(table: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(Shared {
                fail_table: Some(table.into()),
                ..Shared::default()
            }),
        }
    }

    /// Fail the `n`-th copy issued against this store (1-based).
    pub fn with_copy_failure_at(n: u64) -> Self {
        Self {
            shared: Arc::new(Shared {
                fail_copy_at: Some(n),
                ..Shared::default()
            }),
        }
    }

    /// Committed rows in `table`.
    pub async fn rows(&self, table: &str) -> Rows {
        self.shared
            .tables
            .lock()
            .await
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn row_count(&self, table: &str) -> u64 {
        self.shared
            .tables
            .lock()
            .await
            .get(table)
            .map_or(0, |rows| rows.len() as u64)
    }

    /// Transactions currently open.
    pub fn open_transactions(&self) -> usize {
        self.shared.open.load(Ordering::SeqCst)
    }

    /// Highest number of transactions that were open at the same time.
    pub fn peak_open_transactions(&self) -> usize {
        self.shared.peak_open.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> u64 {
        self.shared.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> u64 {
        self.shared.rollbacks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, LoadError> {
        let open = self.shared.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.peak_open.fetch_max(open, Ordering::SeqCst);
        Ok(Box::new(MemoryTransaction {
            shared: Arc::clone(&self.shared),
            pending: HashMap::new(),
            finished: false,
        }))
    }
}

struct MemoryTransaction {
    shared: Arc<Shared>,
    pending: HashMap<String, Rows>,
    finished: bool,
}

impl MemoryTransaction {
    fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            self.shared.open.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

fn rejected(table: &str, reason: impl Into<String>) -> LoadError {
    LoadError::Rejected {
        table: table.to_string(),
        reason: reason.into(),
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn copy_in(
        &mut self,
        table: &str,
        columns: &[&str],
        mut rows: RowReader,
    ) -> Result<u64, LoadError> {
        let copy_number = self.shared.copies.fetch_add(1, Ordering::SeqCst) + 1;
        if self.shared.fail_copy_at == Some(copy_number) {
            return Err(rejected(table, format!("injected failure on copy {copy_number}")));
        }
        if self.shared.fail_table.as_deref() == Some(table) {
            return Err(rejected(table, "table rejects all rows"));
        }

        let mut buf = Vec::new();
        rows.read_to_end(&mut buf).await?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(buf.as_slice());

        let header = reader
            .headers()
            .map_err(|e| rejected(table, e.to_string()))?
            .clone();
        if header.iter().ne(columns.iter().copied()) {
            return Err(rejected(
                table,
                format!("header {header:?} does not match columns {columns:?}"),
            ));
        }

        let mut parsed = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| rejected(table, e.to_string()))?;
            if record.len() != columns.len() {
                return Err(rejected(
                    table,
                    format!("expected {} fields, got {}", columns.len(), record.len()),
                ));
            }
            parsed.push(record);
        }

        let copied = parsed.len() as u64;
        self.pending
            .entry(table.to_string())
            .or_default()
            .extend(parsed);
        Ok(copied)
    }

    async fn commit(mut self: Box<Self>) -> Result<(), LoadError> {
        let pending = std::mem::take(&mut self.pending);
        {
            let mut tables = self.shared.tables.lock().await;
            for (table, rows) in pending {
                tables.entry(table).or_default().extend(rows);
            }
        }
        self.shared.commits.fetch_add(1, Ordering::SeqCst);
        self.finish();
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), LoadError> {
        self.pending.clear();
        self.shared.rollbacks.fetch_add(1, Ordering::SeqCst);
        self.finish();
        Ok(())
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        self.finish();
    }
}
