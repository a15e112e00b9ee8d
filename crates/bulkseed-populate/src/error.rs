//! Error types for staging, loading and the batch pipeline.

use bulkseed_generator::KeyGenerationError;
use std::path::PathBuf;
use thiserror::Error;

/// Failure writing a staging file.
#[derive(Error, Debug)]
pub enum StagingError {
    /// Creating or writing the file failed.
    #[error("IO error on staging file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serializing a record failed.
    #[error("CSV error on staging file {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Failure moving staged rows into the store, or committing them.
#[derive(Error, Debug)]
pub enum LoadError {
    /// PostgreSQL connection or query error.
    #[error("PostgreSQL error: {0}")]
    PostgreSQL(#[from] tokio_postgres::Error),

    /// Reading the staging file failed mid-stream.
    #[error("IO error reading staged rows: {0}")]
    Io(#[from] std::io::Error),

    /// The store refused the rows.
    #[error("Store rejected rows for '{table}': {reason}")]
    Rejected { table: String, reason: String },

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),
}

/// Errors surfaced by the populate pipeline.
#[derive(Error, Debug)]
pub enum PopulateError {
    /// Unique keys ran out; fatal for the whole run.
    #[error("Key generation error: {0}")]
    KeyGeneration(#[from] KeyGenerationError),

    #[error("Staging error: {0}")]
    Staging(#[from] StagingError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// One batch failed; carries the batch ordinal.
    #[error("Batch {batch_id} failed: {source}")]
    Batch {
        batch_id: u64,
        #[source]
        source: Box<PopulateError>,
    },

    /// A worker task panicked or was aborted.
    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// The worker pool's semaphore was closed.
    #[error("Worker pool closed: {0}")]
    Permit(#[from] tokio::sync::AcquireError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PopulateError {
    pub fn in_batch(self, batch_id: u64) -> Self {
        PopulateError::Batch {
            batch_id,
            source: Box::new(self),
        }
    }

    /// Ordinal of the failed batch, if this error belongs to one.
    pub fn batch_id(&self) -> Option<u64> {
        match self {
            PopulateError::Batch { batch_id, .. } => Some(*batch_id),
            _ => None,
        }
    }
}
