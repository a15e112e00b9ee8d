//! CSV staging files.
//!
//! Every (batch, table) pair gets its own file, named by [`StagingLayout`].
//! A [`StagingFile`] owns its path and removes the file when dropped, so the
//! file goes away whether the load that consumes it succeeds or fails.

use crate::error::StagingError;
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default buffer size for CSV writing.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Naming strategy for staging files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingLayout {
    dir: PathBuf,
    prefix: String,
}

impl StagingLayout {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `{dir}/{prefix}_{table}_{batch}.csv`
    pub fn path_for(&self, batch_id: u64, table: &str) -> PathBuf {
        self.dir
            .join(format!("{}_{}_{}.csv", self.prefix, table, batch_id))
    }
}

/// A staging file on disk, deleted when this guard is dropped.
#[derive(Debug)]
pub struct StagingFile {
    path: PathBuf,
    rows: u64,
}

impl StagingFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of data rows, header excluded.
    pub fn rows(&self) -> u64 {
        self.rows
    }
}

impl Drop for StagingFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed staging file {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove staging file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// Write `records` to `path` as CSV with `columns` as the header row.
///
/// Any existing file at `path` is truncated. `None` fields are written as
/// empty unquoted values, which PostgreSQL's CSV `COPY` reads as NULL.
pub fn write_staging_file<T: Serialize>(
    path: &Path,
    records: &[T],
    columns: &[&str],
) -> Result<StagingFile, StagingError> {
    let io_err = |source| StagingError::Io {
        path: path.to_path_buf(),
        source,
    };
    let csv_err = |source| StagingError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_err)?;
    let mut staging = StagingFile {
        path: path.to_path_buf(),
        rows: 0,
    };

    let buf_writer = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file);
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(buf_writer);

    writer.write_record(columns).map_err(csv_err)?;
    for record in records {
        writer.serialize(record).map_err(csv_err)?;
        staging.rows += 1;
    }
    writer.flush().map_err(io_err)?;

    debug!(
        "Staged {} rows into {}",
        staging.rows,
        staging.path.display()
    );
    Ok(staging)
}
