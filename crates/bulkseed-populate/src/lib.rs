//! Concurrent staged bulk loader for bulkseed.
//!
//! Splits a target number of titles into fixed-size batches and loads each
//! batch through CSV staging files and a bulk `COPY`, one transaction per
//! batch, with at most `concurrency` batches in flight.
//!
//! # Example
//!
//! ```ignore
//! use bulkseed_populate::{Pipeline, PipelineConfig, PostgresStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(PostgresStore::new("host=localhost user=postgres dbname=performance_study")?);
//! let config = PipelineConfig::new(20_000_000).with_concurrency(24);
//! let report = Pipeline::new(store, config).run().await?;
//! println!("{} titles loaded", report.titles_loaded);
//! ```

pub mod args;
pub mod config;
mod error;
pub mod loader;
pub mod memory;
mod metrics;
pub mod pipeline;
pub mod postgresql;
pub mod staging;
pub mod store;
pub mod worker;

pub use args::{CommonPopulateArgs, DryRunPopulateArgs, PostgreSQLPopulateArgs};
pub use config::PipelineConfig;
pub use error::{LoadError, PopulateError, StagingError};
pub use memory::MemoryStore;
pub use metrics::{BatchOutcome, RunReport};
pub use pipeline::Pipeline;
pub use postgresql::PostgresStore;
pub use staging::{write_staging_file, StagingFile, StagingLayout};
pub use store::{Store, StoreTransaction};
