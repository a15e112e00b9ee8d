//! Pipeline configuration.

use crate::error::PopulateError;
use crate::staging::StagingLayout;
use bulkseed_generator::{GeneratorConfig, KeySpace};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for one populate run.
///
/// Every field has a default, so a YAML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of titles to generate across all batches.
    pub total_units: u64,
    /// Titles per batch.
    pub batch_size: usize,
    /// Maximum number of batches loading at the same time.
    pub concurrency: usize,
    /// Persons in the reference pool.
    pub pool_size: usize,
    /// Forced pairs to sample; `pool_size / 2` when unset.
    pub pair_count: Option<usize>,
    /// Share of titles per batch that start with a forced pair.
    pub forced_pair_fraction: f64,
    /// Minimum randomly drawn principals per title.
    pub min_associations: u32,
    /// Maximum randomly drawn principals per title (inclusive).
    pub max_associations: u32,
    /// Random seed for deterministic generation (same seed = same data).
    pub seed: u64,
    /// Directory for staging files; the system temp dir when unset.
    pub staging_dir: Option<PathBuf>,
    /// File name prefix for staging files.
    pub staging_prefix: String,
    /// Whether to load the reference pool into the store before batches start.
    pub load_pool: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            total_units: 0,
            batch_size: 1000,
            concurrency: 24,
            pool_size: 100_000,
            pair_count: None,
            forced_pair_fraction: 0.1,
            min_associations: 10,
            max_associations: 50,
            seed: 42,
            staging_dir: None,
            staging_prefix: "bulkseed".to_string(),
            load_pool: true,
        }
    }
}

impl PipelineConfig {
    /// Create a configuration for `total_units` titles with default settings.
    pub fn new(total_units: u64) -> Self {
        Self {
            total_units,
            ..Self::default()
        }
    }

    /// Load settings from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, PopulateError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PopulateError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, PopulateError> {
        serde_yaml::from_str(yaml).map_err(|e| PopulateError::Config(e.to_string()))
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    pub fn with_load_pool(mut self, load_pool: bool) -> Self {
        self.load_pool = load_pool;
        self
    }

    /// `ceil(total_units / batch_size)`.
    pub fn total_batches(&self) -> u64 {
        if self.batch_size == 0 {
            return 0;
        }
        self.total_units.div_ceil(self.batch_size as u64)
    }

    /// Number of titles in batch `id` (1-based); the last batch takes the remainder.
    pub fn batch_len(&self, id: u64) -> usize {
        let start = id.saturating_sub(1) * self.batch_size as u64;
        self.total_units
            .saturating_sub(start)
            .min(self.batch_size as u64) as usize
    }

    pub fn pair_count(&self) -> usize {
        self.pair_count.unwrap_or(self.pool_size / 2)
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            forced_pair_fraction: self.forced_pair_fraction,
            min_associations: self.min_associations,
            max_associations: self.max_associations,
        }
    }

    /// Where staging files go.
    ///
    /// Without a `staging_dir` the files land in the shared system temp dir,
    /// so the prefix gains the process id to keep concurrent runs apart.
    pub fn staging_layout(&self) -> StagingLayout {
        match &self.staging_dir {
            Some(dir) => StagingLayout::new(dir.clone(), self.staging_prefix.clone()),
            None => StagingLayout::new(
                std::env::temp_dir(),
                format!("{}_{}", self.staging_prefix, std::process::id()),
            ),
        }
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), PopulateError> {
        let invalid = |msg: String| Err(PopulateError::Config(msg));

        if self.batch_size == 0 {
            return invalid("batch_size must be greater than 0".to_string());
        }
        if self.concurrency == 0 {
            return invalid("concurrency must be greater than 0".to_string());
        }
        if self.pool_size == 0 {
            return invalid("pool_size must be greater than 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.forced_pair_fraction) {
            return invalid(format!(
                "forced_pair_fraction must be within [0, 1], got {}",
                self.forced_pair_fraction
            ));
        }
        if self.min_associations > self.max_associations {
            return invalid(format!(
                "min_associations ({}) exceeds max_associations ({})",
                self.min_associations, self.max_associations
            ));
        }
        if self.max_associations > GeneratorConfig::MAX_ASSOCIATIONS {
            return invalid(format!(
                "max_associations {} exceeds the limit of {}",
                self.max_associations,
                GeneratorConfig::MAX_ASSOCIATIONS
            ));
        }
        if self.forced_pair_fraction > 0.0 && self.pair_count() == 0 {
            return invalid(format!(
                "forced_pair_fraction is {} but there are no pairs to force (pair_count 0)",
                self.forced_pair_fraction
            ));
        }
        if self.pool_size as u64 > KeySpace::PERSON.capacity() {
            return invalid(format!(
                "pool_size {} exceeds the {} available person keys",
                self.pool_size,
                KeySpace::PERSON.capacity()
            ));
        }
        Ok(())
    }
}
