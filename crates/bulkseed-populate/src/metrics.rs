//! Run metrics.

use std::time::Duration;

/// Rows loaded by one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub batch_id: u64,
    pub titles: u64,
    pub principals: u64,
}

/// Metrics from a populate run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Number of batches the run was split into.
    pub batches_total: u64,
    pub batches_succeeded: u64,
    pub batches_failed: u64,
    pub persons_loaded: u64,
    pub titles_loaded: u64,
    pub principals_loaded: u64,
    /// Time spent generating the reference pool and pair set.
    pub pool_build_duration: Duration,
    /// Time spent loading the reference pool.
    pub pool_load_duration: Duration,
    /// Time spent in the batch phase.
    pub batch_duration: Duration,
    /// Total time taken.
    pub total_duration: Duration,
}

impl RunReport {
    pub(crate) fn record(&mut self, outcome: &BatchOutcome) {
        self.batches_succeeded += 1;
        self.titles_loaded += outcome.titles;
        self.principals_loaded += outcome.principals;
    }

    pub fn rows_loaded(&self) -> u64 {
        self.persons_loaded + self.titles_loaded + self.principals_loaded
    }

    /// Calculate rows per second.
    pub fn rows_per_second(&self) -> f64 {
        if self.total_duration.as_secs_f64() > 0.0 {
            self.rows_loaded() as f64 / self.total_duration.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn is_success(&self) -> bool {
        self.batches_failed == 0 && self.batches_succeeded == self.batches_total
    }
}
