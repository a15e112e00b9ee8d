//! Pipeline coordinator.
//!
//! Builds the reference pool once, loads it, then fans batches out to a
//! bounded set of workers:
//!
//! ```text
//!   build pool + pairs ──► load pool ──► JoinSet of batch tasks
//!        (blocking)         (one tx)       │  Semaphore(concurrency)
//!                                          ▼
//!                          run_batch(1) … run_batch(total_batches)
//! ```
//!
//! No batch starts before the pool is built; after that the pool is only
//! read. A failed batch rolls back on its own and does not stop the others:
//! every batch runs, every failure is logged, and the first failure is
//! returned once every task has resolved.

use crate::config::PipelineConfig;
use crate::error::PopulateError;
use crate::metrics::{BatchOutcome, RunReport};
use crate::store::Store;
use crate::worker::{load_reference_pool, run_batch, BatchContext};
use bulkseed_generator::{
    build_reference_pool, sample_pairs, BatchGenerator, BatchSpec, KeyGenerationError, KeySpace,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

type TaskResult = Result<BatchOutcome, PopulateError>;

/// Orchestrates a full populate run against one store.
pub struct Pipeline<S: Store> {
    store: Arc<S>,
    config: PipelineConfig,
}

impl<S: Store> Pipeline<S> {
    pub fn new(store: Arc<S>, config: PipelineConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the whole pipeline.
    pub async fn run(&self) -> Result<RunReport, PopulateError> {
        self.config.validate()?;
        let start_time = Instant::now();
        let total_batches = self.config.total_batches();
        check_title_keyspace(total_batches, self.config.batch_size)?;

        let mut report = RunReport {
            batches_total: total_batches,
            ..RunReport::default()
        };

        info!(
            "Generating reference pool of {} persons (seed={})",
            self.config.pool_size, self.config.seed
        );
        let build_start = Instant::now();
        let pool_size = self.config.pool_size;
        let pair_count = self.config.pair_count();
        let seed = self.config.seed;
        let (pool, pairs) = tokio::task::spawn_blocking(move || {
            let mut rng = StdRng::seed_from_u64(seed);
            let pool = build_reference_pool(pool_size, &mut rng)?;
            let pairs = sample_pairs(&pool, pair_count, &mut rng);
            Ok::<_, KeyGenerationError>((pool, pairs))
        })
        .await??;
        let pool = Arc::new(pool);
        let pairs = Arc::new(pairs);
        report.pool_build_duration = build_start.elapsed();
        info!(
            "Reference pool ready: {} persons, {} pairs in {:?}",
            pool.len(),
            pairs.len(),
            report.pool_build_duration
        );

        let layout = self.config.staging_layout();
        if self.config.load_pool {
            let load_start = Instant::now();
            report.persons_loaded =
                load_reference_pool(self.store.as_ref(), Arc::clone(&pool), &layout).await?;
            report.pool_load_duration = load_start.elapsed();
        }

        let ctx = BatchContext {
            generator: BatchGenerator::new(self.config.generator_config(), pool, pairs),
            layout,
            seed,
            total_batches,
        };

        let batch_start = Instant::now();
        let result = self.run_batches(ctx, &mut report).await;
        report.batch_duration = batch_start.elapsed();
        report.total_duration = start_time.elapsed();

        match result {
            Ok(()) => {
                info!(
                    "Population complete: {} titles, {} principals, {} persons in {:?} ({:.2} rows/sec)",
                    report.titles_loaded,
                    report.principals_loaded,
                    report.persons_loaded,
                    report.total_duration,
                    report.rows_per_second()
                );
                Ok(report)
            }
            Err(e) => {
                warn!(
                    "Population failed: {} of {} batches failed, {} committed",
                    report.batches_failed,
                    report.batches_total,
                    report.batches_succeeded
                );
                Err(e)
            }
        }
    }

    async fn run_batches(
        &self,
        ctx: BatchContext,
        report: &mut RunReport,
    ) -> Result<(), PopulateError> {
        let total_batches = ctx.total_batches;
        info!(
            "Starting {} batches of up to {} titles ({} workers)",
            total_batches, self.config.batch_size, self.config.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut tasks: JoinSet<TaskResult> = JoinSet::new();

        for id in 1..=total_batches {
            let spec = BatchSpec::new(id, self.config.batch_len(id));
            let store = Arc::clone(&self.store);
            let ctx = ctx.clone();
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|e| PopulateError::from(e).in_batch(spec.id))?;
                run_batch(store.as_ref(), &ctx, spec).await
            });
        }

        let mut first_error: Option<PopulateError> = None;
        let mut resolved = 0u64;

        while let Some(joined) = tasks.join_next().await {
            resolved += 1;
            let failure = match joined {
                Ok(Ok(outcome)) => {
                    report.record(&outcome);
                    info!(
                        "Batch {} finished: {} titles, {} principals ({}/{})",
                        outcome.batch_id,
                        outcome.titles,
                        outcome.principals,
                        resolved,
                        total_batches
                    );
                    continue;
                }
                Ok(Err(e)) => e,
                Err(e) => PopulateError::from(e),
            };

            report.batches_failed += 1;
            error!("{}", failure);
            if first_error.is_none() {
                first_error = Some(failure);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Fail before any work if some batch partition cannot hold a full batch.
fn check_title_keyspace(total_batches: u64, batch_size: usize) -> Result<(), PopulateError> {
    if total_batches == 0 {
        return Ok(());
    }
    // The last partition is never larger than any other.
    let partition = total_batches - 1;
    let capacity = KeySpace::TITLE.partition_capacity(partition, total_batches);
    if (batch_size as u64) > capacity {
        return Err(KeyGenerationError::Exhausted {
            prefix: KeySpace::TITLE.prefix.to_string(),
            partition,
            capacity,
        }
        .into());
    }
    Ok(())
}
