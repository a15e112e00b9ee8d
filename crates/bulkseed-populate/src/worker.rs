//! Batch worker: generate, stage, load and commit one batch.
//!
//! Each call owns its transaction and its two staging files. The only state
//! shared with other workers is the read-only pool and pair set inside the
//! [`BatchGenerator`].

use crate::error::PopulateError;
use crate::loader::load_staging_file;
use crate::metrics::BatchOutcome;
use crate::staging::{write_staging_file, StagingFile, StagingLayout};
use crate::store::{Store, StoreTransaction};
use bulkseed_generator::{
    batch_seed, BatchGenerator, BatchSpec, Person, Principal, ReferencePool, TableRecord, Title,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Ordinal used for the reference pool's staging file.
pub const POOL_BATCH_ID: u64 = 0;

/// Everything a worker needs besides the store. Cheap to clone.
#[derive(Debug, Clone)]
pub struct BatchContext {
    pub generator: BatchGenerator,
    pub layout: StagingLayout,
    pub seed: u64,
    pub total_batches: u64,
}

struct StagedBatch {
    titles: StagingFile,
    principals: StagingFile,
}

impl BatchContext {
    /// Generate the batch and write both staging files.
    fn stage(&self, spec: BatchSpec) -> Result<StagedBatch, PopulateError> {
        let mut rng = StdRng::seed_from_u64(batch_seed(self.seed, spec.id));
        let batch = self.generator.generate(spec, self.total_batches, &mut rng)?;
        debug!(
            "Batch {} generated: {} titles, {} principals",
            spec.id,
            batch.titles.len(),
            batch.principals.len()
        );

        let titles = write_staging_file(
            &self.layout.path_for(spec.id, Title::TABLE),
            &batch.titles,
            Title::COLUMNS,
        )?;
        let principals = write_staging_file(
            &self.layout.path_for(spec.id, Principal::TABLE),
            &batch.principals,
            Principal::COLUMNS,
        )?;
        Ok(StagedBatch { titles, principals })
    }
}

/// Run one batch end to end. Errors carry the batch ordinal.
pub async fn run_batch<S: Store + ?Sized>(
    store: &S,
    ctx: &BatchContext,
    spec: BatchSpec,
) -> Result<BatchOutcome, PopulateError> {
    run_batch_inner(store, ctx, spec)
        .await
        .map_err(|e| e.in_batch(spec.id))
}

async fn run_batch_inner<S: Store + ?Sized>(
    store: &S,
    ctx: &BatchContext,
    spec: BatchSpec,
) -> Result<BatchOutcome, PopulateError> {
    info!("Starting data generation for batch {}", spec.id);
    let staged = {
        let ctx = ctx.clone();
        tokio::task::spawn_blocking(move || ctx.stage(spec)).await??
    };

    info!("Data generated for batch {}, starting insertion", spec.id);
    let mut tx = store.begin().await?;
    let loaded = load_batch(tx.as_mut(), staged).await;
    let (titles, principals) = finish(tx, loaded).await?;

    info!("Batch {} committed", spec.id);
    Ok(BatchOutcome {
        batch_id: spec.id,
        titles,
        principals,
    })
}

async fn load_batch(
    tx: &mut dyn StoreTransaction,
    staged: StagedBatch,
) -> Result<(u64, u64), PopulateError> {
    let StagedBatch { titles, principals } = staged;
    let titles = load_staging_file(titles, Title::TABLE, Title::COLUMNS, tx).await?;
    let principals = load_staging_file(principals, Principal::TABLE, Principal::COLUMNS, tx).await?;
    Ok((titles, principals))
}

/// Commit on success, roll back on failure.
async fn finish<T>(
    tx: Box<dyn StoreTransaction>,
    loaded: Result<T, PopulateError>,
) -> Result<T, PopulateError> {
    match loaded {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!("Rollback failed: {}", rollback_err);
            }
            Err(e)
        }
    }
}

/// Stage and load the reference pool in its own transaction.
pub async fn load_reference_pool<S: Store + ?Sized>(
    store: &S,
    pool: Arc<ReferencePool>,
    layout: &StagingLayout,
) -> Result<u64, PopulateError> {
    info!("Starting insertion of {} persons into {}", pool.len(), Person::TABLE);

    let path = layout.path_for(POOL_BATCH_ID, Person::TABLE);
    let staging = tokio::task::spawn_blocking(move || {
        write_staging_file(&path, pool.persons(), Person::COLUMNS)
    })
    .await??;

    let mut tx = store.begin().await?;
    let loaded = load_staging_file(staging, Person::TABLE, Person::COLUMNS, tx.as_mut())
        .await
        .map_err(PopulateError::from);
    let persons = finish(tx, loaded).await?;

    info!("Person insertion completed: {} rows", persons);
    Ok(persons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use bulkseed_generator::{build_reference_pool, sample_pairs, GeneratorConfig};
    use tempfile::TempDir;

    fn context(dir: &TempDir, total_batches: u64) -> BatchContext {
        let mut rng = StdRng::seed_from_u64(42);
        let pool = Arc::new(build_reference_pool(300, &mut rng).unwrap());
        let pairs = Arc::new(sample_pairs(&pool, 150, &mut rng));
        BatchContext {
            generator: BatchGenerator::new(GeneratorConfig::default(), pool, pairs),
            layout: StagingLayout::new(dir.path(), "test"),
            seed: 42,
            total_batches,
        }
    }

    fn staging_files(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    #[tokio::test]
    async fn test_batch_commits_both_tables() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, 1);
        let store = MemoryStore::new();

        let outcome = run_batch(&store, &ctx, BatchSpec::new(1, 40)).await.unwrap();

        assert_eq!(outcome.titles, 40);
        assert_eq!(store.row_count(Title::TABLE).await, 40);
        assert_eq!(store.row_count(Principal::TABLE).await, outcome.principals);
        assert!(outcome.principals >= 40 * 10);
        assert_eq!(store.commits(), 1);
        assert_eq!(staging_files(&dir), 0);
    }

    #[tokio::test]
    async fn test_failed_batch_rolls_back_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, 1);
        let store = MemoryStore::with_rejected_table(Principal::TABLE);

        let err = run_batch(&store, &ctx, BatchSpec::new(1, 20))
            .await
            .unwrap_err();

        assert_eq!(err.batch_id(), Some(1));
        assert_eq!(store.row_count(Title::TABLE).await, 0);
        assert_eq!(store.rollbacks(), 1);
        assert_eq!(store.open_transactions(), 0);
        assert_eq!(staging_files(&dir), 0);
    }

    #[tokio::test]
    async fn test_first_load_failure_removes_second_file() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, 1);
        let store = MemoryStore::with_rejected_table(Title::TABLE);

        assert!(run_batch(&store, &ctx, BatchSpec::new(1, 5)).await.is_err());
        assert_eq!(staging_files(&dir), 0);
    }

    #[tokio::test]
    async fn test_staging_failure_is_reported_with_batch() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir, 1);
        ctx.layout = StagingLayout::new(dir.path().join("missing"), "test");
        let store = MemoryStore::new();

        let err = run_batch(&store, &ctx, BatchSpec::new(1, 5)).await.unwrap_err();
        match err {
            PopulateError::Batch { batch_id, source } => {
                assert_eq!(batch_id, 1);
                assert!(matches!(*source, PopulateError::Staging(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.peak_open_transactions(), 0);
    }

    #[tokio::test]
    async fn test_load_reference_pool() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, 1);
        let store = MemoryStore::new();
        let pool = Arc::new(build_reference_pool(25, &mut StdRng::seed_from_u64(1)).unwrap());

        let loaded = load_reference_pool(&store, pool, &ctx.layout).await.unwrap();

        assert_eq!(loaded, 25);
        assert_eq!(store.row_count(Person::TABLE).await, 25);
        assert_eq!(staging_files(&dir), 0);
    }
}
