//! End-to-end pipeline tests against the in-memory store.
//!
//! These drive the real generator, staging writer, loader and coordinator;
//! only the database is replaced.

use bulkseed_generator::{Person, Principal, TableRecord, Title};
use bulkseed_populate::{MemoryStore, Pipeline, PipelineConfig, PopulateError};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tempfile::TempDir;

const SEED: u64 = 42;

fn config(dir: &TempDir, total_units: u64, batch_size: usize, concurrency: usize) -> PipelineConfig {
    PipelineConfig::new(total_units)
        .with_batch_size(batch_size)
        .with_concurrency(concurrency)
        .with_pool_size(2_000)
        .with_seed(SEED)
        .with_staging_dir(dir.path())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("bulkseed_populate=info")
        .try_init()
        .ok();
}

#[tokio::test]
async fn test_end_to_end_2500_titles() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let dir = TempDir::new()?;
    let store = Arc::new(MemoryStore::new());

    let report = Pipeline::new(Arc::clone(&store), config(&dir, 2_500, 1_000, 4))
        .run()
        .await?;

    assert_eq!(report.batches_total, 3);
    assert_eq!(report.batches_succeeded, 3);
    assert!(report.is_success());
    assert_eq!(report.titles_loaded, 2_500);
    assert_eq!(report.persons_loaded, 2_000);

    assert_eq!(store.row_count(Person::TABLE).await, 2_000);
    assert_eq!(store.row_count(Title::TABLE).await, 2_500);
    assert_eq!(
        store.row_count(Principal::TABLE).await,
        report.principals_loaded
    );

    // Every title key is unique across all batches.
    let titles = store.rows(Title::TABLE).await;
    let tconsts: HashSet<String> = titles.iter().map(|r| r[0].to_string()).collect();
    assert_eq!(tconsts.len(), 2_500);

    // Principals: dense ordering per title, and the row total equals the
    // sum of per-title association counts.
    let principals = store.rows(Principal::TABLE).await;
    let mut by_title: BTreeMap<String, Vec<u32>> = BTreeMap::new();
    for row in &principals {
        by_title
            .entry(row[0].to_string())
            .or_default()
            .push(row[1].parse()?);
    }
    assert_eq!(by_title.len(), 2_500);
    let mut total = 0u64;
    for orderings in by_title.values_mut() {
        orderings.sort_unstable();
        let expected: Vec<u32> = (1..=orderings.len() as u32).collect();
        assert_eq!(*orderings, expected);
        total += orderings.len() as u64;
    }
    assert_eq!(total, report.principals_loaded);

    // Every principal points at a loaded person.
    let persons: HashSet<String> = store
        .rows(Person::TABLE)
        .await
        .iter()
        .map(|r| r[0].to_string())
        .collect();
    assert!(principals.iter().all(|r| persons.contains(&r[2])));

    // No staging files are left behind.
    assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_batch_sizes_split_remainder() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let store = Arc::new(MemoryStore::new());

    let config = config(&dir, 2_500, 1_000, 4).with_load_pool(false);
    assert_eq!(
        (1..=config.total_batches())
            .map(|id| config.batch_len(id))
            .collect::<Vec<_>>(),
        vec![1_000, 1_000, 500]
    );

    let report = Pipeline::new(Arc::clone(&store), config).run().await?;
    assert_eq!(report.persons_loaded, 0);
    assert_eq!(store.row_count(Person::TABLE).await, 0);
    assert_eq!(store.row_count(Title::TABLE).await, 2_500);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_is_bounded() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let store = Arc::new(MemoryStore::new());

    let report = Pipeline::new(Arc::clone(&store), config(&dir, 1_200, 50, 3))
        .run()
        .await?;

    assert_eq!(report.batches_succeeded, 24);
    assert!(store.peak_open_transactions() <= 3);
    assert!(store.peak_open_transactions() >= 1);
    assert_eq!(store.open_transactions(), 0);
    // 24 batches plus the pool load.
    assert_eq!(store.commits(), 25);
    Ok(())
}

#[tokio::test]
async fn test_failed_batch_is_surfaced_and_isolated() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    // Copy 1 is the pool, copies 2 and 3 belong to the first batch to load.
    let store = Arc::new(MemoryStore::with_copy_failure_at(3));

    let err = Pipeline::new(Arc::clone(&store), config(&dir, 500, 100, 1))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, PopulateError::Batch { .. }));
    assert!(err.batch_id().is_some());

    // The failed batch left nothing behind; the other four still committed.
    assert_eq!(store.row_count(Title::TABLE).await, 400);
    let principals = store.rows(Principal::TABLE).await;
    let titles: HashSet<String> = store
        .rows(Title::TABLE)
        .await
        .iter()
        .map(|r| r[0].to_string())
        .collect();
    assert!(!principals.is_empty());
    assert!(principals.iter().all(|r| titles.contains(&r[0])));
    assert_eq!(store.row_count(Person::TABLE).await, 2_000);
    assert_eq!(store.rollbacks(), 1);
    // Pool load plus four batches.
    assert_eq!(store.commits(), 5);
    assert_eq!(store.open_transactions(), 0);
    assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_every_failure_is_counted_and_first_returned() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let store = Arc::new(MemoryStore::with_rejected_table(Principal::TABLE));

    let err = Pipeline::new(Arc::clone(&store), config(&dir, 300, 100, 2))
        .run()
        .await
        .unwrap_err();

    assert!(err.batch_id().is_some());
    assert_eq!(store.rollbacks(), 3);
    assert_eq!(store.commits(), 1);
    assert_eq!(store.row_count(Title::TABLE).await, 0);
    assert_eq!(store.row_count(Person::TABLE).await, 2_000);
    Ok(())
}

#[tokio::test]
async fn test_deterministic_for_seed() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;

    let first = Arc::new(MemoryStore::new());
    Pipeline::new(Arc::clone(&first), config(&dir, 300, 100, 3))
        .run()
        .await?;
    let second = Arc::new(MemoryStore::new());
    Pipeline::new(Arc::clone(&second), config(&dir, 300, 100, 1))
        .run()
        .await?;

    let sorted = |rows: Vec<csv::StringRecord>| {
        let mut rows: Vec<Vec<String>> = rows
            .into_iter()
            .map(|r| r.iter().map(String::from).collect())
            .collect();
        rows.sort();
        rows
    };
    assert_eq!(
        sorted(first.rows(Title::TABLE).await),
        sorted(second.rows(Title::TABLE).await)
    );
    assert_eq!(
        sorted(first.rows(Principal::TABLE).await),
        sorted(second.rows(Principal::TABLE).await)
    );
    Ok(())
}

#[tokio::test]
async fn test_invalid_config_fails_before_work() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());

    let err = Pipeline::new(Arc::clone(&store), config(&dir, 100, 0, 1))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, PopulateError::Config(_)));
    assert_eq!(store.peak_open_transactions(), 0);
}
