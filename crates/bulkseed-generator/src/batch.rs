//! Batch generation: titles plus the principals that link them to the pool.

use crate::error::KeyGenerationError;
use crate::keys::{KeySpace, UniqueKeyGenerator};
use crate::pool::{PairSet, ReferencePool};
use crate::records::{Category, Principal, Title};
use crate::text;
use rand::Rng;
use std::sync::Arc;

const TITLE_TYPE: &str = "movie";
const MIN_RUNTIME_MINUTES: i32 = 60;
const MAX_RUNTIME_MINUTES: i32 = 180;
/// Upper bound on rows reserved up front for a batch's principals.
const MAX_PRINCIPAL_RESERVE: usize = 1 << 20;

/// Tunables for batch generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Share of titles in a batch that start with a forced pair (0.0..=1.0).
    pub forced_pair_fraction: f64,
    /// Minimum number of randomly drawn principals per title.
    pub min_associations: u32,
    /// Maximum number of randomly drawn principals per title (inclusive).
    pub max_associations: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            forced_pair_fraction: 0.1,
            min_associations: 10,
            max_associations: 50,
        }
    }
}

impl GeneratorConfig {
    /// Largest accepted `max_associations`.
    pub const MAX_ASSOCIATIONS: u32 = 10_000;

    /// Number of titles in a batch of `batch_size` that receive a forced pair.
    ///
    /// The first `ceil(batch_size * fraction)` titles get one; the small
    /// epsilon keeps float noise (`30 * 0.1 == 3.0000000000000004`) from
    /// rounding up a whole extra title.
    pub fn forced_titles(&self, batch_size: usize) -> usize {
        let exact = batch_size as f64 * self.forced_pair_fraction.clamp(0.0, 1.0);
        ((exact - 1e-9).ceil().max(0.0) as usize).min(batch_size)
    }

    /// Expected principal rows for a batch, capped at [`MAX_PRINCIPAL_RESERVE`].
    fn principal_reserve(&self, batch_size: usize) -> usize {
        let mean = (u64::from(self.min_associations) + u64::from(self.max_associations)) / 2 + 1;
        usize::try_from(mean)
            .unwrap_or(usize::MAX)
            .saturating_mul(batch_size)
            .min(MAX_PRINCIPAL_RESERVE)
    }
}

/// Identifies one batch: its 1-based ordinal and the number of titles in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSpec {
    pub id: u64,
    pub size: usize,
}

impl BatchSpec {
    pub fn new(id: u64, size: usize) -> Self {
        Self { id, size }
    }
}

/// Output of one generation call.
#[derive(Debug, Clone)]
pub struct Batch {
    pub id: u64,
    pub titles: Vec<Title>,
    pub principals: Vec<Principal>,
}

/// RNG seed for batch `id` under a run seed.
pub fn batch_seed(seed: u64, id: u64) -> u64 {
    seed.wrapping_add(id.wrapping_mul(0x9E3779B97F4A7C15))
}

/// Produces batches from a shared, read-only pool and pair set.
#[derive(Debug, Clone)]
pub struct BatchGenerator {
    config: GeneratorConfig,
    pool: Arc<ReferencePool>,
    pairs: Arc<PairSet>,
}

impl BatchGenerator {
    pub fn new(config: GeneratorConfig, pool: Arc<ReferencePool>, pairs: Arc<PairSet>) -> Self {
        Self {
            config,
            pool,
            pairs,
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn pool(&self) -> &ReferencePool {
        &self.pool
    }

    /// Generate one batch.
    ///
    /// Title keys come from partition `spec.id - 1` of the title keyspace split
    /// `total_batches` ways, so batches generated concurrently never share a key.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        spec: BatchSpec,
        total_batches: u64,
        rng: &mut R,
    ) -> Result<Batch, KeyGenerationError> {
        let invalid = || KeyGenerationError::InvalidPartition {
            prefix: KeySpace::TITLE.prefix.to_string(),
            partition: spec.id,
            partitions: total_batches,
        };
        let partition = spec.id.checked_sub(1).ok_or_else(invalid)?;
        let mut keys = UniqueKeyGenerator::partitioned(KeySpace::TITLE, partition, total_batches)?
            .with_capacity_hint(spec.size);

        let forced = self.config.forced_titles(spec.size);

        let mut titles = Vec::with_capacity(spec.size);
        let mut principals = Vec::with_capacity(self.config.principal_reserve(spec.size));

        for j in 0..spec.size {
            let tconst = keys.next_key(rng)?;
            titles.push(self.title(tconst.clone(), rng));

            let associations =
                rng.random_range(self.config.min_associations..=self.config.max_associations);
            let mut ordering = 0u32;

            if j < forced {
                if let Some(pair) = self.pairs.choose(rng) {
                    for nconst in pair.keys() {
                        ordering += 1;
                        principals.push(principal(&tconst, ordering, nconst, rng));
                    }
                }
            }

            for _ in 0..associations {
                let Some(nconst) = self.pool.choose_key(rng) else {
                    break;
                };
                ordering += 1;
                principals.push(principal(&tconst, ordering, nconst, rng));
            }
        }

        Ok(Batch {
            id: spec.id,
            titles,
            principals,
        })
    }

    fn title<R: Rng + ?Sized>(&self, tconst: String, rng: &mut R) -> Title {
        let primary_title = text::catch_phrase(rng);
        Title {
            tconst,
            title_type: TITLE_TYPE,
            original_title: primary_title.clone(),
            primary_title,
            is_adult: rng.random_bool(0.5),
            start_year: text::year(rng),
            end_year: text::maybe_year(rng),
            runtime_minutes: rng.random_range(MIN_RUNTIME_MINUTES..=MAX_RUNTIME_MINUTES),
            genres: text::word_list(rng),
        }
    }
}

fn principal<R: Rng + ?Sized>(tconst: &str, ordering: u32, nconst: &str, rng: &mut R) -> Principal {
    let category = Category::ALL[rng.random_range(0..Category::ALL.len())];
    let (job, characters) = if category.is_performer() {
        (None, Some(text::catch_phrase(rng)))
    } else {
        (Some(text::job(rng)), None)
    };
    Principal {
        tconst: tconst.to_string(),
        ordering,
        nconst: nconst.to_string(),
        category,
        job,
        characters,
    }
}
