//! Synthetic record generator for the bulkseed loader.
//!
//! This crate produces the three record kinds that bulkseed loads: persons
//! (the shared reference pool), titles (generated per batch) and principals
//! (the many-to-many relation between the two). All generation is driven by an
//! explicit RNG passed by the caller, so a fixed seed yields the same data.
//!
//! # Architecture
//!
//! ```text
//!   seed ──► build_reference_pool ──► ReferencePool (read-only, shared)
//!                                          │
//!                                          ├──► sample_pairs ──► PairSet
//!                                          │                       │
//!                                          ▼                       ▼
//!                         BatchGenerator::generate(batch, &mut rng)
//!                                          │
//!                                          ▼
//!                        Batch { titles, principals }
//! ```
//!
//! # Example
//!
//! ```rust
//! use bulkseed_generator::{build_reference_pool, sample_pairs, BatchGenerator, BatchSpec, GeneratorConfig};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use std::sync::Arc;
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let pool = Arc::new(build_reference_pool(200, &mut rng).unwrap());
//! let pairs = Arc::new(sample_pairs(&pool, 100, &mut rng));
//!
//! let generator = BatchGenerator::new(GeneratorConfig::default(), pool, pairs);
//! let batch = generator
//!     .generate(BatchSpec::new(1, 10), 1, &mut StdRng::seed_from_u64(7))
//!     .unwrap();
//! assert_eq!(batch.titles.len(), 10);
//! ```

pub mod batch;
pub mod error;
pub mod keys;
pub mod pool;
pub mod records;
mod text;

// Re-exports for convenience
pub use batch::{batch_seed, Batch, BatchGenerator, BatchSpec, GeneratorConfig};
pub use error::KeyGenerationError;
pub use keys::{KeySpace, UniqueKeyGenerator};
pub use pool::{build_reference_pool, sample_pairs, KeyPair, PairSet, ReferencePool};
pub use records::{Category, Person, Principal, TableRecord, Title};
