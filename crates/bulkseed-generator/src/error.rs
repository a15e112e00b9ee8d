//! Error types for record generation.

use thiserror::Error;

/// Errors raised while issuing unique keys.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyGenerationError {
    /// Every key in the partition has already been issued.
    #[error("keyspace '{prefix}' exhausted: partition {partition} holds {capacity} keys")]
    Exhausted {
        prefix: String,
        partition: u64,
        capacity: u64,
    },

    /// The partition layout cannot be represented in the keyspace.
    #[error("invalid partition {partition} of {partitions} for keyspace '{prefix}'")]
    InvalidPartition {
        prefix: String,
        partition: u64,
        partitions: u64,
    },
}
