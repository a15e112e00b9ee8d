//! Collision-checked key generation.
//!
//! Keys look like `tt01234567`: a fixed prefix followed by a zero-padded
//! decimal number. A keyspace may be split into residue classes so several
//! generators can run at the same time without sharing a collision set:
//! partition `p` of `n` only ever issues numbers `x` with `x % n == p`.

use crate::error::KeyGenerationError;
use rand::Rng;
use std::collections::HashSet;

/// Prefix and width of a family of keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySpace {
    pub prefix: &'static str,
    pub digits: u32,
}

impl KeySpace {
    /// Person keys, `nm` followed by eight digits.
    pub const PERSON: KeySpace = KeySpace::new("nm", 8);
    /// Title keys, `tt` followed by eight digits.
    pub const TITLE: KeySpace = KeySpace::new("tt", 8);

    pub const fn new(prefix: &'static str, digits: u32) -> Self {
        Self { prefix, digits }
    }

    /// Number of distinct keys in the whole space.
    pub fn capacity(&self) -> u64 {
        10u64.saturating_pow(self.digits)
    }

    /// Number of keys owned by `partition` when the space is split `partitions` ways.
    pub fn partition_capacity(&self, partition: u64, partitions: u64) -> u64 {
        if partitions == 0 || partition >= partitions {
            return 0;
        }
        let total = self.capacity();
        total / partitions + u64::from(partition < total % partitions)
    }

    fn format(&self, number: u64) -> String {
        format!(
            "{}{:0width$}",
            self.prefix,
            number,
            width = self.digits as usize
        )
    }
}

/// Issues random keys from one partition of a [`KeySpace`], never repeating one.
#[derive(Debug)]
pub struct UniqueKeyGenerator {
    space: KeySpace,
    partition: u64,
    partitions: u64,
    capacity: u64,
    issued: HashSet<u64>,
}

impl UniqueKeyGenerator {
    /// Create a generator that owns the whole keyspace.
    pub fn new(space: KeySpace) -> Self {
        Self {
            space,
            partition: 0,
            partitions: 1,
            capacity: space.capacity(),
            issued: HashSet::new(),
        }
    }

    /// Create a generator restricted to residue class `partition` modulo `partitions`.
    pub fn partitioned(
        space: KeySpace,
        partition: u64,
        partitions: u64,
    ) -> Result<Self, KeyGenerationError> {
        let capacity = space.partition_capacity(partition, partitions);
        if capacity == 0 {
            return Err(KeyGenerationError::InvalidPartition {
                prefix: space.prefix.to_string(),
                partition,
                partitions,
            });
        }
        Ok(Self {
            space,
            partition,
            partitions,
            capacity,
            issued: HashSet::new(),
        })
    }

    /// Reserve room for `additional` keys in the collision set.
    pub fn with_capacity_hint(mut self, additional: usize) -> Self {
        self.issued.reserve(additional);
        self
    }

    /// Total number of keys this generator can ever issue.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Number of keys issued so far.
    pub fn issued(&self) -> usize {
        self.issued.len()
    }

    /// Draw a key that this generator has not issued before.
    pub fn next_key<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<String, KeyGenerationError> {
        if self.issued.len() as u64 >= self.capacity {
            return Err(KeyGenerationError::Exhausted {
                prefix: self.space.prefix.to_string(),
                partition: self.partition,
                capacity: self.capacity,
            });
        }

        loop {
            let slot = rng.random_range(0..self.capacity);
            let number = slot * self.partitions + self.partition;
            if self.issued.insert(number) {
                return Ok(self.space.format(number));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_key_shape() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut keys = UniqueKeyGenerator::new(KeySpace::TITLE);

        let key = keys.next_key(&mut rng).unwrap();
        assert!(key.starts_with("tt"));
        assert_eq!(key.len(), 10);
        assert!(key[2..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_keys_are_unique_until_exhausted() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut keys = UniqueKeyGenerator::new(KeySpace::new("k", 2));

        let issued: HashSet<String> = (0..100).map(|_| keys.next_key(&mut rng).unwrap()).collect();
        assert_eq!(issued.len(), 100);

        let err = keys.next_key(&mut rng).unwrap_err();
        assert!(matches!(err, KeyGenerationError::Exhausted { capacity: 100, .. }));
    }

    #[test]
    fn test_partitions_are_disjoint() {
        let space = KeySpace::new("tt", 3);
        let mut rng = StdRng::seed_from_u64(9);

        let mut all = HashSet::new();
        for partition in 0..3 {
            let mut keys = UniqueKeyGenerator::partitioned(space, partition, 3).unwrap();
            for _ in 0..keys.capacity() {
                let key = keys.next_key(&mut rng).unwrap();
                let number: u64 = key[2..].parse().unwrap();
                assert_eq!(number % 3, partition);
                assert!(all.insert(key));
            }
        }
        assert_eq!(all.len(), 1000);
    }

    #[test]
    fn test_partition_capacity() {
        let space = KeySpace::new("x", 1);
        assert_eq!(space.partition_capacity(0, 3), 4);
        assert_eq!(space.partition_capacity(1, 3), 3);
        assert_eq!(space.partition_capacity(2, 3), 3);
        assert_eq!(space.partition_capacity(3, 3), 0);
    }

    #[test]
    fn test_invalid_partition() {
        let err = UniqueKeyGenerator::partitioned(KeySpace::TITLE, 4, 4).unwrap_err();
        assert!(matches!(err, KeyGenerationError::InvalidPartition { .. }));
    }
}
