//! Reference pool of persons and the pair set sampled from it.
//!
//! The pool is built once, single-threaded, before any batch runs. After that
//! it is only ever read, so it can be shared between workers behind an `Arc`
//! without locking.

use crate::error::KeyGenerationError;
use crate::keys::{KeySpace, UniqueKeyGenerator};
use crate::records::Person;
use crate::text;
use rand::seq::IndexedRandom;
use rand::Rng;
use std::collections::HashMap;
use tracing::debug;

/// Read-only set of persons keyed by `nconst`.
#[derive(Debug, Default)]
pub struct ReferencePool {
    persons: Vec<Person>,
    index: HashMap<String, usize>,
}

impl ReferencePool {
    pub fn len(&self) -> usize {
        self.persons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.persons.is_empty()
    }

    pub fn persons(&self) -> &[Person] {
        &self.persons
    }

    pub fn get(&self, nconst: &str) -> Option<&Person> {
        self.index.get(nconst).map(|&i| &self.persons[i])
    }

    pub fn contains(&self, nconst: &str) -> bool {
        self.index.contains_key(nconst)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.persons.iter().map(|p| p.nconst.as_str())
    }

    /// Pick a random person key. `None` only when the pool is empty.
    pub fn choose_key<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        self.persons.choose(rng).map(|p| p.nconst.as_str())
    }
}

/// Generate `count` persons with distinct keys.
pub fn build_reference_pool<R: Rng + ?Sized>(
    count: usize,
    rng: &mut R,
) -> Result<ReferencePool, KeyGenerationError> {
    let mut keys = UniqueKeyGenerator::new(KeySpace::PERSON).with_capacity_hint(count);
    let mut persons = Vec::with_capacity(count);
    let mut index = HashMap::with_capacity(count);

    for i in 0..count {
        let nconst = keys.next_key(rng)?;
        let person = Person {
            nconst: nconst.clone(),
            primary_name: text::person_name(rng),
            birth_year: text::year(rng),
            death_year: text::maybe_year(rng),
            primary_profession: text::word_list(rng),
            known_for_titles: text::word_list(rng),
        };
        index.insert(nconst, i);
        persons.push(person);
    }

    debug!("Built reference pool with {} persons", persons.len());
    Ok(ReferencePool { persons, index })
}

/// Two person keys that should appear together in one title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair(pub String, pub String);

impl KeyPair {
    pub fn keys(&self) -> [&str; 2] {
        [self.0.as_str(), self.1.as_str()]
    }
}

/// Pairs of pool keys used to force co-occurrence across titles.
#[derive(Debug, Default)]
pub struct PairSet {
    pairs: Vec<KeyPair>,
}

impl PairSet {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyPair> {
        self.pairs.iter()
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&KeyPair> {
        self.pairs.choose(rng)
    }
}

/// Draw `n` pairs from the pool keys, with replacement.
///
/// A pair may contain the same key twice and the same pair may be drawn more
/// than once. Returns an empty set when the pool is empty.
pub fn sample_pairs<R: Rng + ?Sized>(pool: &ReferencePool, n: usize, rng: &mut R) -> PairSet {
    let pairs = (0..n)
        .map_while(|_| {
            let a = pool.choose_key(rng)?;
            let b = pool.choose_key(rng)?;
            Some(KeyPair(a.to_string(), b.to_string()))
        })
        .collect();
    PairSet { pairs }
}
