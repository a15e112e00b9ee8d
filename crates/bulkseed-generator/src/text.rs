//! Fake text helpers backed by the `fake` crate.

use fake::faker::company::en::CatchPhrase;
use fake::faker::job::en::Title as JobTitle;
use fake::faker::lorem::en::Words;
use fake::faker::name::en::Name;
use fake::Fake;
use rand::Rng;

const FIRST_YEAR: i32 = 1970;
const LAST_YEAR: i32 = 2024;

pub(crate) fn person_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    Name().fake_with_rng(rng)
}

pub(crate) fn catch_phrase<R: Rng + ?Sized>(rng: &mut R) -> String {
    CatchPhrase().fake_with_rng(rng)
}

pub(crate) fn job<R: Rng + ?Sized>(rng: &mut R) -> String {
    JobTitle().fake_with_rng(rng)
}

/// Three lorem words joined with commas, e.g. `"dolor,sit,amet"`.
pub(crate) fn word_list<R: Rng + ?Sized>(rng: &mut R) -> String {
    let words: Vec<String> = Words(3..4).fake_with_rng(rng);
    words.join(",")
}

pub(crate) fn year<R: Rng + ?Sized>(rng: &mut R) -> i32 {
    rng.random_range(FIRST_YEAR..=LAST_YEAR)
}

/// A year half of the time, `None` otherwise.
pub(crate) fn maybe_year<R: Rng + ?Sized>(rng: &mut R) -> Option<i32> {
    if rng.random_bool(0.5) {
        None
    } else {
        Some(year(rng))
    }
}
