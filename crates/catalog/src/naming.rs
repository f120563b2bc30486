//! Names for composed bouquets.
//!
//! Names are unique in the catalog, so packing draws a random five-digit suffix and
//! retries once with a different one if the store reports a collision.

use std::ops::RangeInclusive;

use rand::Rng;

pub const BOUQUET_NAME_PREFIX: &str = "Авторский букет №";
pub const SUFFIX_RANGE: RangeInclusive<u32> = 10_000..=99_999;

/// Source of bouquet name suffixes.
pub trait BouquetNamer: Send + Sync {
    fn suffix(&self) -> u32;
}

/// Draws suffixes uniformly from [`SUFFIX_RANGE`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomBouquetNamer;

impl BouquetNamer for RandomBouquetNamer {
    fn suffix(&self) -> u32 {
        rand::thread_rng().gen_range(SUFFIX_RANGE)
    }
}

pub fn bouquet_name(suffix: u32) -> String {
    format!("{BOUQUET_NAME_PREFIX}{suffix}")
}

/// Suffix for the retry after `previous` collided: `candidate` unless it repeats
/// `previous`, in which case the next suffix (wrapping inside the range).
pub fn retry_suffix(previous: u32, candidate: u32) -> u32 {
    if candidate != previous {
        return candidate;
    }
    if previous >= *SUFFIX_RANGE.end() {
        *SUFFIX_RANGE.start()
    } else {
        previous + 1
    }
}
