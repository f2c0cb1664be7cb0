//! Score-range partitioning for the tiered rank index.
//!
//! Totals follow a long-tailed distribution: the low buckets are wide and crowded, the
//! high buckets narrow and sparse. Rank queries only need exact ordering inside a single
//! bucket plus the cardinality of every bucket above it.

use serde::Serialize;

use crate::model::constants::{BUCKET_COUNT, BUCKET_UPPER_BOUNDS};

/// An inclusive score range. `max` is `None` for the last, unbounded bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub index: usize,
    pub min: i64,
    pub max: Option<i64>
}

impl Bucket {
    pub fn contains(&self, score: i64) -> bool {
        score >= self.min && self.max.map_or(true, |max| score <= max)
    }
}

/// Maps a total score to its bucket index.
///
/// Ranges are inclusive on `max`, so a score sitting exactly on a boundary belongs to the
/// lower bucket. Negative input cannot come out of the ledger; it lands in bucket 0.
pub fn bucket_for(score: i64) -> usize {
    BUCKET_UPPER_BOUNDS.partition_point(|&max| max < score)
}

/// Returns the range covered by `index`, or `None` past the last bucket.
pub fn bucket_range(index: usize) -> Option<Bucket> {
    if index >= BUCKET_COUNT {
        return None;
    }

    let min = match index {
        0 => 0,
        i => BUCKET_UPPER_BOUNDS[i - 1] + 1
    };

    Some(Bucket {
        index,
        min,
        max: BUCKET_UPPER_BOUNDS.get(index).copied()
    })
}

/// All buckets in ascending order.
pub fn buckets() -> impl DoubleEndedIterator<Item = Bucket> {
    (0..BUCKET_COUNT).filter_map(bucket_range)
}

/// Bucket indices strictly above `index`, i.e. the buckets holding higher totals.
pub fn buckets_above(index: usize) -> std::ops::Range<usize> {
    (index + 1).min(BUCKET_COUNT)..BUCKET_COUNT
}
