//! The tiered rank index: one ordered set per (mode, bucket).
//!
//! The index is a derived projection of the ledger. Every operation is idempotent, so a
//! failed or abandoned call can simply be repeated, and a lost index is rebuilt by
//! [`crate::model::sync`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::IndexError,
    model::{bucket::bucket_for, structures::game_mode::GameMode}
};

pub mod memory;
pub mod redis_store;
pub mod sorted_set;

pub use memory::MemoryRankIndex;
pub use redis_store::RedisRankIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub user_id: i32,
    pub score: i64
}

#[async_trait]
pub trait RankIndex: Send + Sync {
    /// Inserts `user_id` at `score` inside `bucket`, or raises their score there. A score
    /// lower than the stored one is ignored, as totals never decrease.
    async fn upsert(&self, mode: GameMode, bucket: usize, user_id: i32, score: i64) -> Result<(), IndexError>;

    async fn remove(&self, mode: GameMode, bucket: usize, user_id: i32) -> Result<(), IndexError>;

    /// Every entry of the bucket, highest score first.
    async fn range_desc(&self, mode: GameMode, bucket: usize) -> Result<Vec<IndexEntry>, IndexError>;

    /// 0-based position inside the bucket, counting from the highest score.
    async fn rank_within_bucket(&self, mode: GameMode, bucket: usize, user_id: i32) -> Result<Option<u64>, IndexError>;

    async fn cardinality(&self, mode: GameMode, bucket: usize) -> Result<u64, IndexError>;

    /// Entries of the bucket with a score strictly greater than `score`.
    async fn count_above(&self, mode: GameMode, bucket: usize, score: i64) -> Result<u64, IndexError>;

    /// `(bucket, score)` for every bucket of `mode` holding the user, lowest bucket first.
    async fn memberships(&self, mode: GameMode, user_id: i32) -> Result<Vec<(usize, i64)>, IndexError>;

    /// Clears every bucket of `mode` and loads `buckets[i]` into bucket `i`, as one step
    /// from the point of view of readers.
    async fn replace_mode(&self, mode: GameMode, buckets: Vec<Vec<IndexEntry>>) -> Result<(), IndexError>;

    async fn ping(&self) -> Result<(), IndexError>;
}

/// Moves a user's entry after their total changed, keeping them in exactly one bucket.
///
/// The new entry is written first, then every bucket holding the user is read back and
/// all but the highest score are removed. Migrations of the same user may interleave:
/// whichever reads last sees every earlier write, and none ever removes the highest
/// entry, so the newest total is the one left. Returns the bucket the user now lives in.
pub async fn migrate_membership(
    index: &dyn RankIndex,
    mode: GameMode,
    user_id: i32,
    new_total: i64
) -> Result<usize, IndexError> {
    let new_bucket = bucket_for(new_total);
    index.upsert(mode, new_bucket, user_id, new_total).await?;

    let held = index.memberships(mode, user_id).await?;
    let current = held
        .iter()
        .max_by_key(|(bucket, score)| (*score, *bucket))
        .map_or(new_bucket, |(bucket, _)| *bucket);

    for (old_bucket, score) in held.into_iter().filter(|(bucket, _)| *bucket != current) {
        debug!(
            "Dropping user {} at {} from bucket {} of {}, now in bucket {}",
            user_id, score, old_bucket, mode, current
        );
        index.remove(mode, old_bucket, user_id).await?;
    }

    Ok(current)
}
