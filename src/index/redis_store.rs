use async_trait::async_trait;
use itertools::Itertools;
use redis::{aio::ConnectionManager, AsyncCommands};
use tracing::info;

use super::{IndexEntry, RankIndex};
use crate::{
    error::IndexError,
    keys,
    model::{constants::BUCKET_COUNT, structures::game_mode::GameMode}
};

/// Members per ZADD during a rebuild.
const LOAD_CHUNK_SIZE: usize = 1_000;

/// Rank index stored as one Redis sorted set per (mode, bucket). Needs Redis 6.2 or later
/// for `ZADD GT`.
#[derive(Clone)]
pub struct RedisRankIndex {
    conn: ConnectionManager
}

impl RedisRankIndex {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    fn check_bucket(bucket: usize) -> Result<(), IndexError> {
        if bucket >= BUCKET_COUNT {
            return Err(IndexError::BucketOutOfRange(bucket));
        }
        Ok(())
    }
}

#[async_trait]
impl RankIndex for RedisRankIndex {
    async fn upsert(&self, mode: GameMode, bucket: usize, user_id: i32, score: i64) -> Result<(), IndexError> {
        Self::check_bucket(bucket)?;

        // GT only ever raises an existing member's score
        let mut conn = self.conn.clone();
        let (): () = redis::cmd("ZADD")
            .arg(keys::bucket(mode, bucket))
            .arg("GT")
            .arg(score)
            .arg(user_id)
            .query_async(&mut conn)
            .await?;

        Ok(())
    }

    async fn remove(&self, mode: GameMode, bucket: usize, user_id: i32) -> Result<(), IndexError> {
        Self::check_bucket(bucket)?;

        let mut conn = self.conn.clone();
        let (): () = conn.zrem(keys::bucket(mode, bucket), user_id).await?;
        Ok(())
    }

    async fn range_desc(&self, mode: GameMode, bucket: usize) -> Result<Vec<IndexEntry>, IndexError> {
        Self::check_bucket(bucket)?;

        let mut conn = self.conn.clone();
        let members: Vec<(i32, f64)> = conn.zrevrange_withscores(keys::bucket(mode, bucket), 0, -1).await?;

        Ok(members
            .into_iter()
            .map(|(user_id, score)| IndexEntry {
                user_id,
                score: score as i64
            })
            .collect())
    }

    async fn rank_within_bucket(&self, mode: GameMode, bucket: usize, user_id: i32) -> Result<Option<u64>, IndexError> {
        Self::check_bucket(bucket)?;

        let mut conn = self.conn.clone();
        let rank: Option<u64> = conn.zrevrank(keys::bucket(mode, bucket), user_id).await?;
        Ok(rank)
    }

    async fn cardinality(&self, mode: GameMode, bucket: usize) -> Result<u64, IndexError> {
        Self::check_bucket(bucket)?;

        let mut conn = self.conn.clone();
        let count: u64 = conn.zcard(keys::bucket(mode, bucket)).await?;
        Ok(count)
    }

    async fn count_above(&self, mode: GameMode, bucket: usize, score: i64) -> Result<u64, IndexError> {
        Self::check_bucket(bucket)?;

        // "(" makes the lower bound exclusive
        let mut conn = self.conn.clone();
        let count: u64 = conn
            .zcount(keys::bucket(mode, bucket), format!("({}", score), "+inf")
            .await?;
        Ok(count)
    }

    async fn memberships(&self, mode: GameMode, user_id: i32) -> Result<Vec<(usize, i64)>, IndexError> {
        let mut pipe = redis::pipe();
        for bucket in 0..BUCKET_COUNT {
            pipe.zscore(keys::bucket(mode, bucket), user_id);
        }

        let mut conn = self.conn.clone();
        let scores: Vec<Option<f64>> = pipe.query_async(&mut conn).await?;

        Ok(scores
            .into_iter()
            .enumerate()
            .filter_map(|(bucket, score)| score.map(|score| (bucket, score as i64)))
            .collect())
    }

    async fn replace_mode(&self, mode: GameMode, buckets: Vec<Vec<IndexEntry>>) -> Result<(), IndexError> {
        Self::check_bucket(buckets.len().saturating_sub(1))?;

        let mut pipe = redis::pipe();
        pipe.atomic();

        for bucket in 0..BUCKET_COUNT {
            pipe.del(keys::bucket(mode, bucket)).ignore();
        }

        let mut loaded = 0;
        for (bucket, entries) in buckets.iter().enumerate() {
            let key = keys::bucket(mode, bucket);
            for chunk in entries.chunks(LOAD_CHUNK_SIZE) {
                let members = chunk.iter().map(|entry| (entry.score, entry.user_id)).collect_vec();
                pipe.zadd_multiple(&key, &members).ignore();
            }
            loaded += entries.len();
        }

        let mut conn = self.conn.clone();
        let (): () = pipe.query_async(&mut conn).await?;

        info!("Loaded {} entries into the {} rank index", loaded, mode);
        Ok(())
    }

    async fn ping(&self) -> Result<(), IndexError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
