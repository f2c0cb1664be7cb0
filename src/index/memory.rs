use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering}
};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{sorted_set::ScoreSet, IndexEntry, RankIndex};
use crate::{error::IndexError, model::constants::BUCKET_COUNT, model::structures::game_mode::GameMode};

#[derive(Default)]
struct IndexState {
    buckets: HashMap<(GameMode, usize), ScoreSet>
}

/// Process-local rank index. Used when no Redis URL is configured, and by tests.
///
/// `set_available(false)` makes every call fail, which is how tests simulate an index
/// outage.
#[derive(Default)]
pub struct MemoryRankIndex {
    state: RwLock<IndexState>,
    unavailable: AtomicBool
}

impl MemoryRankIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    fn check(&self, bucket: usize) -> Result<(), IndexError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(IndexError::Unavailable("in-memory index disabled".to_string()));
        }
        if bucket >= BUCKET_COUNT {
            return Err(IndexError::BucketOutOfRange(bucket));
        }
        Ok(())
    }
}

#[async_trait]
impl RankIndex for MemoryRankIndex {
    async fn upsert(&self, mode: GameMode, bucket: usize, user_id: i32, score: i64) -> Result<(), IndexError> {
        self.check(bucket)?;

        let mut state = self.state.write();
        let set = state.buckets.entry((mode, bucket)).or_default();
        if set.score(user_id).is_some_and(|current| current >= score) {
            return Ok(());
        }
        set.insert(user_id, score);
        Ok(())
    }

    async fn remove(&self, mode: GameMode, bucket: usize, user_id: i32) -> Result<(), IndexError> {
        self.check(bucket)?;

        let mut state = self.state.write();
        if let Some(set) = state.buckets.get_mut(&(mode, bucket)) {
            set.remove(user_id);
        }
        Ok(())
    }

    async fn range_desc(&self, mode: GameMode, bucket: usize) -> Result<Vec<IndexEntry>, IndexError> {
        self.check(bucket)?;

        let state = self.state.read();
        Ok(state
            .buckets
            .get(&(mode, bucket))
            .map(|set| {
                set.iter_desc()
                    .map(|(user_id, score)| IndexEntry { user_id, score })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn rank_within_bucket(&self, mode: GameMode, bucket: usize, user_id: i32) -> Result<Option<u64>, IndexError> {
        self.check(bucket)?;

        let state = self.state.read();
        Ok(state
            .buckets
            .get(&(mode, bucket))
            .and_then(|set| set.rank_desc(user_id))
            .map(|rank| rank as u64))
    }

    async fn cardinality(&self, mode: GameMode, bucket: usize) -> Result<u64, IndexError> {
        self.check(bucket)?;

        let state = self.state.read();
        Ok(state.buckets.get(&(mode, bucket)).map_or(0, |set| set.len() as u64))
    }

    async fn count_above(&self, mode: GameMode, bucket: usize, score: i64) -> Result<u64, IndexError> {
        self.check(bucket)?;

        let state = self.state.read();
        Ok(state
            .buckets
            .get(&(mode, bucket))
            .map_or(0, |set| set.count_above(score) as u64))
    }

    async fn memberships(&self, mode: GameMode, user_id: i32) -> Result<Vec<(usize, i64)>, IndexError> {
        self.check(0)?;

        let state = self.state.read();
        Ok((0..BUCKET_COUNT)
            .filter_map(|bucket| {
                let score = state.buckets.get(&(mode, bucket))?.score(user_id)?;
                Some((bucket, score))
            })
            .collect())
    }

    async fn replace_mode(&self, mode: GameMode, buckets: Vec<Vec<IndexEntry>>) -> Result<(), IndexError> {
        self.check(buckets.len().saturating_sub(1))?;

        let mut fresh: HashMap<usize, ScoreSet> = HashMap::new();
        for (bucket, entries) in buckets.into_iter().enumerate() {
            let set = fresh.entry(bucket).or_default();
            for entry in entries {
                set.insert(entry.user_id, entry.score);
            }
        }

        // Build first, swap under a single write lock
        let mut state = self.state.write();
        state.buckets.retain(|(m, _), _| *m != mode);
        for (bucket, set) in fresh {
            state.buckets.insert((mode, bucket), set);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), IndexError> {
        self.check(0)
    }
}
