//! Rank resolution over the ledger, the tiered index and the result cache.
//!
//! Writes go to the ledger first and are reflected in the index afterwards. Reads prefer
//! the cache, then the index, and drop to direct ledger queries whenever the index can't
//! answer. Only ledger failures are ever returned to the caller.

use std::{collections::HashMap, sync::Arc};

use futures::future::try_join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    cache::ReadThroughCache,
    database::{
        db_structs::{LeaderboardRow, RecordedScore},
        ledger::{ScoreLedger, UserDirectory}
    },
    error::{IndexError, LeaderboardError},
    index::{migrate_membership, IndexEntry, RankIndex},
    keys,
    model::{
        bucket::buckets_above,
        constants::BUCKET_COUNT,
        structures::{
            game_mode::GameMode,
            player_standing::{placeholder_username, PlayerStanding}
        },
        validation::{validate_limit, validate_score, validate_user_id}
    }
};

/// Liveness of each backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub database: bool,
    pub index: bool,
    pub cache: bool
}

impl HealthReport {
    /// The engine can serve every request as long as the ledger is reachable.
    pub fn is_serving(&self) -> bool {
        self.database
    }
}

pub struct Leaderboard {
    pub(crate) ledger: Arc<dyn ScoreLedger>,
    pub(crate) index: Arc<dyn RankIndex>,
    pub(crate) cache: ReadThroughCache,
    pub(crate) users: Arc<dyn UserDirectory>
}

impl Leaderboard {
    pub fn new(
        ledger: Arc<dyn ScoreLedger>,
        index: Arc<dyn RankIndex>,
        cache: ReadThroughCache,
        users: Arc<dyn UserDirectory>
    ) -> Self {
        Self {
            ledger,
            index,
            cache,
            users
        }
    }

    /// Records a score and moves the user to the bucket of their new total.
    ///
    /// The submission succeeds once the ledger commits. A failed index migration is only
    /// logged: the entry is repaired by the user's next submission or by a rebuild.
    pub async fn submit_score(&self, user_id: i64, score: i64, mode: GameMode) -> Result<RecordedScore, LeaderboardError> {
        let user_id = validate_user_id(user_id)?;
        let score = validate_score(score)?;

        let recorded = self
            .ledger
            .record_event(user_id, score, mode)
            .await
            .map_err(LeaderboardError::Durability)?;

        match migrate_membership(self.index.as_ref(), mode, user_id, recorded.total_score).await {
            Ok(bucket) => debug!(
                "User {} now at {} in {} (bucket {})",
                user_id, recorded.total_score, mode, bucket
            ),
            Err(e) => warn!(
                "Index migration for user {} in {} failed, leaving it to the next sync: {}",
                user_id, mode, e
            )
        }

        self.cache.invalidate_player(user_id, mode).await;

        Ok(recorded)
    }

    /// The `limit` highest totals in `mode`, best first, with positional ranks.
    pub async fn get_top_players(&self, mode: GameMode, limit: i64) -> Result<Vec<PlayerStanding>, LeaderboardError> {
        let limit = validate_limit(limit)?;
        let cache_key = keys::top_players(mode, limit);
        let ttl = self.cache.top_players_ttl();

        if let Some(cached) = self.cache.get_json::<Vec<PlayerStanding>>(&cache_key, ttl).await {
            return Ok(cached);
        }

        let candidates = match self.scan_index(mode, limit).await {
            Ok(entries) if !entries.is_empty() => Some(entries),
            Ok(_) => {
                debug!("Rank index for {} is empty, querying the ledger", mode);
                None
            }
            Err(e) => {
                warn!("Rank index unavailable for top {} in {}, querying the ledger: {}", limit, mode, e);
                None
            }
        };

        let (rows, names_resolved) = match candidates {
            Some(mut entries) => {
                // Stable, so ties keep the order the index returned them in
                entries.sort_by(|a, b| b.score.cmp(&a.score));
                entries.truncate(limit);
                self.hydrate(entries).await
            }
            None => {
                let rows = self
                    .ledger
                    .top_n(mode, limit)
                    .await
                    .map_err(LeaderboardError::Unavailable)?;
                (rows, true)
            }
        };

        let standings: Vec<PlayerStanding> = rows
            .into_iter()
            .enumerate()
            .map(|(position, row)| PlayerStanding {
                user_id: row.user_id,
                username: row.username.unwrap_or_else(|| placeholder_username(row.user_id)),
                total_score: row.total_score,
                rank: position as u64 + 1
            })
            .collect();

        // Placeholder names would outlive the lookup failure for the whole TTL
        if names_resolved {
            self.cache.put_json(&cache_key, &standings, ttl).await;
        }
        Ok(standings)
    }

    /// The user's 1-based global rank in `mode`, or `None` if they never submitted a score
    /// in it. Users with equal totals share a rank.
    pub async fn get_player_rank(&self, user_id: i64, mode: GameMode) -> Result<Option<PlayerStanding>, LeaderboardError> {
        let user_id = validate_user_id(user_id)?;
        let cache_key = keys::player_rank(user_id, mode);
        let ttl = self.cache.player_rank_ttl();

        if let Some(cached) = self.cache.get_json::<PlayerStanding>(&cache_key, ttl).await {
            return Ok(Some(cached));
        }

        let Some(aggregate) = self
            .ledger
            .get_aggregate(user_id, mode)
            .await
            .map_err(LeaderboardError::Unavailable)?
        else {
            return Ok(None);
        };
        let total_score = aggregate.total_score;

        let rank = match self.rank_from_index(mode, user_id, total_score).await {
            Ok(Some(rank)) => rank,
            Ok(None) => {
                warn!("User {} missing from the {} index after upsert, counting in the ledger", user_id, mode);
                self.rank_from_ledger(mode, total_score).await?
            }
            Err(e) => {
                warn!("Rank index unavailable for user {} in {}, counting in the ledger: {}", user_id, mode, e);
                self.rank_from_ledger(mode, total_score).await?
            }
        };

        let standing = PlayerStanding {
            user_id,
            username: self.username(user_id).await,
            total_score,
            rank
        };

        self.cache.put_json(&cache_key, &standing, ttl).await;
        Ok(Some(standing))
    }

    pub async fn health(&self) -> HealthReport {
        let (database, index, cache) = tokio::join!(self.ledger.ping(), self.index.ping(), self.cache.ping());

        let report = HealthReport {
            database: database.is_ok(),
            index: index.is_ok(),
            cache: cache.is_ok()
        };

        info!(
            "Health: database={} index={} cache={}",
            report.database, report.index, report.cache
        );
        report
    }

    /// Collects entries from the highest bucket down until at least `limit` are gathered.
    async fn scan_index(&self, mode: GameMode, limit: usize) -> Result<Vec<IndexEntry>, IndexError> {
        let mut collected = Vec::with_capacity(limit);

        for bucket in (0..BUCKET_COUNT).rev() {
            if collected.len() >= limit {
                break;
            }
            collected.extend(self.index.range_desc(mode, bucket).await?);
        }

        Ok(collected)
    }

    /// `Ok(None)` when the user can't be found in their bucket even after re-inserting them.
    async fn rank_from_index(&self, mode: GameMode, user_id: i32, total_score: i64) -> Result<Option<u64>, IndexError> {
        // The index may have drifted from the ledger. Migrating again re-inserts a missing
        // entry and drops one left behind by a failed migration.
        let bucket = migrate_membership(self.index.as_ref(), mode, user_id, total_score).await?;

        if self.index.rank_within_bucket(mode, bucket, user_id).await?.is_none() {
            return Ok(None);
        }

        let above_in_bucket = self.index.count_above(mode, bucket, total_score).await?;
        let higher = try_join_all(buckets_above(bucket).map(|b| self.index.cardinality(mode, b))).await?;
        let above_in_higher_buckets: u64 = higher.iter().sum();

        Ok(Some(above_in_higher_buckets + above_in_bucket + 1))
    }

    async fn rank_from_ledger(&self, mode: GameMode, total_score: i64) -> Result<u64, LeaderboardError> {
        let above = self
            .ledger
            .count_above(mode, total_score)
            .await
            .map_err(LeaderboardError::Unavailable)?;

        Ok(above + 1)
    }

    /// Attaches usernames to index entries. A failed lookup leaves every name unresolved
    /// and is reported through the returned flag.
    async fn hydrate(&self, entries: Vec<IndexEntry>) -> (Vec<LeaderboardRow>, bool) {
        let ids: Vec<i32> = entries.iter().map(|e| e.user_id).collect();

        let (mut names, resolved) = match self.users.usernames(&ids).await {
            Ok(names) => (names, true),
            Err(e) => {
                warn!("Username lookup for {} users failed: {}", ids.len(), e);
                (HashMap::new(), false)
            }
        };

        let rows = entries
            .into_iter()
            .map(|entry| LeaderboardRow {
                user_id: entry.user_id,
                username: names.remove(&entry.user_id),
                total_score: entry.score
            })
            .collect();
        (rows, resolved)
    }

    async fn username(&self, user_id: i32) -> String {
        match self.users.usernames(&[user_id]).await {
            Ok(mut names) => names.remove(&user_id),
            Err(e) => {
                warn!("Username lookup for user {} failed: {}", user_id, e);
                None
            }
        }
        .unwrap_or_else(|| placeholder_username(user_id))
    }
}
