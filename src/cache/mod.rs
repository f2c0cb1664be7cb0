//! Short-lived materialized query results.
//!
//! The cache is strictly best effort: a failing store turns every read into a miss and
//! every write into a no-op, and the caller never sees the error.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::{
    config::LeaderboardConfig,
    error::CacheError,
    keys,
    model::{constants::MAX_LIMIT, structures::game_mode::GameMode}
};

pub mod memory;
pub mod redis_store;

pub use memory::MemoryCache;
pub use redis_store::RedisCache;

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, keys: &[String]) -> Result<(), CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;
}

/// JSON layer over a [`CacheStore`] with the leaderboard's TTLs and invalidation rules.
#[derive(Clone)]
pub struct ReadThroughCache {
    store: Arc<dyn CacheStore>,
    top_players_ttl: Duration,
    player_rank_ttl: Duration
}

impl ReadThroughCache {
    pub fn new(store: Arc<dyn CacheStore>, config: &LeaderboardConfig) -> Self {
        Self {
            store,
            top_players_ttl: config.top_players_ttl,
            player_rank_ttl: config.player_rank_ttl
        }
    }

    pub fn top_players_ttl(&self) -> Duration {
        self.top_players_ttl
    }

    pub fn player_rank_ttl(&self) -> Duration {
        self.player_rank_ttl
    }

    /// Cached value under `key`. Store errors and undecodable payloads count as a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> Option<T> {
        if ttl.is_zero() {
            return None;
        }

        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Cache read for {} failed, bypassing: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!("Cache hit for {}", key);
                Some(value)
            }
            Err(e) => {
                warn!("Discarding undecodable cache entry {}: {}", key, e);
                None
            }
        }
    }

    pub async fn put_json<T: Serialize + Sync>(&self, key: &str, value: &T, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }

        let result = match serde_json::to_string(value) {
            Ok(raw) => self.store.set_ex(key, raw, ttl).await,
            Err(e) => Err(CacheError::from(e))
        };

        if let Err(e) = result {
            warn!("Cache write for {} failed, skipping: {}", key, e);
        }
    }

    /// Drops every entry a change to this user's total can make stale: all top-N lists
    /// of the mode and the user's own rank.
    pub async fn invalidate_player(&self, user_id: i32, mode: GameMode) {
        let mut stale = top_player_keys(mode);
        stale.push(keys::player_rank(user_id, mode));
        stale.push(keys::player_total(user_id, mode));
        self.delete(&stale).await;
    }

    pub async fn invalidate_top(&self, mode: GameMode) {
        self.delete(&top_player_keys(mode)).await;
    }

    async fn delete(&self, stale: &[String]) {
        if let Err(e) = self.store.delete(stale).await {
            warn!("Cache invalidation of {} keys failed: {}", stale.len(), e);
        }
    }

    pub async fn ping(&self) -> Result<(), CacheError> {
        self.store.ping().await
    }
}

/// Top-N keys exist for every valid limit, so they can be listed without a key scan.
fn top_player_keys(mode: GameMode) -> Vec<String> {
    (1..=MAX_LIMIT as usize).map(|limit| keys::top_players(mode, limit)).collect()
}
