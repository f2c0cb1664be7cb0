use std::{env, time::Duration};

use crate::model::constants::{PLAYER_RANK_TTL_SECS, TOP_PLAYERS_TTL_SECS};

/// Tuning for the leaderboard engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardConfig {
    /// How long a top-N result stays cached (`LEADERBOARD_CACHE_TTL`, seconds)
    pub top_players_ttl: Duration,
    /// How long a single player's rank stays cached (`CACHE_TTL`, seconds)
    pub player_rank_ttl: Duration
}

impl LeaderboardConfig {
    /// Reads TTL overrides from the environment. Missing or unparsable values fall back to
    /// the defaults; `0` disables caching for that result.
    pub fn from_env() -> Self {
        Self {
            top_players_ttl: ttl_from_env("LEADERBOARD_CACHE_TTL", TOP_PLAYERS_TTL_SECS),
            player_rank_ttl: ttl_from_env("CACHE_TTL", PLAYER_RANK_TTL_SECS)
        }
    }
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            top_players_ttl: Duration::from_secs(TOP_PLAYERS_TTL_SECS),
            player_rank_ttl: Duration::from_secs(PLAYER_RANK_TTL_SECS)
        }
    }
}

fn ttl_from_env(var: &str, default_secs: u64) -> Duration {
    let secs = env::var(var)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default_secs);

    Duration::from_secs(secs)
}
