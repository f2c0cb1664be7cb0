//! Key layout shared by the Redis-backed rank index and result cache.

use crate::model::structures::game_mode::GameMode;

const PREFIX: &str = "leaderboard";

pub fn bucket(mode: GameMode, bucket: usize) -> String {
    format!("{}:bucket:{}:{}", PREFIX, mode, bucket)
}

pub fn top_players(mode: GameMode, limit: usize) -> String {
    format!("{}:top:{}:{}", PREFIX, mode, limit)
}

pub fn player_rank(user_id: i32, mode: GameMode) -> String {
    format!("{}:rank:{}:{}", PREFIX, user_id, mode)
}

pub fn player_total(user_id: i32, mode: GameMode) -> String {
    format!("{}:score:{}:{}", PREFIX, user_id, mode)
}
