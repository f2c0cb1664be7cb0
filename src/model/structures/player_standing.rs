use serde::{Deserialize, Serialize};

/// A player's position on a leaderboard, as returned by both top-N and rank queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStanding {
    pub user_id: i32,
    pub username: String,
    pub total_score: i64,
    /// 1-based
    pub rank: u64
}

/// Display name used when the user directory cannot resolve an id.
pub fn placeholder_username(user_id: i32) -> String {
    format!("user_{}", user_id)
}
