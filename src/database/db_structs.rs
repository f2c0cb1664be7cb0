use crate::model::structures::game_mode::GameMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single submitted score. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEvent {
    pub user_id: i32,
    pub score: i32,
    pub mode: GameMode,
    pub occurred_at: DateTime<Utc>
}

/// Running total for a (user, mode) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateEntry {
    pub user_id: i32,
    pub mode: GameMode,
    pub total_score: i64,
    /// Snapshot written by the rank recalculation. Never read on the query path.
    pub rank: Option<i32>
}

/// Outcome of a committed submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedScore {
    pub user_id: i32,
    pub mode: GameMode,
    /// `None` when this submission created the aggregate
    pub previous_total: Option<i64>,
    pub total_score: i64,
    pub occurred_at: DateTime<Utc>
}

/// Row of the direct ordered fallback query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardRow {
    pub user_id: i32,
    pub username: Option<String>,
    pub total_score: i64
}
