use std::collections::HashMap;

use async_trait::async_trait;

use super::db_structs::{AggregateEntry, LeaderboardRow, RecordedScore};
use crate::{error::LedgerError, model::structures::game_mode::GameMode};

/// The durable source of truth for score events and per-(user, mode) totals.
///
/// Everything else in the crate is a projection that can be rebuilt from this.
#[async_trait]
pub trait ScoreLedger: Send + Sync {
    /// Appends the event and adds `score` to the aggregate in one transaction.
    /// Either both writes commit or neither does.
    async fn record_event(&self, user_id: i32, score: i32, mode: GameMode) -> Result<RecordedScore, LedgerError>;

    async fn get_aggregate(&self, user_id: i32, mode: GameMode) -> Result<Option<AggregateEntry>, LedgerError>;

    /// Direct ordered query, highest total first. Only used when the rank index is unusable.
    async fn top_n(&self, mode: GameMode, limit: usize) -> Result<Vec<LeaderboardRow>, LedgerError>;

    /// Number of aggregates in `mode` with a total strictly greater than `score`.
    async fn count_above(&self, mode: GameMode, score: i64) -> Result<u64, LedgerError>;

    /// Every aggregate for `mode`, in no particular order.
    async fn aggregates(&self, mode: GameMode) -> Result<Vec<AggregateEntry>, LedgerError>;

    /// Writes the positional rank snapshot for every aggregate in `mode`.
    /// Returns the number of rows updated.
    async fn store_rank_snapshot(&self, mode: GameMode) -> Result<u64, LedgerError>;

    async fn ping(&self) -> Result<(), LedgerError>;
}

/// Maps user ids to display names.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Ids with no known user are simply missing from the result.
    async fn usernames(&self, user_ids: &[i32]) -> Result<HashMap<i32, String>, LedgerError>;

    async fn create_user(&self, username: &str) -> Result<i32, LedgerError>;

    async fn user_count(&self) -> Result<u64, LedgerError>;
}
