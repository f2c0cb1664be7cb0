use thiserror::Error;

use crate::model::constants::{MAX_LIMIT, MAX_SCORE, MAX_USER_ID, MIN_LIMIT, MIN_USER_ID};

/// Malformed input, rejected before any store is touched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Score must be between 0 and {max}, got {0}", max = MAX_SCORE)]
    Score(i64),

    #[error("User ID must be between {min} and {max}, got {0}", min = MIN_USER_ID, max = MAX_USER_ID)]
    UserId(i64),

    #[error("Limit must be between {min} and {max}, got {0}", min = MIN_LIMIT, max = MAX_LIMIT)]
    Limit(i64),

    #[error("Game mode must be one of: story, multiplayer (got '{0}')")]
    GameMode(String)
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("Ledger unavailable: {0}")]
    Unavailable(String)
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Rank index error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Rank index unavailable: {0}")]
    Unavailable(String),

    #[error("Bucket {0} is out of range")]
    BucketOutOfRange(usize)
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Failed to (de)serialize cached value: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache unavailable: {0}")]
    Unavailable(String)
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to read aggregates from the ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Failed to write the rank index: {0}")]
    Index(#[from] IndexError)
}

/// Errors surfaced to callers of the leaderboard. Index and cache failures never
/// show up here; they are absorbed by falling back to the ledger.
#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Score submission rejected: {0}")]
    Durability(#[source] LedgerError),

    #[error("Rank temporarily unavailable: {0}")]
    Unavailable(#[source] LedgerError)
}
