// Submission bounds
pub const MIN_SCORE: i64 = 0;
pub const MAX_SCORE: i64 = 1_000_000;
pub const MIN_USER_ID: i64 = 1;
pub const MAX_USER_ID: i64 = i32::MAX as i64;
// Top-N query bounds
pub const MIN_LIMIT: i64 = 1;
pub const MAX_LIMIT: i64 = 100;
pub const DEFAULT_LIMIT: usize = 10;
// Cache TTLs (seconds)
pub const TOP_PLAYERS_TTL_SECS: u64 = 30;
pub const PLAYER_RANK_TTL_SECS: u64 = 60;
// Inclusive upper bound of every bucket except the last, which is unbounded.
pub const BUCKET_UPPER_BOUNDS: [i64; 9] = [1_000, 5_000, 10_000, 25_000, 50_000, 100_000, 250_000, 500_000, 1_000_000];
pub const BUCKET_COUNT: usize = BUCKET_UPPER_BOUNDS.len() + 1;
