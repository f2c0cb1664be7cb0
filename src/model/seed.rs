//! Demo data: a population of users with a handful of sessions each.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::info;

use crate::{
    database::ledger::UserDirectory,
    error::LeaderboardError,
    model::{leaderboard::Leaderboard, structures::game_mode::GameMode},
    utils::progress_utils::progress_bar
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedOptions {
    pub users: usize,
    /// Fixed seed for a reproducible population
    pub seed: u64
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self { users: 100, seed: 42 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedSummary {
    pub users: usize,
    pub sessions: usize,
    /// True when the directory already had users and nothing was written
    pub skipped: bool
}

/// Creates `user_1..user_N` and submits 5 to 10 sessions for each through the engine, so
/// the index and ledger agree afterwards. A directory that already has users is left
/// alone.
pub async fn seed(
    users: &dyn UserDirectory,
    leaderboard: &Leaderboard,
    options: SeedOptions
) -> Result<SeedSummary, LeaderboardError> {
    let existing = users.user_count().await.map_err(LeaderboardError::Unavailable)?;
    if existing > 0 {
        info!("Found {} users, skipping seed", existing);
        return Ok(SeedSummary {
            users: 0,
            sessions: 0,
            skipped: true
        });
    }

    let modes: Vec<GameMode> = GameMode::iter().collect();
    let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
    let bar = progress_bar(options.users as u64, "Seeding users");
    let mut sessions = 0;

    for i in 1..=options.users {
        let user_id = users
            .create_user(&format!("user_{}", i))
            .await
            .map_err(LeaderboardError::Durability)?;

        for _ in 0..rng.random_range(5..=10) {
            let mode = modes[rng.random_range(0..modes.len())];
            let score = rng.random_range(100..10_100);
            leaderboard.submit_score(user_id as i64, score, mode).await?;
            sessions += 1;
        }

        if let Some(bar) = &bar {
            bar.inc(1);
        }
    }

    if let Some(bar) = &bar {
        bar.finish();
    }

    info!("Seeded {} users with {} sessions", options.users, sessions);
    Ok(SeedSummary {
        users: options.users,
        sessions,
        skipped: false
    })
}
