//! Rebuilding the rank index from the ledger.

use itertools::Itertools;
use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::{info, warn};

use crate::{
    database::db_structs::AggregateEntry,
    error::SyncError,
    index::IndexEntry,
    model::{
        bucket::bucket_for, constants::BUCKET_COUNT, leaderboard::Leaderboard, structures::game_mode::GameMode
    },
    utils::progress_utils::progress_bar
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildSummary {
    pub mode: GameMode,
    pub players: usize,
    /// Population of each bucket, lowest bucket first
    pub bucket_sizes: Vec<usize>
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankSnapshotSummary {
    pub mode: GameMode,
    pub ranked: u64,
    pub rebuild: RebuildSummary
}

impl Leaderboard {
    /// Replaces the index contents for `mode` with the ledger's current totals.
    ///
    /// Running it again without intervening writes produces the same index. Submissions
    /// that land while it runs may be briefly missing until their next update.
    pub async fn rebuild_index(&self, mode: GameMode) -> Result<RebuildSummary, SyncError> {
        let aggregates = self.ledger.aggregates(mode).await?;
        let players = aggregates.len();

        let buckets = group_by_bucket(aggregates);
        let bucket_sizes = buckets.iter().map(Vec::len).collect();

        self.index.replace_mode(mode, buckets).await?;
        self.cache.invalidate_top(mode).await;

        info!("Rebuilt {} rank index with {} players", mode, players);
        Ok(RebuildSummary {
            mode,
            players,
            bucket_sizes
        })
    }

    pub async fn rebuild_all(&self) -> Result<Vec<RebuildSummary>, SyncError> {
        let modes: Vec<GameMode> = GameMode::iter().collect();
        let bar = progress_bar(modes.len() as u64, "Rebuilding rank index");

        let mut summaries = Vec::with_capacity(modes.len());
        for mode in modes {
            summaries.push(self.rebuild_index(mode).await?);
            if let Some(bar) = &bar {
                bar.inc(1);
            }
        }

        if let Some(bar) = &bar {
            bar.finish();
        }
        Ok(summaries)
    }

    /// [`Self::rebuild_all`] as run before serving. An index that can't be written is
    /// logged and left behind, since queries fall back to the ledger until it recovers.
    /// A ledger failure is returned.
    pub async fn startup_sync(&self) -> Result<Vec<RebuildSummary>, SyncError> {
        match self.rebuild_all().await {
            Err(SyncError::Index(e)) => {
                warn!("Startup index rebuild failed, serving from the ledger until the next rebuild: {}", e);
                Ok(Vec::new())
            }
            result => result
        }
    }

    /// Stores positional ranks in the ledger, then rebuilds the index from the same totals.
    pub async fn recalculate_ranks(&self, mode: GameMode) -> Result<RankSnapshotSummary, SyncError> {
        let ranked = self.ledger.store_rank_snapshot(mode).await?;
        let rebuild = self.rebuild_index(mode).await?;

        info!("Recalculated {} ranks in {}", ranked, mode);
        Ok(RankSnapshotSummary { mode, ranked, rebuild })
    }
}

/// Groups aggregates into `BUCKET_COUNT` lists, each sorted by total descending. Ties are
/// ordered by user id so repeated rebuilds load entries identically.
fn group_by_bucket(aggregates: Vec<AggregateEntry>) -> Vec<Vec<IndexEntry>> {
    let mut grouped = vec![Vec::new(); BUCKET_COUNT];

    let by_bucket = aggregates
        .into_iter()
        .map(|aggregate| IndexEntry {
            user_id: aggregate.user_id,
            score: aggregate.total_score
        })
        .into_group_map_by(|entry| bucket_for(entry.score));

    for (bucket, entries) in by_bucket {
        grouped[bucket] = entries
            .into_iter()
            .sorted_by(|a, b| b.score.cmp(&a.score).then(a.user_id.cmp(&b.user_id)))
            .collect();
    }

    grouped
}
