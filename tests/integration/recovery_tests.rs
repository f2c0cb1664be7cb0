use std::sync::Arc;

use scoreforge::{
    cache::{MemoryCache, ReadThroughCache},
    config::LeaderboardConfig,
    database::ledger::ScoreLedger,
    error::SyncError,
    index::{IndexEntry, MemoryRankIndex, RankIndex},
    model::{constants::BUCKET_COUNT, leaderboard::Leaderboard, structures::game_mode::GameMode}
};

use crate::{common::TestEngine, leaderboard_tests::buckets_holding};

const TOTALS: [(i64, i64); 8] = [
    (1, 250),
    (2, 1_000),
    (3, 1_001),
    (4, 48_000),
    (5, 48_000),
    (6, 310_000),
    (7, 1_500_000),
    (8, 7_777)
];

async fn populate(engine: &TestEngine) {
    for (user, score) in TOTALS {
        engine.leaderboard.submit_score(user, score, GameMode::Story).await.unwrap();
    }
    engine.leaderboard.submit_score(1, 40, GameMode::Multiplayer).await.unwrap();
}

async fn snapshot(index: &dyn RankIndex, mode: GameMode) -> Vec<Vec<IndexEntry>> {
    let mut buckets = Vec::with_capacity(BUCKET_COUNT);
    for bucket in 0..BUCKET_COUNT {
        buckets.push(index.range_desc(mode, bucket).await.unwrap());
    }
    buckets
}

#[tokio::test]
async fn test_rebuild_restores_a_lost_index() {
    let engine = TestEngine::uncached();
    populate(&engine).await;
    let expected_top = engine.leaderboard.get_top_players(GameMode::Story, 100).await.unwrap();

    // Same ledger, brand new empty index
    let fresh_index = Arc::new(MemoryRankIndex::new());
    let restarted = Leaderboard::new(
        engine.ledger.clone(),
        fresh_index.clone(),
        ReadThroughCache::new(
            Arc::new(MemoryCache::new()),
            &LeaderboardConfig::default()
        ),
        engine.ledger.clone()
    );

    let summaries = restarted.rebuild_all().await.unwrap();
    assert_eq!(summaries.len(), 2);
    let story = summaries.iter().find(|s| s.mode == GameMode::Story).unwrap();
    assert_eq!(story.players, TOTALS.len());
    assert_eq!(story.bucket_sizes.iter().sum::<usize>(), TOTALS.len());
    assert_eq!(story.bucket_sizes[0], 2);

    assert_eq!(snapshot(fresh_index.as_ref(), GameMode::Story).await.concat().len(), TOTALS.len());
    assert_eq!(restarted.get_top_players(GameMode::Story, 100).await.unwrap(), expected_top);
    assert_eq!(
        restarted.get_player_rank(1, GameMode::Multiplayer).await.unwrap().unwrap().rank,
        1
    );
}

#[tokio::test]
async fn test_rebuild_is_idempotent() {
    let engine = TestEngine::uncached();
    populate(&engine).await;

    engine.leaderboard.rebuild_index(GameMode::Story).await.unwrap();
    let first = snapshot(engine.index.as_ref(), GameMode::Story).await;
    let first_top = engine.leaderboard.get_top_players(GameMode::Story, 100).await.unwrap();

    engine.leaderboard.rebuild_index(GameMode::Story).await.unwrap();
    let second = snapshot(engine.index.as_ref(), GameMode::Story).await;
    let second_top = engine.leaderboard.get_top_players(GameMode::Story, 100).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first_top, second_top);
}

#[tokio::test]
async fn test_rebuild_repairs_drift() {
    let engine = TestEngine::uncached();
    populate(&engine).await;

    // A ghost user, and user 1 duplicated into a wrong bucket
    engine.index.upsert(GameMode::Story, 5, 99, 60_000).await.unwrap();
    engine.index.upsert(GameMode::Story, 6, 1, 200_000).await.unwrap();

    engine.leaderboard.rebuild_index(GameMode::Story).await.unwrap();

    assert!(buckets_holding(engine.index.as_ref(), GameMode::Story, 99).await.is_empty());
    assert_eq!(buckets_holding(engine.index.as_ref(), GameMode::Story, 1).await, vec![0]);

    let top = engine.leaderboard.get_top_players(GameMode::Story, 1).await.unwrap();
    assert_eq!(top[0].user_id, 7);
}

#[tokio::test]
async fn test_rebuild_leaves_other_modes_alone() {
    let engine = TestEngine::uncached();
    populate(&engine).await;
    let before = snapshot(engine.index.as_ref(), GameMode::Multiplayer).await;

    engine.leaderboard.rebuild_index(GameMode::Story).await.unwrap();

    assert_eq!(snapshot(engine.index.as_ref(), GameMode::Multiplayer).await, before);
}

#[tokio::test]
async fn test_rebuild_invalidates_cached_top_lists() {
    let engine = TestEngine::new();
    populate(&engine).await;
    engine.leaderboard.get_top_players(GameMode::Story, 10).await.unwrap();
    assert_eq!(engine.cache.len(), 1);

    engine.leaderboard.rebuild_index(GameMode::Story).await.unwrap();

    assert!(engine.cache.is_empty());
}

#[tokio::test]
async fn test_rebuild_fails_without_ledger() {
    let engine = TestEngine::uncached();
    populate(&engine).await;
    let before = snapshot(engine.index.as_ref(), GameMode::Story).await;
    engine.ledger.set_available(false);

    let result = engine.leaderboard.rebuild_index(GameMode::Story).await;

    assert!(matches!(result, Err(SyncError::Ledger(_))));
    assert_eq!(snapshot(engine.index.as_ref(), GameMode::Story).await, before);
}

#[tokio::test]
async fn test_rebuild_fails_without_index() {
    let engine = TestEngine::uncached();
    populate(&engine).await;
    engine.index.set_available(false);

    let result = engine.leaderboard.rebuild_all().await;

    assert!(matches!(result, Err(SyncError::Index(_))));
}

#[tokio::test]
async fn test_recalculate_ranks_stores_positions() {
    let engine = TestEngine::uncached();
    populate(&engine).await;

    let summary = engine.leaderboard.recalculate_ranks(GameMode::Story).await.unwrap();
    assert_eq!(summary.ranked, TOTALS.len() as u64);
    assert_eq!(summary.rebuild.players, TOTALS.len());

    let aggregates = engine.ledger.aggregates(GameMode::Story).await.unwrap();
    let rank_of = |user: i32| aggregates.iter().find(|a| a.user_id == user).and_then(|a| a.rank);

    assert_eq!(rank_of(7), Some(1));
    assert_eq!(rank_of(6), Some(2));
    assert_eq!(rank_of(8), Some(5));
    assert_eq!(rank_of(1), Some(8));

    // Snapshot positions for distinct totals line up with the live top list
    let top = engine.leaderboard.get_top_players(GameMode::Story, 100).await.unwrap();
    for standing in top.iter().filter(|s| s.total_score != 48_000) {
        assert_eq!(rank_of(standing.user_id), Some(standing.rank as i32));
    }

    // Other modes are untouched
    let multiplayer = engine.ledger.get_aggregate(1, GameMode::Multiplayer).await.unwrap().unwrap();
    assert_eq!(multiplayer.rank, None);
}
