use scoreforge::{
    database::ledger::ScoreLedger,
    error::LeaderboardError,
    index::RankIndex,
    model::structures::game_mode::GameMode
};

use crate::{common::TestEngine, leaderboard_tests::buckets_holding};

async fn populate(engine: &TestEngine) {
    for (user, score) in [(1, 5000), (2, 4000), (3, 3000), (4, 2000), (5, 1000)] {
        engine.leaderboard.submit_score(user, score, GameMode::Story).await.unwrap();
    }
}

#[tokio::test]
async fn test_index_outage_falls_back_to_ledger() {
    let engine = TestEngine::uncached();
    populate(&engine).await;

    let top_before = engine.leaderboard.get_top_players(GameMode::Story, 3).await.unwrap();
    let rank_before = engine.leaderboard.get_player_rank(4, GameMode::Story).await.unwrap();

    engine.index.set_available(false);

    assert_eq!(engine.leaderboard.get_top_players(GameMode::Story, 3).await.unwrap(), top_before);
    assert_eq!(engine.leaderboard.get_player_rank(4, GameMode::Story).await.unwrap(), rank_before);
}

#[tokio::test]
async fn test_submission_during_index_outage_is_durable() {
    let engine = TestEngine::uncached();
    populate(&engine).await;

    engine.index.set_available(false);
    let recorded = engine.leaderboard.submit_score(6, 7000, GameMode::Story).await.unwrap();
    assert_eq!(recorded.total_score, 7000);

    // Still answered correctly from the ledger
    let standing = engine.leaderboard.get_player_rank(6, GameMode::Story).await.unwrap().unwrap();
    assert_eq!(standing.rank, 1);

    // Once the index is back, the rank query re-inserts the missing entry
    engine.index.set_available(true);
    assert!(buckets_holding(engine.index.as_ref(), GameMode::Story, 6).await.is_empty());

    let standing = engine.leaderboard.get_player_rank(6, GameMode::Story).await.unwrap().unwrap();
    assert_eq!(standing.rank, 1);
    assert_eq!(buckets_holding(engine.index.as_ref(), GameMode::Story, 6).await, vec![2]);
}

#[tokio::test]
async fn test_stale_membership_is_healed_by_next_submission() {
    let engine = TestEngine::uncached();
    engine.leaderboard.submit_score(1, 900, GameMode::Story).await.unwrap();

    // Migration from bucket 0 to bucket 2 is lost
    engine.index.set_available(false);
    engine.leaderboard.submit_score(1, 5_000, GameMode::Story).await.unwrap();
    engine.index.set_available(true);
    assert_eq!(buckets_holding(engine.index.as_ref(), GameMode::Story, 1).await, vec![0]);

    engine.leaderboard.submit_score(1, 100, GameMode::Story).await.unwrap();

    assert_eq!(buckets_holding(engine.index.as_ref(), GameMode::Story, 1).await, vec![2]);
    let entries = engine.index.range_desc(GameMode::Story, 2).await.unwrap();
    assert_eq!(entries[0].score, 6_000);
}

#[tokio::test]
async fn test_stale_membership_is_healed_by_rank_query() {
    let engine = TestEngine::uncached();
    engine.leaderboard.submit_score(1, 900, GameMode::Story).await.unwrap();

    engine.index.set_available(false);
    engine.leaderboard.submit_score(1, 5_000, GameMode::Story).await.unwrap();
    engine.index.set_available(true);

    let standing = engine.leaderboard.get_player_rank(1, GameMode::Story).await.unwrap().unwrap();

    assert_eq!(standing.total_score, 5_900);
    assert_eq!(buckets_holding(engine.index.as_ref(), GameMode::Story, 1).await, vec![2]);
}

#[tokio::test]
async fn test_cache_outage_is_transparent() {
    let engine = TestEngine::new();
    populate(&engine).await;
    engine.cache.set_available(false);

    engine.leaderboard.submit_score(5, 10_000, GameMode::Story).await.unwrap();

    let top = engine.leaderboard.get_top_players(GameMode::Story, 1).await.unwrap();
    assert_eq!(top[0].user_id, 5);
    assert_eq!(top[0].total_score, 11_000);

    let standing = engine.leaderboard.get_player_rank(1, GameMode::Story).await.unwrap().unwrap();
    assert_eq!(standing.rank, 2);
}

#[tokio::test]
async fn test_ledger_outage_rejects_submissions() {
    let engine = TestEngine::uncached();
    populate(&engine).await;
    engine.ledger.set_available(false);

    let result = engine.leaderboard.submit_score(1, 100, GameMode::Story).await;
    assert!(matches!(result, Err(LeaderboardError::Durability(_))));

    engine.ledger.set_available(true);
    let aggregate = engine.ledger.get_aggregate(1, GameMode::Story).await.unwrap().unwrap();
    assert_eq!(aggregate.total_score, 5000);
    let entries = engine.index.range_desc(GameMode::Story, 1).await.unwrap();
    assert!(entries.iter().any(|e| e.user_id == 1 && e.score == 5000));
}

#[tokio::test]
async fn test_ledger_outage_makes_rank_unavailable() {
    let engine = TestEngine::uncached();
    populate(&engine).await;
    engine.ledger.set_available(false);

    let result = engine.leaderboard.get_player_rank(1, GameMode::Story).await;
    assert!(matches!(result, Err(LeaderboardError::Unavailable(_))));

    // The index alone can still serve the top list
    let top = engine.leaderboard.get_top_players(GameMode::Story, 2).await.unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].username, "user_1");
}

#[tokio::test]
async fn test_total_outage_of_index_and_ledger() {
    let engine = TestEngine::uncached();
    populate(&engine).await;
    engine.index.set_available(false);
    engine.ledger.set_available(false);

    let result = engine.leaderboard.get_top_players(GameMode::Story, 2).await;
    assert!(matches!(result, Err(LeaderboardError::Unavailable(_))));

    let report = engine.leaderboard.health().await;
    assert!(!report.database);
    assert!(!report.index);
    assert!(report.cache);
}
