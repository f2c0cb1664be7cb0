use futures::future::join_all;
use scoreforge::{
    database::ledger::{ScoreLedger, UserDirectory},
    model::structures::game_mode::GameMode
};
use serial_test::serial;
use std::sync::Arc;

use super::test_helpers::TestDatabase;
use crate::common::init_test_env;

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn test_record_event_accumulates() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let ids = test_db.create_users(1).await.expect("Failed to create users");
    let ledger = &test_db.client;

    let first = ledger.record_event(ids[0], 1000, GameMode::Story).await.unwrap();
    assert_eq!(first.previous_total, None);
    assert_eq!(first.total_score, 1000);

    let second = ledger.record_event(ids[0], 500, GameMode::Story).await.unwrap();
    assert_eq!(second.previous_total, Some(1000));
    assert_eq!(second.total_score, 1500);

    let aggregate = ledger.get_aggregate(ids[0], GameMode::Story).await.unwrap().unwrap();
    assert_eq!(aggregate.total_score, 1500);
    assert_eq!(aggregate.rank, None);
    assert_eq!(ledger.get_aggregate(ids[0], GameMode::Multiplayer).await.unwrap(), None);

    let sessions: i64 = test_db
        .client
        .client()
        .query_one("SELECT COUNT(*) FROM game_sessions", &[])
        .await
        .unwrap()
        .get(0);
    assert_eq!(sessions, 2);
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn test_failed_event_leaves_no_partial_state() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let ledger = &test_db.client;

    // No such user: the foreign key aborts the transaction
    assert!(ledger.record_event(4242, 100, GameMode::Story).await.is_err());

    let client = test_db.client.client();
    let sessions: i64 = client
        .query_one("SELECT COUNT(*) FROM game_sessions", &[])
        .await
        .unwrap()
        .get(0);
    let aggregates: i64 = client
        .query_one("SELECT COUNT(*) FROM leaderboard", &[])
        .await
        .unwrap()
        .get(0);
    assert_eq!(sessions, 0);
    assert_eq!(aggregates, 0);
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn test_concurrent_increments_are_not_lost() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let ids = test_db.create_users(3).await.expect("Failed to create users");
    let ledger = Arc::new(test_db.client.clone());

    let tasks = ids.iter().flat_map(|&id| {
        let ledger = ledger.clone();
        (1..=20).map(move |score| {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.record_event(id, score, GameMode::Story).await })
        })
    });

    for result in join_all(tasks).await {
        result.expect("task panicked").expect("record_event failed");
    }

    for id in ids {
        let aggregate = ledger.get_aggregate(id, GameMode::Story).await.unwrap().unwrap();
        assert_eq!(aggregate.total_score, (1..=20).sum::<i64>());
    }
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn test_fallback_queries_and_rank_snapshot() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let ids = test_db.create_users(4).await.expect("Failed to create users");
    let ledger = &test_db.client;

    for (id, score) in ids.iter().zip([300, 100, 400, 200]) {
        ledger.record_event(*id, score, GameMode::Story).await.unwrap();
    }

    let top = ledger.top_n(GameMode::Story, 2).await.unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].user_id, ids[2]);
    assert_eq!(top[0].username.as_deref(), Some("user_3"));
    assert_eq!(top[1].user_id, ids[0]);

    assert_eq!(ledger.count_above(GameMode::Story, 200).await.unwrap(), 2);
    assert_eq!(ledger.count_above(GameMode::Story, 400).await.unwrap(), 0);
    assert_eq!(ledger.aggregates(GameMode::Story).await.unwrap().len(), 4);

    assert_eq!(ledger.store_rank_snapshot(GameMode::Story).await.unwrap(), 4);
    let ranked = ledger.get_aggregate(ids[1], GameMode::Story).await.unwrap().unwrap();
    assert_eq!(ranked.rank, Some(4));
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn test_user_directory() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let ids = test_db.create_users(3).await.expect("Failed to create users");
    let directory = &test_db.client;

    assert_eq!(directory.user_count().await.unwrap(), 3);

    let names = directory.usernames(&[ids[0], ids[2], 9999]).await.unwrap();
    assert_eq!(names.len(), 2);
    assert_eq!(names[&ids[2]], "user_3");
    assert!(directory.usernames(&[]).await.unwrap().is_empty());

    directory.ping().await.unwrap();
}
