use std::{process, sync::Arc};

use anyhow::Context;
use clap::Parser;
use scoreforge::{
    args::{Args, Command},
    cache::{
        redis_store::{connect_redis, redis_addr},
        CacheStore, MemoryCache, ReadThroughCache, RedisCache
    },
    config::LeaderboardConfig,
    database::db::DbClient,
    index::{MemoryRankIndex, RankIndex, RedisRankIndex},
    model::{
        leaderboard::Leaderboard,
        seed::{seed, SeedOptions}
    }
};
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let indicatif_layer = IndicatifLayer::new();
    tracing_subscriber::registry()
        .with(EnvFilter::new(&args.log_level))
        .with(tracing_subscriber::fmt::layer().with_writer(indicatif_layer.get_stderr_writer()))
        .with(indicatif_layer)
        .init();

    let db = match DbClient::connect(&args.connection_string, args.ledger_connections).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Application cannot start without a valid database connection: {}", e);
            process::exit(1);
        }
    };
    db.ensure_schema().await.context("Failed to apply the ledger schema")?;

    let (index, store) = projection_stores(args.redis_url.as_deref()).await;
    let cache = ReadThroughCache::new(store, &LeaderboardConfig::from_env());
    let leaderboard = Leaderboard::new(db.clone(), index, cache, db.clone());

    if args.skip_startup_sync {
        info!("Skipping startup index rebuild");
    } else {
        leaderboard.startup_sync().await.context("Startup index rebuild failed")?;
    }

    match args.command {
        Command::Submit { user_id, score, mode } => print_json(&leaderboard.submit_score(user_id, score, mode).await?),
        Command::Top { mode, limit } => print_json(&leaderboard.get_top_players(mode, limit).await?),
        Command::Rank { user_id, mode } => match leaderboard.get_player_rank(user_id, mode).await? {
            Some(standing) => print_json(&standing),
            None => {
                warn!("User {} has no score in {}", user_id, mode);
                print_json(&serde_json::Value::Null)
            }
        },
        Command::Rebuild { mode: Some(mode) } => print_json(&leaderboard.rebuild_index(mode).await?),
        Command::Rebuild { mode: None } => print_json(&leaderboard.rebuild_all().await?),
        Command::RecalculateRanks { mode } => print_json(&leaderboard.recalculate_ranks(mode).await?),
        Command::Seed { users, seed: rng_seed } => {
            let options = SeedOptions { users, seed: rng_seed };
            print_json(&seed(db.as_ref(), &leaderboard, options).await?)
        }
        Command::Health => {
            let report = leaderboard.health().await;
            print_json(&report)?;
            if !report.is_serving() {
                process::exit(1);
            }
            Ok(())
        }
    }
}

/// Redis-backed index and cache when a URL is given and reachable, in-process ones
/// otherwise. The in-process index starts empty and is filled by the startup rebuild.
async fn projection_stores(redis_url: Option<&str>) -> (Arc<dyn RankIndex>, Arc<dyn CacheStore>) {
    if let Some(url) = redis_url {
        match connect_redis(url).await {
            Ok(conn) => return (Arc::new(RedisRankIndex::new(conn.clone())), Arc::new(RedisCache::new(conn))),
            Err(e) => warn!(
                "Redis at {} unreachable, using in-process index and cache: {}",
                redis_addr(url),
                e
            )
        }
    } else {
        info!("No Redis URL configured, using in-process index and cache");
    }

    (Arc::new(MemoryRankIndex::new()), Arc::new(MemoryCache::new()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
