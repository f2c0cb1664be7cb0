use super::{
    db_structs::{AggregateEntry, LeaderboardRow, RecordedScore},
    ledger::{ScoreLedger, UserDirectory}
};
use crate::{error::LedgerError, model::structures::game_mode::GameMode};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use postgres_types::ToSql;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use tokio_postgres::{Client, Error, NoTls, Row};
use tracing::{debug, error, info};

const SCHEMA: &str = include_str!("schema.sql");

/// PostgreSQL-backed score ledger.
///
/// Reads share one pipelined connection. Writes need `&mut Client` for a transaction, so
/// they go through a fixed set of writer connections picked by user id: submissions for
/// the same user queue on the same connection while different users spread out.
#[derive(Clone)]
pub struct DbClient {
    reader: Arc<Client>,
    writers: Arc<Vec<Mutex<Client>>>
}

impl DbClient {
    // Connect to the database and return a DbClient instance
    pub async fn connect(connection_str: &str, write_connections: usize) -> Result<Self, Error> {
        let reader = Self::open(connection_str).await?;

        let mut writers = Vec::with_capacity(write_connections.max(1));
        for _ in 0..write_connections.max(1) {
            writers.push(Mutex::new(Self::open(connection_str).await?));
        }

        info!("Connected to the ledger database with {} writer connection(s)", writers.len());

        Ok(DbClient {
            reader: Arc::new(reader),
            writers: Arc::new(writers)
        })
    }

    async fn open(connection_str: &str) -> Result<Client, Error> {
        let (client, connection) = tokio_postgres::connect(connection_str, NoTls).await?;

        // Spawn the connection object to run in the background
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("connection error: {}", e);
            }
        });

        Ok(client)
    }

    /// Creates the ledger tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), Error> {
        self.reader.batch_execute(SCHEMA).await?;
        info!("Ledger schema verified");
        Ok(())
    }

    fn writer_for(&self, user_id: i32) -> &Mutex<Client> {
        &self.writers[user_id.unsigned_abs() as usize % self.writers.len()]
    }

    fn aggregate_from_row(row: &Row, mode: GameMode) -> AggregateEntry {
        AggregateEntry {
            user_id: row.get("user_id"),
            mode,
            total_score: row.get("total_score"),
            rank: row.get("rank")
        }
    }

    // Access the underlying read client
    pub fn client(&self) -> Arc<Client> {
        Arc::clone(&self.reader)
    }
}

#[async_trait]
impl ScoreLedger for DbClient {
    async fn record_event(&self, user_id: i32, score: i32, mode: GameMode) -> Result<RecordedScore, LedgerError> {
        let mut client = self.writer_for(user_id).lock().await;
        let tx = client.transaction().await?;

        let mode_name = mode.as_str();
        let event: &[&(dyn ToSql + Sync)] = &[&user_id, &score, &mode_name];
        let occurred_at: DateTime<Utc> = tx
            .query_one(
                "INSERT INTO game_sessions (user_id, score, game_mode) VALUES ($1, $2, $3) RETURNING timestamp",
                event
            )
            .await?
            .get("timestamp");

        // The upsert takes the row lock, so concurrent submissions to the same
        // (user, mode) apply one after another in commit order.
        let delta = score as i64;
        let aggregate: &[&(dyn ToSql + Sync)] = &[&user_id, &mode_name, &delta];
        let row = tx
            .query_one(
                "INSERT INTO leaderboard (user_id, game_mode, total_score) VALUES ($1, $2, $3) \
                 ON CONFLICT (user_id, game_mode) \
                 DO UPDATE SET total_score = leaderboard.total_score + EXCLUDED.total_score \
                 RETURNING total_score, (xmax = 0) AS inserted",
                aggregate
            )
            .await?;

        tx.commit().await?;

        let total_score: i64 = row.get("total_score");
        let inserted: bool = row.get("inserted");

        debug!("Recorded {} for user {} in {} (total {})", score, user_id, mode, total_score);

        Ok(RecordedScore {
            user_id,
            mode,
            previous_total: (!inserted).then_some(total_score - delta),
            total_score,
            occurred_at
        })
    }

    async fn get_aggregate(&self, user_id: i32, mode: GameMode) -> Result<Option<AggregateEntry>, LedgerError> {
        let row = self
            .reader
            .query_opt(
                "SELECT user_id, total_score, rank FROM leaderboard WHERE user_id = $1 AND game_mode = $2",
                &[&user_id, &mode.as_str()]
            )
            .await?;

        Ok(row.map(|r| Self::aggregate_from_row(&r, mode)))
    }

    async fn top_n(&self, mode: GameMode, limit: usize) -> Result<Vec<LeaderboardRow>, LedgerError> {
        let limit = limit as i64;
        let rows = self
            .reader
            .query(
                "SELECT l.user_id, u.username, l.total_score FROM leaderboard l \
                 LEFT JOIN users u ON u.id = l.user_id \
                 WHERE l.game_mode = $1 \
                 ORDER BY l.total_score DESC \
                 LIMIT $2",
                &[&mode.as_str(), &limit]
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| LeaderboardRow {
                user_id: row.get("user_id"),
                username: row.get("username"),
                total_score: row.get("total_score")
            })
            .collect())
    }

    async fn count_above(&self, mode: GameMode, score: i64) -> Result<u64, LedgerError> {
        let count: i64 = self
            .reader
            .query_one(
                "SELECT COUNT(*) FROM leaderboard WHERE game_mode = $1 AND total_score > $2",
                &[&mode.as_str(), &score]
            )
            .await?
            .get(0);

        Ok(count.max(0) as u64)
    }

    async fn aggregates(&self, mode: GameMode) -> Result<Vec<AggregateEntry>, LedgerError> {
        let rows = self
            .reader
            .query(
                "SELECT user_id, total_score, rank FROM leaderboard WHERE game_mode = $1",
                &[&mode.as_str()]
            )
            .await?;

        Ok(rows.iter().map(|row| Self::aggregate_from_row(row, mode)).collect())
    }

    async fn store_rank_snapshot(&self, mode: GameMode) -> Result<u64, LedgerError> {
        let mut client = self.writers[0].lock().await;
        let tx = client.transaction().await?;

        let updated = tx
            .execute(
                "UPDATE leaderboard l SET rank = ranked.position \
                 FROM (SELECT id, ROW_NUMBER() OVER (ORDER BY total_score DESC) AS position \
                       FROM leaderboard WHERE game_mode = $1) ranked \
                 WHERE l.id = ranked.id",
                &[&mode.as_str()]
            )
            .await?;

        tx.commit().await?;

        info!("Stored rank snapshot for {} rows in {}", updated, mode);
        Ok(updated)
    }

    async fn ping(&self) -> Result<(), LedgerError> {
        self.reader.simple_query("SELECT 1").await?;
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for DbClient {
    async fn usernames(&self, user_ids: &[i32]) -> Result<HashMap<i32, String>, LedgerError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = self
            .reader
            .query("SELECT id, username FROM users WHERE id = ANY($1)", &[&user_ids])
            .await?;

        Ok(rows
            .iter()
            .map(|row| (row.get::<_, i32>("id"), row.get::<_, String>("username")))
            .collect())
    }

    async fn create_user(&self, username: &str) -> Result<i32, LedgerError> {
        let id: i32 = self
            .reader
            .query_one("INSERT INTO users (username) VALUES ($1) RETURNING id", &[&username])
            .await?
            .get("id");

        Ok(id)
    }

    async fn user_count(&self) -> Result<u64, LedgerError> {
        let count: i64 = self.reader.query_one("SELECT COUNT(*) FROM users", &[]).await?.get(0);
        Ok(count.max(0) as u64)
    }
}
