use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering}
};

use async_trait::async_trait;
use chrono::Utc;
use itertools::Itertools;
use parking_lot::Mutex;

use super::{
    db_structs::{AggregateEntry, LeaderboardRow, RecordedScore, ScoreEvent},
    ledger::{ScoreLedger, UserDirectory}
};
use crate::{error::LedgerError, model::structures::game_mode::GameMode};

#[derive(Default)]
struct LedgerState {
    events: Vec<ScoreEvent>,
    aggregates: HashMap<(i32, GameMode), AggregateEntry>,
    users: HashMap<i32, String>,
    next_user_id: i32
}

/// In-process ledger. Each operation holds the state lock for its whole duration, which
/// gives `record_event` the same all-or-nothing behaviour as a database transaction.
///
/// `set_available(false)` makes every call fail, for exercising durability failures.
#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
    unavailable: AtomicBool
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Registers a user under a fixed id.
    pub fn insert_user(&self, user_id: i32, username: &str) {
        let mut state = self.state.lock();
        state.users.insert(user_id, username.to_string());
        state.next_user_id = state.next_user_id.max(user_id);
    }

    /// Every event recorded so far, oldest first.
    pub fn events(&self) -> Vec<ScoreEvent> {
        self.state.lock().events.clone()
    }

    fn check(&self) -> Result<(), LedgerError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("in-memory ledger disabled".to_string()));
        }
        Ok(())
    }

    /// Highest total first.
    fn ranked(state: &LedgerState, mode: GameMode) -> Vec<AggregateEntry> {
        state
            .aggregates
            .values()
            .filter(|entry| entry.mode == mode)
            .sorted_by(|a, b| b.total_score.cmp(&a.total_score).then(a.user_id.cmp(&b.user_id)))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ScoreLedger for MemoryLedger {
    async fn record_event(&self, user_id: i32, score: i32, mode: GameMode) -> Result<RecordedScore, LedgerError> {
        self.check()?;

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let occurred_at = Utc::now();

        state.events.push(ScoreEvent {
            user_id,
            score,
            mode,
            occurred_at
        });

        let existed = state.aggregates.contains_key(&(user_id, mode));
        let entry = state.aggregates.entry((user_id, mode)).or_insert(AggregateEntry {
            user_id,
            mode,
            total_score: 0,
            rank: None
        });

        let previous_total = entry.total_score;
        entry.total_score += score as i64;

        Ok(RecordedScore {
            user_id,
            mode,
            previous_total: existed.then_some(previous_total),
            total_score: entry.total_score,
            occurred_at
        })
    }

    async fn get_aggregate(&self, user_id: i32, mode: GameMode) -> Result<Option<AggregateEntry>, LedgerError> {
        self.check()?;
        Ok(self.state.lock().aggregates.get(&(user_id, mode)).cloned())
    }

    async fn top_n(&self, mode: GameMode, limit: usize) -> Result<Vec<LeaderboardRow>, LedgerError> {
        self.check()?;

        let state = self.state.lock();
        Ok(Self::ranked(&state, mode)
            .into_iter()
            .take(limit)
            .map(|entry| LeaderboardRow {
                user_id: entry.user_id,
                username: state.users.get(&entry.user_id).cloned(),
                total_score: entry.total_score
            })
            .collect())
    }

    async fn count_above(&self, mode: GameMode, score: i64) -> Result<u64, LedgerError> {
        self.check()?;

        let state = self.state.lock();
        Ok(state
            .aggregates
            .values()
            .filter(|entry| entry.mode == mode && entry.total_score > score)
            .count() as u64)
    }

    async fn aggregates(&self, mode: GameMode) -> Result<Vec<AggregateEntry>, LedgerError> {
        self.check()?;

        let state = self.state.lock();
        Ok(state.aggregates.values().filter(|entry| entry.mode == mode).cloned().collect())
    }

    async fn store_rank_snapshot(&self, mode: GameMode) -> Result<u64, LedgerError> {
        self.check()?;

        let mut state = self.state.lock();
        let ranked = Self::ranked(&state, mode);

        for (position, entry) in ranked.iter().enumerate() {
            if let Some(stored) = state.aggregates.get_mut(&(entry.user_id, mode)) {
                stored.rank = Some(position as i32 + 1);
            }
        }

        Ok(ranked.len() as u64)
    }

    async fn ping(&self) -> Result<(), LedgerError> {
        self.check()
    }
}

#[async_trait]
impl UserDirectory for MemoryLedger {
    async fn usernames(&self, user_ids: &[i32]) -> Result<HashMap<i32, String>, LedgerError> {
        self.check()?;

        let state = self.state.lock();
        Ok(user_ids
            .iter()
            .filter_map(|id| state.users.get(id).map(|name| (*id, name.clone())))
            .collect())
    }

    async fn create_user(&self, username: &str) -> Result<i32, LedgerError> {
        self.check()?;

        let mut state = self.state.lock();
        state.next_user_id += 1;
        let id = state.next_user_id;
        state.users.insert(id, username.to_string());
        Ok(id)
    }

    async fn user_count(&self) -> Result<u64, LedgerError> {
        self.check()?;
        Ok(self.state.lock().users.len() as u64)
    }
}
