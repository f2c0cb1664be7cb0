//! Ordered score set backing one bucket of the in-process rank index.
//!
//! Entries live in a `Vec` kept sorted by `(score desc, insertion sequence)` plus a
//! `HashMap` from member to its sort key. Rank and count-above are binary searches;
//! inserts and removals shift the `Vec`, which stays cheap at bucket sizes.
//!
//! Equal scores are ordered by when the member last changed score. That order is stable
//! but carries no meaning.

use std::{cmp::Reverse, collections::HashMap};

type SortKey = (Reverse<i64>, u64);

#[derive(Debug, Clone, Default)]
pub struct ScoreSet {
    sorted: Vec<(SortKey, i32)>,
    members: HashMap<i32, SortKey>,
    next_seq: u64
}

impl ScoreSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or moves a member. Returns `true` if the member was not present before.
    pub fn insert(&mut self, member: i32, score: i64) -> bool {
        let existed = match self.members.get(&member) {
            Some(key) if key.0 .0 == score => return false,
            Some(&key) => {
                if let Ok(idx) = self.search(key, member) {
                    self.sorted.remove(idx);
                }
                true
            }
            None => false
        };

        let key = (Reverse(score), self.next_seq);
        self.next_seq += 1;

        // Sequence numbers are unique, so the key is never already present
        let (Ok(idx) | Err(idx)) = self.search(key, member);
        self.sorted.insert(idx, (key, member));
        self.members.insert(member, key);

        !existed
    }

    /// Returns `true` if the member was present.
    pub fn remove(&mut self, member: i32) -> bool {
        match self.members.remove(&member) {
            Some(key) => {
                if let Ok(idx) = self.search(key, member) {
                    self.sorted.remove(idx);
                }
                true
            }
            None => false
        }
    }

    pub fn score(&self, member: i32) -> Option<i64> {
        self.members.get(&member).map(|key| key.0 .0)
    }

    /// 0-based position counting from the highest score.
    pub fn rank_desc(&self, member: i32) -> Option<usize> {
        let key = *self.members.get(&member)?;
        self.search(key, member).ok()
    }

    /// Number of members with a score strictly greater than `score`.
    pub fn count_above(&self, score: i64) -> usize {
        self.sorted.partition_point(|((Reverse(s), _), _)| *s > score)
    }

    /// `(member, score)` pairs, highest score first.
    pub fn iter_desc(&self) -> impl Iterator<Item = (i32, i64)> + '_ {
        self.sorted.iter().map(|((Reverse(score), _), member)| (*member, *score))
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    fn search(&self, key: SortKey, member: i32) -> Result<usize, usize> {
        self.sorted.binary_search(&(key, member))
    }
}
