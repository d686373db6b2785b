//! Statistics per game shape (word length and board count)

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::store::{PersistenceStore, StoreError, load_json, save_json};

/// Receives the result of each finished board group
pub trait StatsAggregator: Send + Sync {
    /// Record one finished game
    ///
    /// # Errors
    /// Returns `StoreError` if the statistics cannot be saved.
    fn record(
        &mut self,
        letter_count: usize,
        board_group_size: usize,
        wins: usize,
        losses: usize,
        distribution: &BTreeMap<usize, u32>,
    ) -> Result<(), StoreError>;
}

/// Running totals for one game shape
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Statistics {
    pub played: u32,
    pub wins: u32,
    pub losses: u32,
    /// Solved boards per guess count
    pub distribution: BTreeMap<usize, u32>,
    /// Games in a row with no lost board
    pub current_streak: u32,
    pub max_streak: u32,
}

impl Statistics {
    pub fn add_game(&mut self, wins: usize, losses: usize, distribution: &BTreeMap<usize, u32>) {
        self.played += 1;
        self.wins += u32::try_from(wins).unwrap_or(u32::MAX);
        self.losses += u32::try_from(losses).unwrap_or(u32::MAX);
        for (&guesses, &count) in distribution {
            *self.distribution.entry(guesses).or_insert(0) += count;
        }

        if losses == 0 {
            self.current_streak += 1;
            self.max_streak = self.max_streak.max(self.current_streak);
        } else {
            self.current_streak = 0;
        }
    }

    /// Share of boards solved, in percent
    #[must_use]
    pub fn win_rate(&self) -> f64 {
        let boards = self.wins + self.losses;
        if boards == 0 {
            return 0.0;
        }
        f64::from(self.wins) * 100.0 / f64::from(boards)
    }
}

/// Statistics kept in a persistence store under `stats-<letters>x<boards>`
pub struct StoredStatistics {
    store: Arc<dyn PersistenceStore>,
}

impl StoredStatistics {
    #[must_use]
    pub fn new(store: Arc<dyn PersistenceStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn key(letter_count: usize, board_group_size: usize) -> String {
        format!("stats-{letter_count}x{board_group_size}")
    }

    /// Current totals for a game shape
    ///
    /// # Errors
    /// Returns `StoreError` if the stored record cannot be read.
    pub fn load(
        &self,
        letter_count: usize,
        board_group_size: usize,
    ) -> Result<Statistics, StoreError> {
        let key = Self::key(letter_count, board_group_size);
        Ok(load_json(self.store.as_ref(), &key)?.unwrap_or_default())
    }
}

impl StatsAggregator for StoredStatistics {
    fn record(
        &mut self,
        letter_count: usize,
        board_group_size: usize,
        wins: usize,
        losses: usize,
        distribution: &BTreeMap<usize, u32>,
    ) -> Result<(), StoreError> {
        let mut stats = self.load(letter_count, board_group_size)?;
        stats.add_game(wins, losses, distribution);
        save_json(
            self.store.as_ref(),
            &Self::key(letter_count, board_group_size),
            &stats,
        )
    }
}
