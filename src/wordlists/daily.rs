//! Daily target selection
//!
//! The seeded stream lives inside a [`DailyContext`] that is consumed by the
//! one call that needs it, so a day's targets can only be drawn once per
//! context and there is no shared generator.

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::{SystemTime, UNIX_EPOCH};

const SECONDS_PER_DAY: u64 = 86_400;

/// Seeded random stream for one day's board group
pub struct DailyContext {
    day: u64,
    rng: StdRng,
}

impl DailyContext {
    /// Context for a given day number (days since the Unix epoch)
    ///
    /// Different board shapes on the same day draw different targets.
    #[must_use]
    pub fn for_day(day: u64, letter_count: usize, board_count: usize) -> Self {
        let seed = day
            .wrapping_mul(1_000)
            .wrapping_add(letter_count as u64 * 10)
            .wrapping_add(board_count as u64);
        Self {
            day,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Context for the current UTC day
    #[must_use]
    pub fn today(letter_count: usize, board_count: usize) -> Self {
        let day = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs() / SECONDS_PER_DAY);
        Self::for_day(day, letter_count, board_count)
    }

    #[must_use]
    pub const fn day(&self) -> u64 {
        self.day
    }

    /// Draw `count` distinct targets from `answers`
    ///
    /// Consumes the context. Returns fewer than `count` words only when the
    /// list is shorter than that.
    #[must_use]
    pub fn pick_targets(mut self, answers: &[String], count: usize) -> Vec<String> {
        let amount = count.min(answers.len());
        rand::seq::index::sample(&mut self.rng, answers.len(), amount)
            .into_iter()
            .map(|i| answers[i].clone())
            .collect()
    }
}
