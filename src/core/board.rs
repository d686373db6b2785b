//! Board and row representation
//!
//! A board is one guessing grid with its own hidden target word. Rows are
//! appended as guesses are typed; the last row is the open row until the
//! board completes.

use super::feedback::MatchState;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Completion state of a board
///
/// `Success` and `Fail` are terminal: no evaluator operation changes a
/// board once it leaves `Incomplete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Completion {
    #[default]
    Incomplete,
    Success,
    Fail,
}

impl Completion {
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Incomplete)
    }
}

/// One row of a board
///
/// Letters typed into the open row are tagged `Invalid` until the row is
/// committed by `enter`, which replaces the tags with real feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub width: usize,
    pub letters: Vec<(char, MatchState)>,
    #[serde(default)]
    pub committed: bool,
}

impl Row {
    #[must_use]
    pub const fn new(width: usize) -> Self {
        Self {
            width,
            letters: Vec::new(),
            committed: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.letters.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.letters.len() >= self.width
    }

    /// The typed letters as a string
    #[must_use]
    pub fn word(&self) -> String {
        self.letters.iter().map(|(c, _)| c).collect()
    }

    /// Feedback states in letter order
    #[must_use]
    pub fn states(&self) -> Vec<MatchState> {
        self.letters.iter().map(|(_, state)| *state).collect()
    }
}

/// A single board: target word, row history and completion state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardState {
    pub target: String,
    pub rows: Vec<Row>,
    pub complete: Completion,
}

impl BoardState {
    /// Create an empty board for `target`
    ///
    /// The target is normalised to lower case.
    #[must_use]
    pub fn new(target: &str) -> Self {
        Self {
            target: target.to_lowercase(),
            rows: Vec::new(),
            complete: Completion::Incomplete,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.complete.is_terminal()
    }

    /// The open (last) row, if any
    #[inline]
    #[must_use]
    pub fn open_row(&self) -> Option<&Row> {
        self.rows.last()
    }

    /// Number of committed rows
    #[must_use]
    pub fn guesses_used(&self) -> usize {
        self.rows.iter().filter(|row| row.committed).count()
    }

    /// Best feedback seen for each letter across committed rows
    #[must_use]
    pub fn letter_hints(&self) -> FxHashMap<char, MatchState> {
        let mut hints: FxHashMap<char, MatchState> = FxHashMap::default();
        for row in self.rows.iter().filter(|row| row.committed) {
            for &(letter, state) in &row.letters {
                hints
                    .entry(letter)
                    .and_modify(|best| *best = (*best).max(state))
                    .or_insert(state);
            }
        }
        hints
    }
}
