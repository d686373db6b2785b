//! Game state across a group of boards
//!
//! Every keystroke is applied to all boards at once through the board
//! evaluator. Transitions are copy-on-write: `apply_key` returns the next
//! state and leaves `self` untouched.

use super::board::{BoardState, Completion};
use super::evaluator;
use super::feedback::{MatchState, to_emoji};
use crate::wordlists::WordSource;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// A keyed input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Letter(char),
    Remove,
    Enter,
}

/// Result of applying a key to a game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The state changed
    Applied,
    /// Nothing to do (full guess, empty guess, finished game, non-letter)
    Ignored,
    /// Enter on a full guess that is not in the word list
    NotInWordList,
}

/// Error creating a game
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("a game needs at least one target word")]
    NoTargets,
    #[error("target '{word}' has {found} letters, expected {expected}")]
    MixedLengths {
        word: String,
        expected: usize,
        found: usize,
    },
    #[error("active guess '{guess}' is longer than {letter_count} letters")]
    GuessTooLong { guess: String, letter_count: usize },
    #[error("board {board} has a row of width {width} with {letters} letters, expected {expected}")]
    RowShape {
        board: usize,
        width: usize,
        letters: usize,
        expected: usize,
    },
}

/// Live state of one game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub letter_count: usize,
    pub guesses_allowed: usize,
    pub columns: usize,
    pub active_guess: String,
    pub boards: Vec<BoardState>,
}

impl GameState {
    /// Create a fresh game with one board per target
    ///
    /// # Errors
    /// Returns `GameError` if `targets` is empty or the targets differ in length.
    pub fn new<S: AsRef<str>>(
        targets: &[S],
        guesses_allowed: usize,
        columns: usize,
    ) -> Result<Self, GameError> {
        let first = targets.first().ok_or(GameError::NoTargets)?;
        let letter_count = first.as_ref().chars().count();

        for target in targets {
            let found = target.as_ref().chars().count();
            if found != letter_count {
                return Err(GameError::MixedLengths {
                    word: target.as_ref().to_string(),
                    expected: letter_count,
                    found,
                });
            }
        }

        Ok(Self {
            letter_count,
            guesses_allowed,
            columns: columns.max(1),
            active_guess: String::new(),
            boards: targets.iter().map(|t| BoardState::new(t.as_ref())).collect(),
        })
    }

    /// Check a state received from elsewhere before adopting it
    ///
    /// # Errors
    /// Returns `GameError` if there are no boards, a target or row does not
    /// match `letter_count`, or the active guess is too long.
    pub fn validate(&self) -> Result<(), GameError> {
        if self.boards.is_empty() {
            return Err(GameError::NoTargets);
        }
        if self.active_guess.chars().count() > self.letter_count {
            return Err(GameError::GuessTooLong {
                guess: self.active_guess.clone(),
                letter_count: self.letter_count,
            });
        }

        for (index, board) in self.boards.iter().enumerate() {
            let found = board.target.chars().count();
            if found != self.letter_count {
                return Err(GameError::MixedLengths {
                    word: board.target.clone(),
                    expected: self.letter_count,
                    found,
                });
            }
            for row in &board.rows {
                if row.width != self.letter_count || row.letters.len() > row.width {
                    return Err(GameError::RowShape {
                        board: index,
                        width: row.width,
                        letters: row.letters.len(),
                        expected: self.letter_count,
                    });
                }
            }
        }
        Ok(())
    }

    /// Target words in board order
    #[must_use]
    pub fn targets(&self) -> Vec<&str> {
        self.boards.iter().map(|b| b.target.as_str()).collect()
    }

    /// True once every board has left `Incomplete`
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.boards.iter().all(BoardState::is_complete)
    }

    /// Apply one key to every board
    ///
    /// Letters are normalised to lower-case ASCII; anything else is ignored.
    /// `Enter` only commits a full guess found in `words`.
    #[must_use]
    pub fn apply_key(&self, key: Key, words: &dyn WordSource) -> (Self, KeyOutcome) {
        if self.is_complete() {
            return (self.clone(), KeyOutcome::Ignored);
        }

        match key {
            Key::Letter(ch) => self.press_letter(ch),
            Key::Remove => self.remove_letter(),
            Key::Enter => self.enter(words),
        }
    }

    fn press_letter(&self, ch: char) -> (Self, KeyOutcome) {
        if !ch.is_ascii_alphabetic() || self.active_guess.chars().count() >= self.letter_count {
            return (self.clone(), KeyOutcome::Ignored);
        }
        let ch = ch.to_ascii_lowercase();

        let mut next = self.clone();
        next.active_guess.push(ch);
        next.boards = self
            .boards
            .iter()
            .map(|board| evaluator::add_letter(board, self.letter_count, ch))
            .collect();
        (next, KeyOutcome::Applied)
    }

    fn remove_letter(&self) -> (Self, KeyOutcome) {
        if self.active_guess.is_empty() {
            return (self.clone(), KeyOutcome::Ignored);
        }

        let mut next = self.clone();
        next.active_guess.pop();
        next.boards = self.boards.iter().map(evaluator::remove_letter).collect();
        (next, KeyOutcome::Applied)
    }

    fn enter(&self, words: &dyn WordSource) -> (Self, KeyOutcome) {
        if self.active_guess.chars().count() != self.letter_count {
            return (self.clone(), KeyOutcome::Ignored);
        }
        if !words.is_valid(&self.active_guess) {
            return (self.clone(), KeyOutcome::NotInWordList);
        }

        let mut next = self.clone();
        next.active_guess.clear();
        next.boards = self
            .boards
            .iter()
            .map(|board| evaluator::enter(board, self.letter_count, self.guesses_allowed))
            .collect();
        (next, KeyOutcome::Applied)
    }

    /// Terminal snapshot, available once every board is complete
    #[must_use]
    pub fn win_state(&self) -> Option<WinState> {
        if !self.is_complete() {
            return None;
        }

        let records = self
            .boards
            .iter()
            .map(|board| match board.complete {
                Completion::Success => BoardRecord::Solved(board.guesses_used()),
                _ => BoardRecord::Lost,
            })
            .collect();

        Some(WinState {
            records,
            letter_count: self.letter_count,
            guesses_allowed: self.guesses_allowed,
            columns: self.columns,
        })
    }

    /// Best feedback per letter across all boards, for keyboard colouring
    ///
    /// A letter counts as `Match` if it is a match on any board.
    #[must_use]
    pub fn keyboard_hints(&self) -> FxHashMap<char, MatchState> {
        let mut hints: FxHashMap<char, MatchState> = FxHashMap::default();
        for board in &self.boards {
            for (letter, state) in board.letter_hints() {
                hints
                    .entry(letter)
                    .and_modify(|best| *best = (*best).max(state))
                    .or_insert(state);
            }
        }
        hints
    }

    /// Emoji grid of the committed rows, one block per board
    #[must_use]
    pub fn share_text(&self) -> String {
        let solved = self
            .boards
            .iter()
            .filter(|b| b.complete == Completion::Success)
            .count();
        let mut text = format!(
            "Wordle Duet {}x{} {solved}/{}\n",
            self.letter_count,
            self.boards.len(),
            self.boards.len()
        );

        for board in &self.boards {
            text.push('\n');
            for row in board.rows.iter().filter(|row| row.committed) {
                text.push_str(&to_emoji(&row.states()));
                text.push('\n');
            }
        }
        text
    }
}

/// Outcome of one board in a finished game
///
/// Serialized as `false` for a lost board or the number of guesses used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardRecord {
    Lost,
    Solved(usize),
}

impl Serialize for BoardRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Lost => serializer.serialize_bool(false),
            Self::Solved(guesses) => serializer.serialize_u64(*guesses as u64),
        }
    }
}

impl<'de> Deserialize<'de> for BoardRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Flag(bool),
            Guesses(usize),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Flag(false) => Ok(Self::Lost),
            Repr::Flag(true) => Err(serde::de::Error::custom(
                "a solved board is recorded by its guess count",
            )),
            Repr::Guesses(guesses) => Ok(Self::Solved(guesses)),
        }
    }
}

/// Terminal snapshot of a finished game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinState {
    pub records: Vec<BoardRecord>,
    pub letter_count: usize,
    pub guesses_allowed: usize,
    pub columns: usize,
}

impl WinState {
    #[must_use]
    pub fn wins(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r, BoardRecord::Solved(_)))
            .count()
    }

    #[must_use]
    pub fn losses(&self) -> usize {
        self.records.len() - self.wins()
    }

    /// Number of solved boards per guess count
    #[must_use]
    pub fn distribution(&self) -> BTreeMap<usize, u32> {
        let mut distribution = BTreeMap::new();
        for record in &self.records {
            if let BoardRecord::Solved(guesses) = record {
                *distribution.entry(*guesses).or_insert(0) += 1;
            }
        }
        distribution
    }
}
