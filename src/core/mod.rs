//! Core domain types for the game
//!
//! This module contains the board evaluator and game state. Everything here
//! is pure and deterministic: two peers applying the same keys in the same
//! order reach the same state.

mod board;
pub mod evaluator;
mod feedback;
mod game;

pub use board::{BoardState, Completion, Row};
pub use feedback::{MatchState, evaluate, is_perfect, to_emoji};
pub use game::{BoardRecord, GameError, GameState, Key, KeyOutcome, WinState};
