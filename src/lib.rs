//! Wordle Duet
//!
//! A daily word-guessing game over one or more boards, played alone or by two
//! players sharing the same boards over a direct peer-to-peer data channel.
//!
//! # Quick Start
//!
//! ```rust
//! use wordle_duet::core::{GameState, Key, KeyOutcome};
//! use wordle_duet::wordlists::WordLists;
//!
//! let words = WordLists::embedded();
//! let mut game = GameState::new(&["crane"], 6, 1).unwrap();
//! for key in "slate".chars().map(Key::Letter).chain([Key::Enter]) {
//!     let (next, outcome) = game.apply_key(key, &words);
//!     assert_eq!(outcome, KeyOutcome::Applied);
//!     game = next;
//! }
//! println!("{}", game.share_text());
//! ```

// Core domain types
pub mod core;

// Word lists and daily targets
pub mod wordlists;

// Relay pub/sub client and server
pub mod signaling;

// Peer links and the handshake
pub mod transport;

// Event replication over the peer channel
pub mod replication;

// Session controller and task
pub mod session;

// Configuration file and environment
pub mod config;

// Command implementations
pub mod commands;

// Terminal output formatting
pub mod output;

// Interactive TUI interface
pub mod interactive;
