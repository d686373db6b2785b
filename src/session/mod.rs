//! Session orchestration
//!
//! A session owns the live game and, when shared, the signaling client, the
//! negotiator and the replicator. All of it is driven by one task so the
//! game has exactly one writer.
//!
//! ## Modules
//!
//! - [`controller`]: the single input path and collaborator calls
//! - [`runtime`]: the session task and its handle
//! - [`store`]: persistence collaborators
//! - [`stats`]: statistics collaborators

pub mod controller;
pub mod runtime;
pub mod stats;
pub mod store;

pub use controller::{Collaborators, RemoteOutcome, SessionController};
pub use runtime::{Session, SessionNotice, SessionOptions};
pub use stats::{Statistics, StatsAggregator, StoredStatistics};
pub use store::{FileStore, MemoryStore, PersistenceStore, StoreError};

use crate::core::Key;
use crate::signaling::SignalingError;
use crate::transport::TransportError;

/// Where an input came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Typed on this peer; broadcast after applying
    Local,
    /// Replayed from the peer; never broadcast again
    Remote,
}

/// One keyed input with its origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Input {
    pub key: Key,
    pub origin: Origin,
}

impl Input {
    #[must_use]
    pub const fn local(key: Key) -> Self {
        Self {
            key,
            origin: Origin::Local,
        }
    }

    #[must_use]
    pub const fn remote(key: Key) -> Self {
        Self {
            key,
            origin: Origin::Remote,
        }
    }
}

/// Errors from a session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session is closed")]
    AlreadyClosed,
    #[error(transparent)]
    Signaling(#[from] SignalingError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Store key of the game snapshot for a board shape
#[must_use]
pub fn snapshot_key(letter_count: usize, board_count: usize) -> String {
    format!("game-{letter_count}x{board_count}")
}
