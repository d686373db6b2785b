//! Session controller
//!
//! The only component that changes the game. Local keystrokes and replayed
//! peer events both go through [`SessionController::input`], so both peers
//! run the same deterministic transitions. After every change the game is
//! saved; when the last board finishes the result goes to the statistics
//! collaborator and the end hook.

use std::sync::Arc;

use super::stats::StatsAggregator;
use super::store::{PersistenceStore, load_json, save_json};
use super::{Input, Origin, SessionError, snapshot_key};
use crate::core::{GameState, Key, KeyOutcome, WinState};
use crate::replication::{EventKind, Registration, ReplicationEvent, Replicator};
use crate::transport::Role;
use crate::wordlists::WordSource;

type EndHook = Box<dyn FnMut(&WinState) + Send + Sync>;

/// External services the controller calls out to
pub struct Collaborators {
    pub words: Arc<dyn WordSource>,
    pub store: Arc<dyn PersistenceStore>,
    pub stats: Box<dyn StatsAggregator>,
    pub on_end: Option<EndHook>,
}

/// What a replicated event did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// A replayed key
    Key(KeyOutcome),
    /// The game was replaced by the peer's snapshot
    Synced,
    /// A snapshot was sent in reply to a request
    Answered,
    /// The peer is leaving
    PeerClosed,
    Ignored,
}

pub struct SessionController {
    game: GameState,
    win: Option<WinState>,
    role: Option<Role>,
    collab: Collaborators,
    replicator: Option<Replicator>,
    registrations: Vec<Registration>,
}

impl SessionController {
    /// Start from the saved game for this board shape if it deals the same
    /// targets as `fresh`, otherwise from `fresh`.
    #[must_use]
    pub fn open(fresh: GameState, collab: Collaborators) -> Self {
        let key = snapshot_key(fresh.letter_count, fresh.boards.len());
        let game = match load_json::<GameState>(collab.store.as_ref(), &key) {
            Ok(Some(saved)) if saved.targets() == fresh.targets() => {
                log::info!("Restored saved game {key}");
                saved
            }
            Ok(_) => fresh,
            Err(e) => {
                log::warn!("Ignoring unreadable saved game {key}: {e}");
                fresh
            }
        };

        let mut controller = Self {
            win: game.win_state(),
            game,
            role: None,
            collab,
            replicator: None,
            registrations: Vec::new(),
        };
        controller.persist();
        controller
    }

    #[must_use]
    pub const fn game(&self) -> &GameState {
        &self.game
    }

    #[must_use]
    pub const fn win_state(&self) -> Option<&WinState> {
        self.win.as_ref()
    }

    #[must_use]
    pub const fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn set_role(&mut self, role: Option<Role>) {
        self.role = role;
    }

    #[must_use]
    pub const fn is_replicating(&self) -> bool {
        self.replicator.is_some()
    }

    /// Apply one keyed input
    ///
    /// Local input that changes the game is broadcast to the peer; remote
    /// input never is. A failed broadcast is logged and dropped.
    pub async fn input(&mut self, input: Input) -> KeyOutcome {
        let (next, outcome) = self.game.apply_key(input.key, self.collab.words.as_ref());
        if outcome != KeyOutcome::Applied {
            return outcome;
        }
        self.game = next;
        self.persist();

        if input.origin == Origin::Local {
            let event = match input.key {
                Key::Letter(ch) => ReplicationEvent::KeyPressed(ch.to_ascii_lowercase()),
                Key::Remove => ReplicationEvent::KeyRemoved,
                Key::Enter => ReplicationEvent::EnterPressed,
            };
            if let Err(e) = self.broadcast(&event).await {
                log::warn!("Keystroke not replicated: {e}");
            }
        }

        self.check_end();
        outcome
    }

    /// Handle an event received from the peer
    pub async fn handle_replicated(&mut self, event: ReplicationEvent) -> RemoteOutcome {
        let key = match event {
            ReplicationEvent::KeyPressed(ch) => Key::Letter(ch),
            ReplicationEvent::KeyRemoved => Key::Remove,
            ReplicationEvent::EnterPressed => Key::Enter,
            ReplicationEvent::Initialise(state) => {
                if let Err(e) = state.validate() {
                    log::warn!("Ignoring malformed snapshot: {e}");
                    return RemoteOutcome::Ignored;
                }
                self.apply_snapshot(*state);
                return RemoteOutcome::Synced;
            }
            ReplicationEvent::Request => {
                if self.role != Some(Role::Leader) {
                    log::debug!("Ignoring snapshot request as {:?}", self.role);
                    return RemoteOutcome::Ignored;
                }
                let snapshot = ReplicationEvent::Initialise(Box::new(self.game.clone()));
                if let Err(e) = self.broadcast(&snapshot).await {
                    log::warn!("Snapshot not sent: {e}");
                    return RemoteOutcome::Ignored;
                }
                return RemoteOutcome::Answered;
            }
            ReplicationEvent::Close => {
                log::info!("Peer closed the session");
                if let Some(mut replicator) = self.detach_replicator() {
                    replicator.dispose().await;
                }
                return RemoteOutcome::PeerClosed;
            }
        };
        RemoteOutcome::Key(self.input(Input::remote(key)).await)
    }

    /// Replace the game with a full snapshot
    ///
    /// An unfinished snapshot re-arms the end of game. A finished one is
    /// recorded only if this side had not already finished.
    pub fn apply_snapshot(&mut self, state: GameState) {
        if self.win.is_some() {
            self.win = state.win_state();
        }
        self.game = state;
        self.persist();
        self.check_end();
    }

    /// Ask the leader for its current game
    ///
    /// # Errors
    /// Returns `SessionError::Transport` if the request cannot be sent.
    pub async fn request_snapshot(&self) -> Result<(), SessionError> {
        self.broadcast(&ReplicationEvent::Request).await
    }

    /// Bind to a new replicator, replacing any previous one
    ///
    /// Listeners on the old replicator are removed before the new ones are
    /// added. Every peer event is handed to `forward`.
    pub fn attach_replicator<F>(&mut self, mut replicator: Replicator, forward: F)
    where
        F: Fn(ReplicationEvent) + Clone + Send + Sync + 'static,
    {
        // The old link is owned elsewhere; only its listeners are dropped here
        drop(self.detach_replicator());

        for kind in EventKind::ALL {
            let forward = forward.clone();
            let registration = replicator.register(kind, move |event| forward(event.clone()));
            self.registrations.push(registration);
        }
        self.replicator = Some(replicator);
    }

    /// Unregister every listener and hand back the replicator
    pub fn detach_replicator(&mut self) -> Option<Replicator> {
        let mut replicator = self.replicator.take()?;
        for registration in self.registrations.drain(..) {
            replicator.unregister(registration);
        }
        Some(replicator)
    }

    /// Pass a data channel payload to the replicator
    pub fn on_peer_message(&mut self, text: &str) {
        match self.replicator.as_mut() {
            Some(replicator) => {
                replicator.receive(text);
            }
            None => log::debug!("Dropping peer message with no replicator attached"),
        }
    }

    /// Leave the shared session, telling the peer if asked to
    pub async fn close_replication(&mut self, notify_peer: bool) {
        if let Some(mut replicator) = self.detach_replicator() {
            if notify_peer {
                replicator.close().await;
            } else {
                replicator.dispose().await;
            }
        }
    }

    async fn broadcast(&self, event: &ReplicationEvent) -> Result<(), SessionError> {
        if let Some(replicator) = &self.replicator {
            replicator.send(event).await?;
        }
        Ok(())
    }

    fn persist(&self) {
        let key = snapshot_key(self.game.letter_count, self.game.boards.len());
        if let Err(e) = save_json(self.collab.store.as_ref(), &key, &self.game) {
            log::warn!("Failed to save game {key}: {e}");
        }
    }

    fn check_end(&mut self) {
        if self.win.is_some() {
            return;
        }
        let Some(win) = self.game.win_state() else {
            return;
        };

        if let Err(e) = self.collab.stats.record(
            win.letter_count,
            win.records.len(),
            win.wins(),
            win.losses(),
            &win.distribution(),
        ) {
            log::warn!("Failed to record statistics: {e}");
        }
        if let Some(on_end) = self.collab.on_end.as_mut() {
            on_end(&win);
        }
        self.win = Some(win);
    }
}
