//! The session task
//!
//! Every callback in a shared session (signaling handlers, link events,
//! replicated events, ready callbacks) only forwards a [`SessionCommand`]
//! into one inbox. A single task drains that inbox and is the only code that
//! touches the controller or the negotiator, so the game never has two
//! writers even on a multi-threaded runtime.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::controller::{Collaborators, RemoteOutcome, SessionController};
use super::{Input, Origin, SessionError};
use crate::core::{GameState, Key, KeyOutcome, WinState};
use crate::replication::{ReplicationEvent, Replicator};
use crate::signaling::{ChannelId, SignalingClient, SignalingError, SubscriptionId};
use crate::transport::{LinkEvent, NegotiationState, Negotiator, PeerEndpoint, Role};

/// How to reach the peer
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub relay_url: String,
    pub channel: ChannelId,
    pub role: Role,
}

/// Something the owner of a session may want to show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// The peer channel is open and replication is active
    Connected,
    /// A local enter was refused because the guess is not a word
    NotInWordList,
    /// Every board is finished
    Ended(WinState),
    /// The peer left; the session continues solo
    PeerClosed,
    /// The relay could not be reached
    SignalingFailed(String),
}

enum SessionCommand {
    Input(Input),
    Signal(String),
    SignalingReady(Result<(), SignalingError>),
    Link(LinkEvent),
    TransportReady,
    Replicated(ReplicationEvent),
    Snapshot(oneshot::Sender<GameState>),
    Close,
}

/// Handle to a running session
///
/// Dropping the handle closes the session.
pub struct Session {
    commands: mpsc::UnboundedSender<SessionCommand>,
    state: watch::Receiver<GameState>,
    negotiation: watch::Receiver<Option<NegotiationState>>,
    notices: mpsc::UnboundedReceiver<SessionNotice>,
    channel: Option<ChannelId>,
    task: Option<JoinHandle<()>>,
}

impl Session {
    /// Start an unshared session. Must be called within a tokio runtime.
    #[must_use]
    pub fn solo(game: GameState, collab: Collaborators) -> Self {
        let controller = SessionController::open(game, collab);
        Self::spawn(controller, None, |_, _| None)
    }

    /// Start a shared session over `endpoint`, handshaking through the relay.
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn open(
        options: SessionOptions,
        game: GameState,
        collab: Collaborators,
        endpoint: PeerEndpoint,
    ) -> Self {
        let mut controller = SessionController::open(game, collab);
        controller.set_role(Some(options.role));
        let channel = options.channel.clone();

        Self::spawn(controller, Some(channel), move |inbox, notices| {
            Some(Network::start(options, endpoint, inbox, notices))
        })
    }

    fn spawn<F>(controller: SessionController, channel: Option<ChannelId>, network: F) -> Self
    where
        F: FnOnce(
            &mpsc::UnboundedSender<SessionCommand>,
            &mpsc::UnboundedSender<SessionNotice>,
        ) -> Option<Network>,
    {
        let (commands, inbox) = mpsc::unbounded_channel();
        let (notice_tx, notices) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(controller.game().clone());

        let net = network(&commands, &notice_tx);
        let (negotiation_tx, negotiation) =
            watch::channel(net.as_ref().map(|n| n.negotiator.state()));

        let actor = Actor {
            controller,
            net,
            early: Vec::new(),
            inbox_tx: commands.downgrade(),
            notices: notice_tx,
            state: state_tx,
            negotiation: negotiation_tx,
        };
        let task = tokio::spawn(actor.run(inbox));

        Self {
            commands,
            state,
            negotiation,
            notices,
            channel,
            task: Some(task),
        }
    }

    /// Feed one local key into the session
    ///
    /// # Errors
    /// Returns `SessionError::AlreadyClosed` if the session task has stopped.
    pub fn press(&self, key: Key) -> Result<(), SessionError> {
        self.commands
            .send(SessionCommand::Input(Input::local(key)))
            .map_err(|_| SessionError::AlreadyClosed)
    }

    /// Latest published game
    #[must_use]
    pub fn state(&self) -> GameState {
        self.state.borrow().clone()
    }

    /// Receiver that changes whenever the game does
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<GameState> {
        self.state.clone()
    }

    /// Handshake progress, `None` for a solo session
    #[must_use]
    pub fn negotiation(&self) -> Option<NegotiationState> {
        *self.negotiation.borrow()
    }

    #[must_use]
    pub const fn channel(&self) -> Option<&ChannelId> {
        self.channel.as_ref()
    }

    /// Notices raised since the last call
    pub fn take_notices(&mut self) -> Vec<SessionNotice> {
        let mut notices = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            notices.push(notice);
        }
        notices
    }

    /// Wait for the next notice
    pub async fn next_notice(&mut self) -> Option<SessionNotice> {
        self.notices.recv().await
    }

    /// Game as seen by the session task after everything queued so far
    ///
    /// # Errors
    /// Returns `SessionError::AlreadyClosed` if the session task has stopped.
    pub async fn snapshot(&self) -> Result<GameState, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::Snapshot(tx))
            .map_err(|_| SessionError::AlreadyClosed)?;
        rx.await.map_err(|_| SessionError::AlreadyClosed)
    }

    /// Close the session, telling the peer, and wait for the task to stop
    pub async fn close(mut self) {
        let _ = self.commands.send(SessionCommand::Close);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.commands.send(SessionCommand::Close);
    }
}

/// Networking owned by the session task
struct Network {
    client: Arc<SignalingClient>,
    subscription: SubscriptionId,
    negotiator: Negotiator,
    pumps: Vec<JoinHandle<()>>,
}

impl Network {
    fn start(
        options: SessionOptions,
        endpoint: PeerEndpoint,
        inbox: &mpsc::UnboundedSender<SessionCommand>,
        notices: &mpsc::UnboundedSender<SessionNotice>,
    ) -> Self {
        let SessionOptions {
            relay_url,
            channel,
            role,
        } = options;
        log::info!("Opening {role:?} session on channel {channel}");

        let client = Arc::new(SignalingClient::open(relay_url, channel));
        let signals = inbox.clone();
        let subscription = client.subscribe(move |text| {
            let _ = signals.send(SessionCommand::Signal(text.to_string()));
        });

        let mut negotiator = Negotiator::new(role, endpoint.link.clone(), client.clone());
        negotiator.on_subscribed();
        let ready = inbox.clone();
        negotiator.on_ready(move || {
            let _ = ready.send(SessionCommand::TransportReady);
        });

        let waiter = client.clone();
        let ready = inbox.clone();
        let failed = notices.clone();
        let signaling_ready = tokio::spawn(async move {
            let result = waiter.ready().await;
            if let Err(e) = &result {
                let _ = failed.send(SessionNotice::SignalingFailed(e.to_string()));
            }
            let _ = ready.send(SessionCommand::SignalingReady(result));
        });

        let mut events = endpoint.events;
        let links = inbox.clone();
        let link_events = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if links.send(SessionCommand::Link(event)).is_err() {
                    break;
                }
            }
        });

        Self {
            client,
            subscription,
            negotiator,
            pumps: vec![signaling_ready, link_events],
        }
    }

    async fn shutdown(mut self) {
        self.negotiator.close().await;
        self.client.unsubscribe(self.subscription);
        self.client.close();
        for pump in self.pumps.drain(..) {
            pump.abort();
        }
    }
}

struct Actor {
    controller: SessionController,
    net: Option<Network>,
    /// Peer messages that arrived before replication was attached
    early: Vec<String>,
    inbox_tx: mpsc::WeakUnboundedSender<SessionCommand>,
    notices: mpsc::UnboundedSender<SessionNotice>,
    state: watch::Sender<GameState>,
    negotiation: watch::Sender<Option<NegotiationState>>,
}

impl Actor {
    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<SessionCommand>) {
        while let Some(command) = inbox.recv().await {
            if matches!(command, SessionCommand::Close) {
                break;
            }
            let ended_before = self.controller.win_state().is_some();
            self.handle(command).await;
            self.publish(ended_before);
        }

        let _ = self.teardown(true).await;
        log::info!("Session closed");
    }

    async fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Input(input) => {
                let outcome = self.controller.input(input).await;
                if outcome == KeyOutcome::NotInWordList && input.origin == Origin::Local {
                    self.notify(SessionNotice::NotInWordList);
                }
            }
            SessionCommand::Signal(text) => {
                if let Some(net) = self.net.as_mut() {
                    net.negotiator.on_signal(&text).await;
                }
            }
            SessionCommand::SignalingReady(Ok(())) => {
                if let Some(net) = self.net.as_mut() {
                    net.negotiator.on_signaling_ready();
                }
            }
            SessionCommand::SignalingReady(Err(e)) => {
                log::error!("Signaling unavailable: {e}");
            }
            SessionCommand::Link(event) => self.on_link_event(event).await,
            SessionCommand::TransportReady => self.on_transport_ready().await,
            SessionCommand::Replicated(event) => {
                if self.controller.handle_replicated(event).await == RemoteOutcome::PeerClosed
                    && self.teardown(false).await
                {
                    self.notify(SessionNotice::PeerClosed);
                }
            }
            SessionCommand::Snapshot(reply) => {
                let _ = reply.send(self.controller.game().clone());
            }
            SessionCommand::Close => {}
        }
    }

    async fn on_link_event(&mut self, event: LinkEvent) {
        let closed = event == LinkEvent::ChannelClosed;
        let Some(net) = self.net.as_mut() else {
            return;
        };

        if let Some(text) = net.negotiator.on_link_event(event) {
            if self.controller.is_replicating() {
                self.controller.on_peer_message(&text);
            } else {
                self.early.push(text);
            }
        }

        if closed && self.teardown(false).await {
            self.notify(SessionNotice::PeerClosed);
        }
    }

    async fn on_transport_ready(&mut self) {
        let Some(net) = self.net.as_ref() else {
            return;
        };
        let replicator = Replicator::new(net.negotiator.link());
        let inbox = self.inbox_tx.clone();
        self.controller.attach_replicator(replicator, move |event| {
            if let Some(inbox) = inbox.upgrade() {
                let _ = inbox.send(SessionCommand::Replicated(event));
            }
        });
        self.notify(SessionNotice::Connected);

        for text in std::mem::take(&mut self.early) {
            self.controller.on_peer_message(&text);
        }

        if self.controller.role() == Some(Role::Joiner)
            && let Err(e) = self.controller.request_snapshot().await
        {
            log::warn!("Snapshot request not sent: {e}");
        }
    }

    /// Drop networking; returns false if there was none left
    async fn teardown(&mut self, notify_peer: bool) -> bool {
        self.controller.close_replication(notify_peer).await;
        self.early.clear();
        let Some(net) = self.net.take() else {
            return false;
        };
        net.shutdown().await;
        self.negotiation.send_replace(None);
        true
    }

    fn notify(&self, notice: SessionNotice) {
        let _ = self.notices.send(notice);
    }

    fn publish(&self, ended_before: bool) {
        let game = self.controller.game();
        if *self.state.borrow() != *game {
            self.state.send_replace(game.clone());
        }
        if let Some(net) = &self.net {
            let state = Some(net.negotiator.state());
            if *self.negotiation.borrow() != state {
                self.negotiation.send_replace(state);
            }
        }
        if !ended_before && let Some(win) = self.controller.win_state() {
            self.notify(SessionNotice::Ended(win.clone()));
        }
    }
}
