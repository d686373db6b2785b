//! WebSocket client for the signaling relay.
//!
//! Provides:
//! - One persistent relay connection per channel
//! - Subscribe control message sent as soon as the socket opens
//! - Publish with a per-connection sequence id
//! - Handler registry with explicit unsubscribe
//!
//! `ready()` resolves when the socket reports open, not when the relay has
//! confirmed the subscription. A message published right after `ready()`
//! can therefore reach a relay that has not yet processed the subscribe
//! control message.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use rustc_hash::FxHashMap;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use super::{ChannelId, Envelope, SignalingError};

type Handler = Box<dyn Fn(&str) + Send + Sync>;
type HandlerMap = Arc<Mutex<FxHashMap<u64, Handler>>>;

/// Token returned by [`SignalingClient::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Relay connection state
#[derive(Debug, Clone, PartialEq, Eq)]
enum LinkState {
    Connecting,
    Open,
    Failed(String),
    Closed,
}

enum Outgoing {
    Text(String),
    Close,
}

/// Anything that can publish a serialized payload on a channel
pub trait Publisher: Send + Sync {
    /// Publish an already serialized payload
    ///
    /// # Errors
    /// Returns `SignalingError::Closed` if the connection is gone.
    fn publish_text(&self, message: String) -> Result<(), SignalingError>;
}

/// The signaling client.
///
/// Owns one relay connection subscribed to one channel. Inbound payloads
/// for the channel are passed to every registered handler; handlers run on
/// the connection task and should only forward work elsewhere.
pub struct SignalingClient {
    channel: ChannelId,
    next_id: Arc<AtomicU64>,
    next_subscription: AtomicU64,
    outgoing: mpsc::UnboundedSender<Outgoing>,
    handlers: HandlerMap,
    state: watch::Receiver<LinkState>,
    task: JoinHandle<()>,
}

impl SignalingClient {
    /// Open a relay connection for `channel`.
    ///
    /// Returns immediately; the connection is established in the background.
    /// Use [`ready`](Self::ready) to wait for it. Must be called from within
    /// a tokio runtime.
    pub fn open(url: impl Into<String>, channel: ChannelId) -> Self {
        let url = url.into();
        let next_id = Arc::new(AtomicU64::new(0));
        let handlers: HandlerMap = Arc::new(Mutex::new(FxHashMap::default()));
        let (state_tx, state_rx) = watch::channel(LinkState::Connecting);
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(run_connection(
            url,
            channel.clone(),
            next_id.clone(),
            handlers.clone(),
            state_tx,
            out_rx,
        ));

        Self {
            channel,
            next_id,
            next_subscription: AtomicU64::new(0),
            outgoing: out_tx,
            handlers,
            state: state_rx,
            task,
        }
    }

    /// Wait until the relay socket is open.
    ///
    /// # Errors
    /// Returns `SignalingError::Connect` if the connection attempt failed and
    /// `SignalingError::Closed` if it closed before opening.
    pub async fn ready(&self) -> Result<(), SignalingError> {
        let mut state = self.state.clone();
        let result = state
            .wait_for(|s| !matches!(s, LinkState::Connecting))
            .await
            .map_err(|_| SignalingError::Closed)?;

        match &*result {
            LinkState::Open => Ok(()),
            LinkState::Failed(reason) => Err(SignalingError::Connect(reason.clone())),
            LinkState::Connecting | LinkState::Closed => Err(SignalingError::Closed),
        }
    }

    /// Whether the relay socket is currently open.
    pub fn is_open(&self) -> bool {
        *self.state.borrow() == LinkState::Open
    }

    /// Serialize `payload` and publish it on the channel.
    ///
    /// Messages published before the socket opens are sent once it does.
    ///
    /// # Errors
    /// Returns `SignalingError::Encode` if `payload` fails to serialize and
    /// `SignalingError::Closed` if the connection is gone.
    pub fn publish<T: Serialize>(&self, payload: &T) -> Result<(), SignalingError> {
        let message = serde_json::to_string(payload)?;
        self.publish_text(message)
    }

    /// Register a handler for inbound channel payloads.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        lock_handlers(&self.handlers).insert(id, Box::new(handler));
        SubscriptionId(id)
    }

    /// Remove a handler. Returns false if it was already removed.
    pub fn unsubscribe(&self, subscription: SubscriptionId) -> bool {
        lock_handlers(&self.handlers)
            .remove(&subscription.0)
            .is_some()
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        lock_handlers(&self.handlers).len()
    }

    /// Close the relay connection and drop every handler.
    pub fn close(&self) {
        let _ = self.outgoing.send(Outgoing::Close);
        lock_handlers(&self.handlers).clear();
    }

    /// Get the channel this client is subscribed to.
    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }
}

impl Publisher for SignalingClient {
    fn publish_text(&self, message: String) -> Result<(), SignalingError> {
        let envelope = Envelope {
            topic: self.channel.to_string(),
            message,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };
        self.outgoing
            .send(Outgoing::Text(envelope.encode()?))
            .map_err(|_| SignalingError::Closed)
    }
}

impl Drop for SignalingClient {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn lock_handlers(handlers: &HandlerMap) -> std::sync::MutexGuard<'_, FxHashMap<u64, Handler>> {
    // A handler that panicked leaves the map itself consistent
    handlers
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

async fn run_connection(
    url: String,
    channel: ChannelId,
    next_id: Arc<AtomicU64>,
    handlers: HandlerMap,
    state: watch::Sender<LinkState>,
    mut outgoing: mpsc::UnboundedReceiver<Outgoing>,
) {
    let ws_stream = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok((ws_stream, _)) => ws_stream,
        Err(e) => {
            log::error!("Relay connection to {url} failed: {e}");
            state.send_replace(LinkState::Failed(e.to_string()));
            return;
        }
    };
    let (mut ws_writer, mut ws_reader) = ws_stream.split();

    let subscribe = Envelope::subscribe(&channel, next_id.fetch_add(1, Ordering::Relaxed));
    let sent = match subscribe.encode() {
        Ok(text) => ws_writer.send(Message::Text(text.into())).await.is_ok(),
        Err(_) => false,
    };
    if !sent {
        log::error!("Failed to subscribe to channel {channel}");
        state.send_replace(LinkState::Failed("subscribe failed".to_string()));
        return;
    }

    log::info!("Relay connected to {url}, subscribed to {channel}");
    state.send_replace(LinkState::Open);

    loop {
        tokio::select! {
            out = outgoing.recv() => {
                match out {
                    Some(Outgoing::Text(text)) => {
                        if ws_writer.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Some(Outgoing::Close) | None => {
                        let _ = ws_writer.close().await;
                        break;
                    }
                }
            }
            msg = ws_reader.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => dispatch(&handlers, &channel, text.as_str()),
                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    log::info!("Relay connection for {channel} closed");
    state.send_replace(LinkState::Closed);
}

/// Deliver one inbound relay frame to the channel handlers.
fn dispatch(handlers: &HandlerMap, channel: &ChannelId, text: &str) {
    let envelope = match Envelope::decode(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            log::warn!("Dropping malformed relay payload: {e}");
            return;
        }
    };

    if envelope.is_system() {
        log::debug!("Relay: {}", envelope.message);
        return;
    }
    if envelope.topic != channel.as_str() {
        log::debug!("Ignoring message for foreign topic {}", envelope.topic);
        return;
    }

    for handler in lock_handlers(handlers).values() {
        handler(&envelope.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_handlers() -> (HandlerMap, Arc<AtomicUsize>) {
        let handlers: HandlerMap = Arc::new(Mutex::new(FxHashMap::default()));
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        handlers.lock().unwrap().insert(
            0,
            Box::new(move |_: &str| {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        );
        (handlers, count)
    }

    #[test]
    fn dispatch_delivers_channel_messages() {
        let (handlers, count) = counting_handlers();
        let channel = ChannelId::from("room");
        let text = Envelope {
            topic: "room".into(),
            message: "hi".into(),
            id: 1,
        }
        .encode()
        .unwrap();

        dispatch(&handlers, &channel, &text);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispatch_drops_system_foreign_and_malformed() {
        let (handlers, count) = counting_handlers();
        let channel = ChannelId::from("room");

        dispatch(&handlers, &channel, &Envelope::system("subscribed", 0).encode().unwrap());
        let foreign = Envelope {
            topic: "other".into(),
            message: "hi".into(),
            id: 2,
        };
        dispatch(&handlers, &channel, &foreign.encode().unwrap());
        dispatch(&handlers, &channel, "{{ not json");

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ready_fails_without_relay() {
        // Nothing listens on port 9 of localhost
        let client = SignalingClient::open("ws://127.0.0.1:9", ChannelId::generate());
        assert!(matches!(
            client.ready().await,
            Err(SignalingError::Connect(_))
        ));
        assert!(!client.is_open());
    }

    #[tokio::test]
    async fn subscribe_and_unsubscribe() {
        let client = SignalingClient::open("ws://127.0.0.1:9", ChannelId::from("room"));
        let first = client.subscribe(|_| {});
        let second = client.subscribe(|_| {});
        assert_ne!(first, second);
        assert_eq!(client.handler_count(), 2);

        assert!(client.unsubscribe(first));
        assert!(!client.unsubscribe(first));
        assert_eq!(client.handler_count(), 1);

        client.close();
        assert_eq!(client.handler_count(), 0);
        assert_eq!(client.channel().as_str(), "room");
    }
}
