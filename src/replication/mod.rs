//! Event replication over the peer channel
//!
//! Local keystrokes are broadcast as [`ReplicationEvent`]s and replayed by the
//! remote session through its normal input path. Snapshots are full game
//! states, never diffs. Events from one peer arrive in send order; nothing
//! orders the two directions against each other.

pub mod bus;
pub mod event;

pub use bus::{EventBus, Registration};
pub use event::{DecodeError, EventKind, ReplicationEvent};

use std::sync::Arc;

use crate::transport::{PeerLink, TransportError};

/// Replication endpoint bound to one connected link
pub struct Replicator {
    link: Arc<dyn PeerLink>,
    bus: EventBus,
}

impl Replicator {
    #[must_use]
    pub fn new(link: Arc<dyn PeerLink>) -> Self {
        Self {
            link,
            bus: EventBus::new(),
        }
    }

    pub fn register(
        &mut self,
        kind: EventKind,
        listener: impl FnMut(&ReplicationEvent) + Send + Sync + 'static,
    ) -> Registration {
        self.bus.register(kind, listener)
    }

    pub fn unregister(&mut self, registration: Registration) -> bool {
        self.bus.unregister(registration)
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.bus.len()
    }

    /// Send one event to the peer
    ///
    /// # Errors
    /// Returns `TransportError::ChannelNotOpen` if the link is not connected
    /// yet. The event is not queued.
    pub async fn send(&self, event: &ReplicationEvent) -> Result<(), TransportError> {
        let text = event.encode()?;
        self.link.send(text).await
    }

    /// Decode a payload from the peer and notify listeners
    ///
    /// Malformed payloads are logged and dropped; unknown kinds are ignored.
    pub fn receive(&mut self, text: &str) -> Option<ReplicationEvent> {
        match ReplicationEvent::decode(text) {
            Ok(event) => {
                self.bus.emit(&event);
                Some(event)
            }
            Err(DecodeError::UnknownKind(tag)) => {
                log::debug!("Ignoring unknown event kind '{tag}'");
                None
            }
            Err(e) => {
                log::warn!("Dropping peer payload: {e}");
                None
            }
        }
    }

    /// Tell the peer we are leaving, then tear down
    pub async fn close(&mut self) {
        if let Err(e) = self.send(&ReplicationEvent::Close).await {
            log::debug!("Close not delivered: {e}");
        }
        self.dispose().await;
    }

    /// Drop every listener and close the link without notifying the peer
    pub async fn dispose(&mut self) {
        self.bus.clear();
        if let Err(e) = self.link.close().await {
            log::warn!("Error closing peer link: {e}");
        }
    }
}
