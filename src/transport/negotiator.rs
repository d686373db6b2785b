//! Peer handshake over signaling
//!
//! ```text
//! Idle ──subscribe──► Signaled ──init/offer──► Negotiating ──channel open──► Connected ──► Closed
//! ```
//!
//! The joiner asks for negotiation with `init` once its relay connection is
//! ready; the leader waits passively and answers `init` with an offer.
//! Candidates are applied as they arrive, interleaved with the description
//! exchange. Nothing times out and nothing is retried: a handshake that stops
//! making progress stays in `Negotiating`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{IceCandidate, LinkEvent, PeerLink, SdpKind, SessionDescription, TransportError};
use crate::signaling::Publisher;

/// Session role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Minted the channel id, waits for the joiner
    Leader,
    /// Supplied a known channel id, starts negotiation
    Joiner,
}

/// Handshake progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NegotiationState {
    Idle,
    Signaled,
    Negotiating,
    Connected,
    Closed,
}

/// Handshake payload carried in the signaling envelope
///
/// Wire form is `{"type": "init" | "sdp" | "ice", "raw": ...}`; unknown tags
/// are rejected at decode time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireMessage", into = "WireMessage")]
pub enum NegotiationMessage {
    Init,
    Sdp(SessionDescription),
    Ice(IceCandidate),
}

#[derive(Serialize, Deserialize)]
struct WireMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    raw: Value,
}

impl TryFrom<WireMessage> for NegotiationMessage {
    type Error = String;

    fn try_from(wire: WireMessage) -> Result<Self, Self::Error> {
        match wire.kind.as_str() {
            "init" => Ok(Self::Init),
            "sdp" => serde_json::from_value(wire.raw)
                .map(Self::Sdp)
                .map_err(|e| format!("bad sdp payload: {e}")),
            "ice" => serde_json::from_value(wire.raw)
                .map(Self::Ice)
                .map_err(|e| format!("bad ice payload: {e}")),
            other => Err(format!("unknown negotiation type '{other}'")),
        }
    }
}

impl From<NegotiationMessage> for WireMessage {
    fn from(msg: NegotiationMessage) -> Self {
        let (kind, raw) = match msg {
            NegotiationMessage::Init => ("init", Value::String(String::new())),
            NegotiationMessage::Sdp(desc) => ("sdp", serde_json::to_value(desc).unwrap_or_default()),
            NegotiationMessage::Ice(cand) => ("ice", serde_json::to_value(cand).unwrap_or_default()),
        };
        Self {
            kind: kind.to_string(),
            raw,
        }
    }
}

type ReadyCallback = Box<dyn FnOnce() + Send>;

/// Drives one side of the handshake
pub struct Negotiator {
    role: Role,
    state: NegotiationState,
    link: Arc<dyn PeerLink>,
    signaling: Arc<dyn Publisher>,
    ready: Vec<ReadyCallback>,
}

impl Negotiator {
    #[must_use]
    pub fn new(role: Role, link: Arc<dyn PeerLink>, signaling: Arc<dyn Publisher>) -> Self {
        Self {
            role,
            state: NegotiationState::Idle,
            link,
            signaling,
            ready: Vec::new(),
        }
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub const fn state(&self) -> NegotiationState {
        self.state
    }

    #[must_use]
    pub fn link(&self) -> Arc<dyn PeerLink> {
        self.link.clone()
    }

    fn set_state(&mut self, state: NegotiationState) {
        if self.state != state {
            log::debug!("{:?} negotiation {:?} -> {:?}", self.role, self.state, state);
            self.state = state;
        }
    }

    fn publish(&self, msg: NegotiationMessage) {
        let text = match serde_json::to_string(&msg) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Failed to encode negotiation message: {e}");
                return;
            }
        };
        if let Err(e) = self.signaling.publish_text(text) {
            log::warn!("Failed to publish negotiation message: {e}");
        }
    }

    /// The signaling subscription was sent
    pub fn on_subscribed(&mut self) {
        if self.state == NegotiationState::Idle {
            self.set_state(NegotiationState::Signaled);
        }
    }

    /// The relay connection reported open
    ///
    /// The joiner requests negotiation; the leader keeps waiting.
    pub fn on_signaling_ready(&mut self) {
        if self.role == Role::Joiner && self.state == NegotiationState::Signaled {
            self.publish(NegotiationMessage::Init);
            self.set_state(NegotiationState::Negotiating);
        }
    }

    /// Handle one inbound signaling payload
    ///
    /// Malformed payloads and failed steps are logged and dropped.
    pub async fn on_signal(&mut self, raw: &str) {
        if matches!(
            self.state,
            NegotiationState::Connected | NegotiationState::Closed
        ) {
            log::debug!("Ignoring signal in state {:?}", self.state);
            return;
        }

        let msg: NegotiationMessage = match serde_json::from_str(raw) {
            Ok(msg) => msg,
            Err(e) => {
                log::warn!("Dropping malformed negotiation message: {e}");
                return;
            }
        };

        if let Err(e) = self.apply(msg).await {
            log::warn!("{:?} negotiation step failed: {e}", self.role);
        }
    }

    async fn apply(&mut self, msg: NegotiationMessage) -> Result<(), TransportError> {
        match (self.role, msg) {
            (Role::Leader, NegotiationMessage::Init) => {
                self.set_state(NegotiationState::Negotiating);
                self.link.open_channel().await?;
                let offer = self.link.create_offer().await?;
                self.link.set_local_description(offer.clone()).await?;
                self.publish(NegotiationMessage::Sdp(offer));
            }
            (Role::Joiner, NegotiationMessage::Sdp(desc)) if desc.kind == SdpKind::Offer => {
                self.set_state(NegotiationState::Negotiating);
                self.link.set_remote_description(desc).await?;
                let answer = self.link.create_answer().await?;
                self.link.set_local_description(answer.clone()).await?;
                self.publish(NegotiationMessage::Sdp(answer));
            }
            (Role::Leader, NegotiationMessage::Sdp(desc)) if desc.kind == SdpKind::Answer => {
                self.link.set_remote_description(desc).await?;
            }
            (_, NegotiationMessage::Ice(candidate)) => {
                self.link.add_ice_candidate(candidate).await?;
            }
            (role, msg) => log::debug!("{role:?} ignoring {msg:?}"),
        }
        Ok(())
    }

    /// Handle one link event
    ///
    /// Returns the payload of data channel messages.
    pub fn on_link_event(&mut self, event: LinkEvent) -> Option<String> {
        match event {
            LinkEvent::LocalCandidate(candidate) => {
                self.publish(NegotiationMessage::Ice(candidate));
                None
            }
            LinkEvent::ChannelOpen { initiated } => {
                log::info!(
                    "Peer channel open ({})",
                    if initiated { "initiated" } else { "accepted" }
                );
                self.set_state(NegotiationState::Connected);
                for callback in self.ready.drain(..) {
                    callback();
                }
                None
            }
            LinkEvent::Message(text) => Some(text),
            LinkEvent::ChannelClosed => {
                self.set_state(NegotiationState::Closed);
                None
            }
        }
    }

    /// Run `callback` once the channel is connected
    ///
    /// Callbacks registered before connection run in registration order.
    pub fn on_ready(&mut self, callback: impl FnOnce() + Send + 'static) {
        if self.state == NegotiationState::Connected {
            callback();
        } else {
            self.ready.push(Box::new(callback));
        }
    }

    /// Close the link and drop pending callbacks
    pub async fn close(&mut self) {
        self.ready.clear();
        if let Err(e) = self.link.close().await {
            log::warn!("Error closing peer link: {e}");
        }
        self.set_state(NegotiationState::Closed);
    }
}
