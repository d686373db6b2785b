//! Direct peer transport
//!
//! A [`PeerLink`] is one side of a direct, ordered, reliable data channel.
//! The [`Negotiator`](negotiator::Negotiator) drives the offer/answer and
//! candidate exchange over signaling until the channel opens.
//!
//! ## Modules
//!
//! - [`negotiator`]: handshake state machine for both roles
//! - [`rtc`]: WebRTC data channel link
//! - [`loopback`]: in-process linked pair with the same handshake

pub mod loopback;
pub mod negotiator;
pub mod rtc;

pub use loopback::LoopbackLink;
pub use negotiator::{NegotiationMessage, NegotiationState, Negotiator, Role};
pub use rtc::RtcLink;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Errors from a peer link
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("data channel is not open")]
    ChannelNotOpen,
    #[error("negotiation failed: {0}")]
    Negotiation(String),
    #[error("webrtc error: {0}")]
    Rtc(#[from] webrtc::Error),
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("peer link closed")]
    Closed,
}

/// Offer or answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

/// Session description exchanged during negotiation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

/// Connectivity candidate exchanged during negotiation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default, rename = "sdpMLineIndex")]
    pub sdp_mline_index: Option<u16>,
    #[serde(default)]
    pub username_fragment: Option<String>,
}

/// Event reported by a link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// A locally discovered candidate to send to the peer
    LocalCandidate(IceCandidate),
    /// The data channel opened; `initiated` is true on the side that created it
    ChannelOpen { initiated: bool },
    /// Text received on the data channel
    Message(String),
    /// The data channel or the whole link closed
    ChannelClosed,
}

/// One side of a direct peer channel
#[async_trait]
pub trait PeerLink: Send + Sync {
    /// Create the data channel (initiating side only)
    async fn open_channel(&self) -> Result<(), TransportError>;

    async fn create_offer(&self) -> Result<SessionDescription, TransportError>;

    async fn create_answer(&self) -> Result<SessionDescription, TransportError>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), TransportError>;

    async fn set_remote_description(&self, desc: SessionDescription)
    -> Result<(), TransportError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError>;

    /// Send text on the data channel
    ///
    /// Fails with `TransportError::ChannelNotOpen` before the channel opens;
    /// nothing is queued.
    async fn send(&self, text: String) -> Result<(), TransportError>;

    async fn close(&self) -> Result<(), TransportError>;
}

/// A link plus the stream of its events
pub struct PeerEndpoint {
    pub link: Arc<dyn PeerLink>,
    pub events: mpsc::UnboundedReceiver<LinkEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_description_wire_format() {
        let desc = SessionDescription {
            kind: SdpKind::Offer,
            sdp: "v=0".into(),
        };
        let json = serde_json::to_value(&desc).unwrap();
        assert_eq!(json["type"], "offer");
        assert_eq!(json["sdp"], "v=0");
    }

    #[test]
    fn candidate_wire_format() {
        let json = r#"{"candidate":"candidate:1 1 udp 1 10.0.0.1 5000 typ host","sdpMid":"0","sdpMLineIndex":0}"#;
        let cand: IceCandidate = serde_json::from_str(json).unwrap();
        assert_eq!(cand.sdp_mid.as_deref(), Some("0"));
        assert_eq!(cand.sdp_mline_index, Some(0));
        assert!(cand.username_fragment.is_none());

        let back = serde_json::to_value(&cand).unwrap();
        assert_eq!(back["sdpMLineIndex"], 0);
    }
}
