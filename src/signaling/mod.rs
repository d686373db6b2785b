//! Signaling over a publish/subscribe relay
//!
//! The relay is only used to exchange handshake metadata before a direct
//! peer channel exists.
//!
//! ```text
//! ┌──────────────────┐   WebSocket    ┌─────────────┐   WebSocket    ┌──────────────────┐
//! │ SignalingClient  │ ◄────────────► │ RelayServer │ ◄────────────► │ SignalingClient  │
//! │ (leader)         │  JSON Envelope │ (topics)    │  JSON Envelope │ (joiner)         │
//! └──────────────────┘                └─────────────┘                └──────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`client`]: persistent relay connection with topic handlers
//! - [`relay`]: relay server fanning envelopes out per topic

pub mod client;
pub mod relay;

pub use client::{Publisher, SignalingClient, SubscriptionId};
pub use relay::{RelayConfig, RelayServer};

use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Client → server control topic; `message` names the channel to join
pub const SUBSCRIBE_TOPIC: &str = "_subscribe";

/// Server → client diagnostics; never delivered to application handlers
pub const SYSTEM_TOPIC: &str = "_system";

const CHANNEL_ID_LEN: usize = 12;

/// Errors from the signaling layer
#[derive(Debug, thiserror::Error)]
pub enum SignalingError {
    #[error("relay connection failed: {0}")]
    Connect(String),
    #[error("relay connection closed")]
    Closed,
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Opaque name of a signaling subscription and, by convention, the session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    /// Mint a fresh random identifier (session leader)
    #[must_use]
    pub fn generate() -> Self {
        let id: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(CHANNEL_ID_LEN)
            .map(char::from)
            .collect();
        Self(id)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ChannelId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ChannelId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Relay-level message
///
/// `id` is a per-connection sequence number with no meaning across peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub topic: String,
    pub message: String,
    pub id: u64,
}

impl Envelope {
    /// Subscribe control message for `channel`
    #[must_use]
    pub fn subscribe(channel: &ChannelId, id: u64) -> Self {
        Self {
            topic: SUBSCRIBE_TOPIC.to_string(),
            message: channel.to_string(),
            id,
        }
    }

    /// Diagnostic message from the relay
    #[must_use]
    pub fn system(message: impl Into<String>, id: u64) -> Self {
        Self {
            topic: SYSTEM_TOPIC.to_string(),
            message: message.into(),
            id,
        }
    }

    #[must_use]
    pub fn is_system(&self) -> bool {
        self.topic == SYSTEM_TOPIC
    }

    /// Encode to the JSON wire format
    ///
    /// # Errors
    /// Returns a serialization error (not expected for this plain struct).
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode from the JSON wire format
    ///
    /// # Errors
    /// Returns an error if `text` is not a valid envelope.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
