//! Data channel payloads
//!
//! Wire form is `{"event": "<kind>", "value": ...}` where `value` is a single
//! letter for `key-pressed`, a full game for `initialise`, and absent
//! otherwise.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::GameState;

/// Event exchanged between peers once the channel is connected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "value", rename_all = "kebab-case")]
pub enum ReplicationEvent {
    KeyPressed(char),
    KeyRemoved,
    EnterPressed,
    Initialise(Box<GameState>),
    Request,
    Close,
}

/// Discriminant of a [`ReplicationEvent`], used to key listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    KeyPressed,
    KeyRemoved,
    EnterPressed,
    Initialise,
    Request,
    Close,
}

impl EventKind {
    pub const ALL: [Self; 6] = [
        Self::KeyPressed,
        Self::KeyRemoved,
        Self::EnterPressed,
        Self::Initialise,
        Self::Request,
        Self::Close,
    ];

    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::KeyPressed => "key-pressed",
            Self::KeyRemoved => "key-removed",
            Self::EnterPressed => "enter-pressed",
            Self::Initialise => "initialise",
            Self::Request => "request",
            Self::Close => "close",
        }
    }

    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

/// Why an inbound payload was not turned into an event
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed event payload: {0}")]
    Malformed(String),
    #[error("unknown event kind '{0}'")]
    UnknownKind(String),
}

impl ReplicationEvent {
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::KeyPressed(_) => EventKind::KeyPressed,
            Self::KeyRemoved => EventKind::KeyRemoved,
            Self::EnterPressed => EventKind::EnterPressed,
            Self::Initialise(_) => EventKind::Initialise,
            Self::Request => EventKind::Request,
            Self::Close => EventKind::Close,
        }
    }

    /// Encode to the data channel wire format
    ///
    /// # Errors
    /// Returns a serialization error if the game state cannot be encoded.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a data channel payload
    ///
    /// # Errors
    /// Returns `DecodeError::UnknownKind` for a well-formed payload with an
    /// unrecognised tag and `DecodeError::Malformed` for anything else.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| DecodeError::Malformed(e.to_string()))?;
        let tag = value
            .get("event")
            .and_then(Value::as_str)
            .ok_or_else(|| DecodeError::Malformed("missing event tag".to_string()))?;
        if EventKind::from_tag(tag).is_none() {
            return Err(DecodeError::UnknownKind(tag.to_string()));
        }
        serde_json::from_value(value).map_err(|e| DecodeError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_pressed_wire_format() {
        let text = ReplicationEvent::KeyPressed('q').encode().unwrap();
        assert_eq!(text, r#"{"event":"key-pressed","value":"q"}"#);
        assert_eq!(
            ReplicationEvent::decode(&text).unwrap(),
            ReplicationEvent::KeyPressed('q')
        );
    }

    #[test]
    fn unit_events_decode_without_value() {
        for (text, event) in [
            (r#"{"event":"key-removed"}"#, ReplicationEvent::KeyRemoved),
            (r#"{"event":"enter-pressed"}"#, ReplicationEvent::EnterPressed),
            (r#"{"event":"request"}"#, ReplicationEvent::Request),
            (r#"{"event":"close"}"#, ReplicationEvent::Close),
        ] {
            assert_eq!(ReplicationEvent::decode(text).unwrap(), event);
        }
    }

    #[test]
    fn initialise_carries_full_state() {
        let game = GameState::new(&["crane", "allow"], 7, 2).unwrap();
        let event = ReplicationEvent::Initialise(Box::new(game.clone()));
        let json: Value = serde_json::from_str(&event.encode().unwrap()).unwrap();
        assert_eq!(json["event"], "initialise");
        assert_eq!(json["value"]["letterCount"], 5);

        match ReplicationEvent::decode(&json.to_string()).unwrap() {
            ReplicationEvent::Initialise(decoded) => assert_eq!(*decoded, game),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_kind_is_distinguished() {
        assert!(matches!(
            ReplicationEvent::decode(r#"{"event":"dance","value":1}"#),
            Err(DecodeError::UnknownKind(tag)) if tag == "dance"
        ));
    }

    #[test]
    fn malformed_payloads() {
        for text in [
            "nope",
            r#"{"value":"a"}"#,
            r#"{"event":"key-pressed","value":"ab"}"#,
            r#"{"event":"initialise","value":{}}"#,
        ] {
            assert!(
                matches!(ReplicationEvent::decode(text), Err(DecodeError::Malformed(_))),
                "{text}"
            );
        }
    }

    #[test]
    fn tags_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(ReplicationEvent::Close.kind(), EventKind::Close);
    }
}
