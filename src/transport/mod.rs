pub mod websocket;

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio_tungstenite::tungstenite::Message;

/// Lifecycle of the single outbound connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closed,
    Failed,
}

impl ConnectionState {
    /// Closed and Failed are never left once entered.
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
            ConnectionState::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One received message, kept as the exact bytes that arrived.
/// The content is never inspected or re-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    bytes: Vec<u8>,
}

impl Payload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Extract the payload carried by a data frame.
    /// Control frames (ping, pong, close, raw) carry no message.
    pub fn from_frame(frame: Message) -> Option<Self> {
        match frame {
            Message::Text(text) => Some(Self::new(text.as_str().as_bytes())),
            Message::Binary(data) => Some(Self::new(data.to_vec())),
            Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => None,
        }
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}

impl From<&[u8]> for Payload {
    fn from(value: &[u8]) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_frame_is_taken_verbatim() {
        let p = Payload::from_frame(Message::text("{\"v\": 1, \"u\": \"C\"}")).unwrap();
        assert_eq!(p.as_bytes(), b"{\"v\": 1, \"u\": \"C\"}");
    }

    #[test]
    fn binary_frame_bytes_are_kept_unchanged() {
        let p = Payload::from_frame(Message::binary(vec![0xde, 0xad, 0xbe, 0xef])).unwrap();
        assert_eq!(p.as_bytes(), &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(p.len(), 4);
    }

    #[test]
    fn control_frames_carry_no_payload() {
        assert!(Payload::from_frame(Message::Ping(Default::default())).is_none());
        assert!(Payload::from_frame(Message::Pong(Default::default())).is_none());
        assert!(Payload::from_frame(Message::Close(None)).is_none());
    }

    #[test]
    fn terminal_states() {
        assert!(ConnectionState::Closed.is_terminal());
        assert!(ConnectionState::Failed.is_terminal());
        assert!(!ConnectionState::Open.is_terminal());
        assert!(!ConnectionState::Idle.is_terminal());
        assert_eq!(
            serde_json::to_string(&ConnectionState::Connecting).unwrap(),
            "\"connecting\""
        );
    }
}
