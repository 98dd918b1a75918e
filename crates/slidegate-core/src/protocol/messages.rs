//! JSON message types for the controller-facing WebSocket protocol.
//!
//! # Message flow
//!
//! ```text
//! Controller → Client:  JSON text frame  →  ServerMessage
//! Client → Controller:  ClientMessage     →  JSON text frame
//! ```
//!
//! Every JSON message is an object with a `"type"` field naming the variant;
//! the remaining fields sit next to it:
//!
//! ```json
//! {"type":"config","publicKey":"…","doors":[{"id":"d1","label":"Front"}]}
//! {"type":"challenge","challenge":"…"}
//! {"type":"fetch","door":"d1"}
//! {"type":"solve","door":"d1","code":"…"}
//! ```
//!
//! Two shapes predate the tagged format and are still understood:
//!
//! - a bare JSON array of doors from the controller is a config push without
//!   a public key;
//! - in the direct profile the client sends the raw control id as the whole
//!   text frame, not JSON.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ProtocolError;
use crate::domain::control::{Control, ControlId};

// ── Controller → Client ───────────────────────────────────────────────────────

/// One entry of the `doors` list in a config push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorEntry {
    pub id: ControlId,
    pub label: String,
}

impl From<DoorEntry> for Control {
    fn from(entry: DoorEntry) -> Self {
        Control {
            id: entry.id,
            label: entry.label,
        }
    }
}

/// All messages the controller can send.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Full replacement of the control set and the displayed public key.
    Config {
        #[serde(rename = "publicKey", alias = "public_key", default)]
        public_key: Option<String>,
        #[serde(default)]
        doors: Vec<DoorEntry>,
    },

    /// Challenge for the most recent `fetch`.
    Challenge { challenge: String },

    /// Any `type` this client does not know yet.
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    /// Parses one inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Parse`] when the frame is not JSON, has no
    /// `type` field, or a known `type` is missing required fields.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        if text.trim_start().starts_with('[') {
            let doors: Vec<DoorEntry> = serde_json::from_str(text)?;
            return Ok(ServerMessage::Config {
                public_key: None,
                doors,
            });
        }
        Ok(serde_json::from_str(text)?)
    }

    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Config { .. } => "config",
            ServerMessage::Challenge { .. } => "challenge",
            ServerMessage::Unknown => "unknown",
        }
    }
}

// ── Client → Controller ───────────────────────────────────────────────────────

/// JSON messages the client sends in the challenge-response profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Request to actuate; the controller answers with a challenge.
    Fetch { door: ControlId },
    /// Answer to the pending challenge.
    Solve { door: ControlId, code: String },
}

impl ClientMessage {
    /// Serializes the message into a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    pub fn encode(&self) -> Result<OutboundFrame, ProtocolError> {
        serde_json::to_string(self)
            .map(OutboundFrame)
            .map_err(ProtocolError::Encode)
    }
}

/// A text frame ready to hand to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame(String);

impl OutboundFrame {
    /// Direct-profile command: the frame is the raw control id.
    pub fn direct(id: &ControlId) -> Self {
        Self(id.as_str().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for OutboundFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_with_public_key_and_doors() {
        // Arrange
        let json = r#"{"type":"config","publicKey":"cGs=","doors":[{"id":"d1","label":"Front"},{"id":"d2","label":"Garage"}]}"#;

        // Act
        let msg = ServerMessage::parse(json).unwrap();

        // Assert
        assert_eq!(
            msg,
            ServerMessage::Config {
                public_key: Some("cGs=".to_string()),
                doors: vec![
                    DoorEntry {
                        id: ControlId::new("d1"),
                        label: "Front".to_string()
                    },
                    DoorEntry {
                        id: ControlId::new("d2"),
                        label: "Garage".to_string()
                    },
                ],
            }
        );
    }

    #[test]
    fn test_parse_config_without_public_key() {
        let msg = ServerMessage::parse(r#"{"type":"config","doors":[]}"#).unwrap();
        assert_eq!(
            msg,
            ServerMessage::Config {
                public_key: None,
                doors: vec![]
            }
        );
    }

    #[test]
    fn test_parse_config_accepts_snake_case_key_field() {
        let msg = ServerMessage::parse(r#"{"type":"config","public_key":"k","doors":[]}"#).unwrap();
        assert!(matches!(msg, ServerMessage::Config { public_key: Some(k), .. } if k == "k"));
    }

    #[test]
    fn test_parse_legacy_bare_door_array_as_config() {
        // Arrange
        let json = r#" [{"id":"home","label":"Home"}]"#;

        // Act
        let msg = ServerMessage::parse(json).unwrap();

        // Assert
        assert_eq!(
            msg,
            ServerMessage::Config {
                public_key: None,
                doors: vec![DoorEntry {
                    id: ControlId::new("home"),
                    label: "Home".to_string()
                }],
            }
        );
    }

    #[test]
    fn test_parse_challenge() {
        let msg = ServerMessage::parse(r#"{"type":"challenge","challenge":"c1"}"#).unwrap();
        assert_eq!(
            msg,
            ServerMessage::Challenge {
                challenge: "c1".to_string()
            }
        );
    }

    #[test]
    fn test_parse_unknown_type_is_not_an_error() {
        let msg = ServerMessage::parse(r#"{"type":"telemetry","battery":97}"#).unwrap();
        assert_eq!(msg, ServerMessage::Unknown);
        assert_eq!(msg.kind(), "unknown");
    }

    #[test]
    fn test_parse_invalid_json_returns_parse_error() {
        let err = ServerMessage::parse("{not json").unwrap_err();
        assert!(matches!(err, ProtocolError::Parse(_)));
    }

    #[test]
    fn test_parse_missing_type_returns_parse_error() {
        assert!(ServerMessage::parse(r#"{"challenge":"c1"}"#).is_err());
    }

    #[test]
    fn test_parse_challenge_without_value_returns_parse_error() {
        assert!(ServerMessage::parse(r#"{"type":"challenge"}"#).is_err());
    }

    #[test]
    fn test_encode_fetch_matches_wire_format() {
        let frame = ClientMessage::Fetch {
            door: ControlId::new("d1"),
        }
        .encode()
        .unwrap();

        assert_eq!(frame.as_str(), r#"{"type":"fetch","door":"d1"}"#);
    }

    #[test]
    fn test_encode_solve_matches_wire_format() {
        let frame = ClientMessage::Solve {
            door: ControlId::new("d1"),
            code: "r1".to_string(),
        }
        .encode()
        .unwrap();

        assert_eq!(frame.as_str(), r#"{"type":"solve","door":"d1","code":"r1"}"#);
    }

    #[test]
    fn test_direct_frame_is_raw_id() {
        let frame = OutboundFrame::direct(&ControlId::new("garage"));
        assert_eq!(frame.into_string(), "garage");
    }

    #[test]
    fn test_door_entry_converts_into_control() {
        let control: Control = DoorEntry {
            id: ControlId::new("d1"),
            label: "Front".to_string(),
        }
        .into();

        assert_eq!(control.id.as_str(), "d1");
        assert_eq!(control.label, "Front");
    }
}
