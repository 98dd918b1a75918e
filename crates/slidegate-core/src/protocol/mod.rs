//! Protocol module containing the wire messages, the crypto collaborator
//! contract and the command state machine.

pub mod command;
pub mod messages;
pub mod solver;

use thiserror::Error;

pub use command::{CommandProtocol, PendingChallenge, ProtocolProfile};
pub use messages::{ClientMessage, DoorEntry, OutboundFrame, ServerMessage};
pub use solver::{ChallengeSolver, CryptoPanel};

/// Errors produced while reading or writing wire messages.
///
/// None of these is fatal to the connection: a frame that fails to parse is
/// dropped and the session carries on with the next one.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// An inbound frame was not valid JSON or did not match any known shape.
    #[error("malformed inbound frame: {0}")]
    Parse(#[from] serde_json::Error),

    /// An outbound message could not be serialized.
    #[error("failed to encode outbound message: {0}")]
    Encode(#[source] serde_json::Error),
}
