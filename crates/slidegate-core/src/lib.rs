//! # slidegate-core
//!
//! Shared library for slidegate containing the gesture confirmation state
//! machine, the control registry, the JSON wire messages and the command
//! protocol that drives the optional challenge-response round-trip.
//!
//! This crate has zero dependencies on sockets, timers, terminals or any
//! other I/O.  The client crate feeds it pointer events and inbound frames
//! and sends whatever frames it hands back.
//!
//! # Architecture overview
//!
//! A user confirms a command (for example "open the front door") by dragging
//! a slider to the end of its track.  The confirmed command travels to a
//! controller over a persistent WebSocket, optionally guarded by a single
//! challenge that a local cryptographic module has to solve.
//!
//! - **`domain`** – Pure UI-independent state.  [`GestureConfirmer`] turns a
//!   one-dimensional drag into a confirm/cancel decision; [`ControlRegistry`]
//!   holds the ordered set of controls and owns one confirmer per control;
//!   [`Surface`] is the externally visible status (offline marker, crypto
//!   status, inspection panel).
//!
//! - **`protocol`** – The wire.  [`ServerMessage`] and [`ClientMessage`] are
//!   the JSON frames; [`CommandProtocol`] is the message-level state machine
//!   that correlates challenges with the single pending request.

pub mod domain;
pub mod protocol;

pub use domain::control::{Control, ControlId};
pub use domain::gesture::{GestureConfirmer, GesturePhase, SliderView, TrackGeometry};
pub use domain::registry::{ConfirmedCommand, ControlRegistry};
pub use domain::surface::{CryptoStatus, Surface};
pub use protocol::command::{CommandProtocol, PendingChallenge, ProtocolProfile};
pub use protocol::messages::{ClientMessage, DoorEntry, OutboundFrame, ServerMessage};
pub use protocol::solver::{ChallengeSolver, CryptoPanel};
pub use protocol::ProtocolError;

#[cfg(any(test, feature = "mock"))]
pub use protocol::solver::MockChallengeSolver;
