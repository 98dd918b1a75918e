//! Domain entities for slidegate.
//!
//! This module contains pure state machines with no infrastructure
//! dependencies: no sockets, no terminal, no clock.  Every type here can be
//! driven synchronously from a unit test.
//!
//! - [`control`] – the actuatable target (`Control`) and its identity.
//! - [`gesture`] – the per-control drag state machine.
//! - [`registry`] – the ordered control set, rebuilt on every config push.
//! - [`surface`] – the status shown next to the controls.

pub mod control;
pub mod gesture;
pub mod registry;
pub mod surface;
