//! Application layer use cases for the client.
//!
//! - **`session`** – The event loop.  Feeds transport events and UI events
//!   into the `CommandProtocol` from `slidegate_core`, hands the frames it
//!   produces to the transport, and asks a renderer to redraw the surface.
//!   The transport and the renderer are injected, so the loop runs
//!   unchanged against the real WebSocket connector or an in-memory one.

pub mod session;
