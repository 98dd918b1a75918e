//! slidegate-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the client do?
//!
//! 1. Maps the configured page URL onto a WebSocket URL and keeps a session
//!    open to the controller, reconnecting after a fixed delay whenever it
//!    drops.
//! 2. Receives the controller's config push and shows one slider per door.
//! 3. Turns a slider released past 90 % of its travel into a command frame.
//! 4. When the controller answers with a challenge, solves it with the
//!    user's key and sends the response.
//!
//! # Layers
//!
//! ```text
//! application/     Session: the single event loop
//! infrastructure/
//!   transport/     SessionTransport + tokio-tungstenite connector
//!   crypto         BoxSolver (crypto_box challenge solver)
//!   storage/       TOML settings and the resolved ClientConfig
//!   console        stdin commands and the text surface
//! ```

/// Application layer: the session event loop.
pub mod application;

/// Infrastructure layer: network, crypto, settings file and console.
pub mod infrastructure;
