//! Infrastructure layer for the client.
//!
//! Contains the adapters between the session loop and the outside world.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `slidegate_core`, but MUST NOT be imported by `slidegate_core`.
//!
//! # Sub-modules
//!
//! - **`transport`** – `SessionTransport`, the reconnecting session state
//!   machine, plus the tokio-tungstenite `WsConnector`.
//!
//! - **`crypto`** – `BoxSolver`, the `ChallengeSolver` that opens
//!   controller challenges with the user's secret key.
//!
//! - **`storage`** – the TOML settings file and the resolved
//!   `ClientConfig`.
//!
//! - **`console`** – stdin command parser and the plain-text renderer.

pub mod console;
pub mod crypto;
pub mod storage;
pub mod transport;
