//! Storage infrastructure: the TOML settings file.
//!
//! The `config` sub-module reads the optional settings file, supplies
//! defaults for anything it leaves out, and resolves the final layer into
//! the [`config::ClientConfig`] the rest of the client runs on.

pub mod config;
