//! REST front end for the `tourney` tournament manager.
//!
//! The binary in `main.rs` wires configuration, logging and storage; the
//! router lives in [`api`] so integration tests can drive it directly.

pub mod api;
pub mod config;
pub mod logging;
