//! Subscriber-facing network layer for the reader bridge.
//!
//! This crate exposes the bridge's event stream to WebSocket subscribers
//! and hosts the `tagbridge` binary that wires discovery, the lifecycle
//! supervisor and the endpoint together.

pub mod ws;

pub use ws::{WsServer, WsServerConfig, WsServerError};
