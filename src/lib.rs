//! rejoin: a session-resuming JSON-RPC 2.0 client over WebSocket.
//!
//! This is the convenience crate re-exporting the rejoin sub-crates:
//!
//! - **rejoin-core**: wire types, codec and errors
//! - **rejoin-client**: the client itself (session state machine, pending
//!   request registry, reconnection, heartbeat)
//!
//! # Quick start
//!
//! ```rust,no_run
//! use rejoin::ClientBuilder;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ClientBuilder::new("ws://localhost:8080").connect().await?;
//!
//!     let value: serde_json::Value = client.request("echo", json!({"x": 1})).await?;
//!     println!("result: {}", value);
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```
//!
//! The client keeps one logical session alive across transport drops: after
//! a reconnect it resumes the previous session with a `connect` exchange, or
//! negotiates a fresh one when the server no longer knows it.

pub use rejoin_client as client;
pub use rejoin_core as core;

pub use rejoin_client::{
    ClientBuilder, ClientConfig, ConnectionListener, RejoinClient, ResponseSender,
    ServerRequestHandler, SessionState,
};
pub use rejoin_core::{Error, ErrorData, Id, Request, Response, Result};
