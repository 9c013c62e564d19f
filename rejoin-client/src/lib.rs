//! Session-resuming JSON-RPC 2.0 client over WebSocket.
//!
//! The client keeps one logical, server-assigned session alive across
//! transport drops. When the channel is lost without the user closing the
//! client, it reconnects (optionally forever) and runs a resume exchange: a
//! `connect` request carrying the previous session id. The server either
//! accepts (same session, same instance) or rejects it as invalid, in which
//! case the client negotiates a fresh session and fails everything that was
//! pending across the gap.
//!
//! # Lifecycle
//!
//! `Disconnected → Connecting → Connected ⇄ Reconnecting`, terminating in
//! `Closed` (user close, initial connect failure, or a reconnect that gave
//! up). A [`ConnectionListener`] observes the transitions; a
//! [`ServerRequestHandler`] serves requests the *server* initiates over the
//! same channel.
//!
//! # Example
//!
//! ```rust,no_run
//! use rejoin_client::ClientBuilder;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ClientBuilder::new("ws://localhost:8080")
//!         .try_reconnecting_forever(true)
//!         .connect()
//!         .await?;
//!
//!     let value: serde_json::Value = client.request("echo", json!({"x": 1})).await?;
//!     println!("result: {}", value);
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```

mod builder;
mod client;
mod config;
mod handler;
mod heartbeat;
mod listener;
mod metrics;
mod pending;
mod reconnect;
mod session;
mod transport;

pub use builder::ClientBuilder;
pub use client::RejoinClient;
pub use config::{ClientConfig, REQUEST_TIMEOUT_ENV};
pub use handler::{ResponseSender, ServerRequestHandler};
pub use listener::ConnectionListener;
pub use metrics::ClientMetrics;
pub use session::{Session, SessionState};
pub use transport::{Transport, TransportEvent, WsTransport};
