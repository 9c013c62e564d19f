//! Core types and codec for the rejoin JSON-RPC 2.0 session protocol.
//!
//! This crate provides the wire-level building blocks shared by the client:
//!
//! - **Types**: requests, responses and ids, including the non-standard
//!   `sessionId` member that carries the server-assigned session identity
//! - **Codec**: encoding outbound frames and classifying inbound ones
//! - **Errors**: the error enum covering protocol, transport and lifecycle
//!   failures
//!
//! The crate is transport-agnostic: it knows how to turn messages into JSON
//! text and back, but not how that text travels. The `rejoin-client` crate
//! supplies the WebSocket transport and the session state machine on top.

pub mod codec;
pub mod error;
pub mod types;

pub use error::{Error, ErrorData, Result};
pub use types::{
    Id, Inbound, Request, Response, INVALID_SESSION_CODE, JSONRPC_VERSION, METHOD_CLOSE_SESSION,
    METHOD_CONNECT, METHOD_PING,
};
