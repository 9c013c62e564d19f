//! Error types for the session protocol client.
//!
//! `Error` is the application-level enum surfaced through every client API;
//! `ErrorData` is the wire-format error object carried in a response's
//! `error` member.

use crate::types::Id;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between a send and its resolution.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The server answered with an error payload.
    #[error("JSON-RPC error: {0}")]
    JsonRpc(#[from] ErrorData),

    /// The client was closed. Terminal: a closed client cannot be reused,
    /// create a new one. Also the resolution every pending waiter observes
    /// when the registry is closed globally.
    #[error("client closed")]
    ClientClosed,

    /// No response arrived within the per-request timeout. The client stays
    /// usable; a late response is silently dropped.
    #[error("timeout of {millis} ms waiting for response to request {id}")]
    RequestTimeout { id: Id, millis: u64 },

    /// The transport did not connect within its timeout. Distinguished from
    /// other connect failures so the timeout-specific retry can match on it.
    #[error("timeout of {millis} ms connecting to {url}")]
    ConnectTimeout { url: String, millis: u64 },

    /// The session lock could not be acquired within its bound. Treated as
    /// a fatal stuck state: the client tears itself down.
    #[error("timeout of {millis} ms acquiring the session lock")]
    LockTimeout { millis: u64 },

    /// Inbound text was not a valid JSON-RPC frame. Logged and dropped; the
    /// connection stays up.
    #[error("parse error: {0}")]
    Parse(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// WebSocket or I/O failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// A request id was reserved while still in flight.
    #[error("request id {0} is already in flight")]
    DuplicateRequest(Id),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for the server error that invalidates a resumed session.
    pub fn is_invalid_session(&self) -> bool {
        matches!(self, Error::JsonRpc(data) if data.code == crate::types::INVALID_SESSION_CODE)
    }
}

/// Wire-format JSON-RPC error object: numeric `code`, human-readable
/// `message`, optional structured `data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorData {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ErrorData {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(code: i32, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::new(-32601, format!("Method not found: {}", method.into()))
    }

    /// Invalid params (-32602).
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::new(-32602, msg)
    }

    /// Internal error (-32603).
    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::new(-32603, msg)
    }

    /// The invalid-session error a server returns when asked to resume a
    /// session it no longer knows.
    pub fn invalid_session() -> Self {
        Self::new(crate::types::INVALID_SESSION_CODE, "Invalid session")
    }
}

impl std::fmt::Display for ErrorData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ErrorData {}
