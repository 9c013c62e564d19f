//! JSON-RPC 2.0 wire types with the session extension.
//!
//! Besides the standard request/response shapes, both messages carry an
//! optional non-standard `sessionId` member. A server assigns a session id
//! on the first `connect` exchange and the client echoes it on every
//! subsequent request, which is what lets a session survive transport
//! reconnects.

use crate::error::ErrorData;
use serde::{Deserialize, Serialize};
use std::fmt;

/// JSON-RPC protocol version, always `"2.0"`.
pub const JSONRPC_VERSION: &str = "2.0";

/// Reserved method establishing or resuming a session.
pub const METHOD_CONNECT: &str = "connect";

/// Reserved method announcing a graceful client-side close.
pub const METHOD_CLOSE_SESSION: &str = "closeSession";

/// Reserved heartbeat method. Ping traffic is logged at trace level so it
/// can be silenced without hiding normal frames.
pub const METHOD_PING: &str = "ping";

/// Error code a server returns for a `connect` that carries an invalid or
/// expired session id. The client reacts by negotiating a fresh session.
pub const INVALID_SESSION_CODE: i32 = 40007;

/// Request id used to correlate a request with its response.
///
/// The spec allows string, number or null ids. Ids hash and compare so they
/// can key the pending-request map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    String(String),
    Number(i64),
    Null,
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::String(s) => write!(f, "\"{}\"", s),
            Id::Number(n) => write!(f, "{}", n),
            Id::Null => write!(f, "null"),
        }
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Id::Number(n)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::String(s.to_string())
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::String(s)
    }
}

/// A JSON-RPC request, outbound or server-initiated.
///
/// A request without an `id` is a notification: no response is expected and
/// the client reserves no pending slot for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    /// Server-assigned session identity, echoed once known.
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl Request {
    pub fn new(method: impl Into<String>, params: Option<serde_json::Value>, id: Option<Id>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id,
            session_id: None,
        }
    }

    /// A request with no id: fire-and-forget, no response expected.
    pub fn notification(method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self::new(method, params, None)
    }

    pub fn with_session_id(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// A JSON-RPC response envelope.
///
/// Exactly one of `result` / `error` is present on a well-formed response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl Response {
    pub fn success(result: serde_json::Value, id: Option<Id>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
            session_id: None,
        }
    }

    pub fn error(error: ErrorData, id: Option<Id>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
            session_id: None,
        }
    }

    pub fn with_session_id(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn is_success(&self) -> bool {
        self.result.is_some()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// A classified inbound frame.
///
/// An inbound object carrying a `method` member is a server-initiated
/// request; anything else is a response to one of ours.
#[derive(Debug, Clone)]
pub enum Inbound {
    Request(Request),
    Response(Response),
}
