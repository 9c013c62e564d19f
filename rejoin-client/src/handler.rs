//! Server-initiated request handling.

use async_trait::async_trait;
use rejoin_core::{codec, ErrorData, Request, Response, Result, METHOD_PING};
use std::sync::Arc;

use crate::session::Session;
use crate::transport::Transport;

/// Writes responses to server-initiated requests back through the transport.
///
/// The ping flavor logs at trace instead of debug: heartbeat traffic can
/// dominate logs and must be suppressible without losing sight of normal
/// frames.
#[derive(Clone)]
pub struct ResponseSender {
    transport: Arc<dyn Transport>,
}

impl ResponseSender {
    pub(crate) fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn send_response(&self, response: &Response) -> Result<()> {
        let json = codec::encode(response)?;
        tracing::debug!(frame = %json, "<-Res");
        self.transport.send_text(&json).await
    }

    pub async fn send_ping_response(&self, response: &Response) -> Result<()> {
        let json = codec::encode(response)?;
        tracing::trace!(frame = %json, "<-Res");
        self.transport.send_text(&json).await
    }
}

/// Application hooks for connection lifecycle and server-initiated traffic.
///
/// Only `handle_request` may produce output, through the sender it is given.
/// With `concurrent_server_request` enabled (the default) each invocation
/// runs on its own task, so a handler may issue outbound requests of its
/// own. With it disabled, handlers run on the receive task and must never
/// wait for an outbound response: the task that would read the reply is the
/// one running the handler.
#[async_trait]
pub trait ServerRequestHandler: Send + Sync {
    async fn after_connection_established(&self, _session: &Session) {}

    async fn after_connection_closed(&self, _session: &Session, _reason: &str) {}

    /// Handle one server-initiated request.
    async fn handle_request(
        &self,
        session: &Session,
        request: Request,
        sender: &ResponseSender,
    ) -> Result<()>;
}

/// Fallback handler installed when the application provides none: answers
/// pings, rejects everything else with method-not-found.
pub(crate) struct DefaultHandler;

#[async_trait]
impl ServerRequestHandler for DefaultHandler {
    async fn handle_request(
        &self,
        _session: &Session,
        request: Request,
        sender: &ResponseSender,
    ) -> Result<()> {
        let Some(id) = request.id else {
            // a notification expects no reply
            return Ok(());
        };
        if request.method == METHOD_PING {
            let pong = Response::success(serde_json::json!({"value": "pong"}), Some(id));
            sender.send_ping_response(&pong).await
        } else {
            tracing::warn!(method = %request.method, "no handler for server request");
            let error = Response::error(ErrorData::method_not_found(&request.method), Some(id));
            sender.send_response(&error).await
        }
    }
}
