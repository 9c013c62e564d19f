//! The client: session state machine, request/response coordination and the
//! connect/resume protocol.
//!
//! # Cloning
//!
//! `RejoinClient` is cheaply cloneable; all clones share one session and one
//! transport and can be used from any task.
//!
//! # Locking
//!
//! One session-wide lock serializes the compound "check connected → connect
//! → run resume protocol → update session" sequence against concurrent
//! sends, which all pass through `connect_if_necessary`. Everything called
//! with the lock held goes through `*_locked` / `*_connected` internals that
//! never re-acquire it. Teardown has its own entry-serializing mutex, so it
//! can be reached from inside the locked section without deadlocking.

use rejoin_core::{
    codec, Error, Id, Inbound, Request, Response, Result, INVALID_SESSION_CODE,
    METHOD_CLOSE_SESSION, METHOD_CONNECT, METHOD_PING,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, Weak};
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};

use crate::config::ClientConfig;
use crate::handler::{ResponseSender, ServerRequestHandler};
use crate::heartbeat::Heartbeat;
use crate::listener::{ConnectionEvent, ConnectionListener, ListenerNotifier};
use crate::metrics::ClientMetrics;
use crate::pending::PendingRequests;
use crate::reconnect::ReconnectController;
use crate::session::{Session, SessionState};
use crate::transport::{Transport, TransportEvent};

/// JSON-RPC 2.0 client over a persistent text-message transport, keeping one
/// logical session alive across transport drops.
#[derive(Clone)]
pub struct RejoinClient {
    inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) weak: Weak<ClientInner>,
    pub(crate) url: String,
    pub(crate) config: ClientConfig,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) session: Arc<Session>,
    pub(crate) pending: PendingRequests,
    pub(crate) notifier: ListenerNotifier,
    pub(crate) handler: Arc<dyn ServerRequestHandler>,
    pub(crate) heartbeat: Heartbeat,
    pub(crate) metrics: Option<Arc<ClientMetrics>>,
    /// Set for the whole reconnect cycle, from the transport loss until the
    /// cycle succeeds, gives up, or the user closes the client.
    pub(crate) reconnecting: AtomicBool,
    conn_lock: Mutex<()>,
    close_lock: Mutex<()>,
    next_id: AtomicU64,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    events_rx: StdMutex<Option<mpsc::UnboundedReceiver<TransportEvent>>>,
}

impl RejoinClient {
    pub(crate) fn from_parts(
        url: String,
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        listener: Option<Arc<dyn ConnectionListener>>,
        handler: Arc<dyn ServerRequestHandler>,
        metrics: Option<Arc<ClientMetrics>>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let inner = Arc::new_cyclic(|weak| ClientInner {
            weak: weak.clone(),
            url,
            config,
            transport,
            session: Arc::new(Session::new()),
            pending: PendingRequests::new(),
            notifier: ListenerNotifier::new(listener),
            handler,
            heartbeat: Heartbeat::new(),
            metrics,
            reconnecting: AtomicBool::new(false),
            conn_lock: Mutex::new(()),
            close_lock: Mutex::new(()),
            next_id: AtomicU64::new(1),
            events_tx,
            events_rx: StdMutex::new(Some(events_rx)),
        });
        Self { inner }
    }

    /// Connect now instead of lazily on the first request.
    pub async fn connect(&self) -> Result<()> {
        self.inner.connect_if_necessary().await
    }

    /// The session this client is bound to.
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// The server-assigned session id, once negotiated.
    pub fn session_id(&self) -> Option<String> {
        self.inner.session.session_id()
    }

    pub fn state(&self) -> SessionState {
        self.inner.session.state()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.transport.is_connected()
    }

    /// Send a request and await its typed result.
    ///
    /// Connects first if necessary. Serializes `params` (pass `()` for
    /// none), waits up to the configured request timeout for the response,
    /// and deserializes its `result` member into `R`. A server error payload
    /// surfaces as [`Error::JsonRpc`].
    pub async fn request<R>(&self, method: &str, params: impl Serialize) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let params = to_params(params)?;
        let response = self.inner.send_request(method, params).await?;
        decode_result(response)
    }

    /// Send a request and get the raw response envelope back.
    pub async fn request_raw(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<Response> {
        self.inner.send_request(method, params).await
    }

    /// Continuation-style flavor of [`request`](Self::request): the send runs
    /// on its own task and `callback` receives the outcome.
    pub fn request_with_callback<R, F>(&self, method: &str, params: impl Serialize, callback: F)
    where
        R: DeserializeOwned + Send + 'static,
        F: FnOnce(Result<R>) + Send + 'static,
    {
        let params = to_params(params);
        let client = self.clone();
        let method = method.to_string();
        tokio::spawn(async move {
            let result = match params {
                Ok(params) => match client.inner.send_request(&method, params).await {
                    Ok(response) => decode_result(response),
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            };
            callback(result);
        });
    }

    /// Send a notification: a request without an id. No response is expected
    /// and none is waited for.
    pub async fn notify(&self, method: &str, params: impl Serialize) -> Result<()> {
        let params = to_params(params)?;
        self.inner.connect_if_necessary().await?;
        let request =
            Request::notification(method, params).with_session_id(self.inner.session.session_id());
        self.inner.send_frame(&request).await
    }

    /// Close the client. Terminal: a closed client cannot be reused.
    ///
    /// Best-effort sends a `closeSession` notice when configured, fails all
    /// pending requests with [`Error::ClientClosed`], fires `disconnected`,
    /// and closes the transport. Any in-flight reconnect cycle is abandoned.
    pub async fn close(&self) {
        let inner = &self.inner;
        tracing::info!(
            session_id = ?inner.session.session_id(),
            "explicit client close"
        );
        inner.session.mark_closed_by_user();

        if inner.config.send_close_message {
            if let Err(error) = inner.send_close_session().await {
                tracing::warn!(error = %error, "failed to send close message");
            }
        }

        // any in-flight reconnect becomes a user-initiated close
        inner.reconnecting.store(false, Ordering::SeqCst);
        inner.shutdown("session closed by user", false).await;
    }
}

impl ClientInner {
    /// Acquire the session lock and make sure the transport is connected,
    /// running the connect/resume protocol when it was not.
    pub(crate) async fn connect_if_necessary(&self) -> Result<()> {
        let lock_timeout = self.config.connection_lock_timeout;
        let guard = match tokio::time::timeout(lock_timeout, self.conn_lock.lock()).await {
            Ok(guard) => guard,
            Err(_) => {
                let error = Error::LockTimeout {
                    millis: lock_timeout.as_millis() as u64,
                };
                tracing::warn!(url = %self.url, "session lock acquisition timed out, closing client");
                self.shutdown(&format!("closed by error: {error}"), false).await;
                return Err(error);
            }
        };
        let result = self.connect_locked().await;
        drop(guard);
        result
    }

    async fn connect_locked(&self) -> Result<()> {
        if self.transport.is_connected() {
            return Ok(());
        }
        if self.session.closed_by_user() || self.session.state() == SessionState::Closed {
            return Err(Error::ClientClosed);
        }

        // the receive pump starts with the first connect attempt
        if let Some(rx) = self.events_rx.lock().unwrap().take() {
            spawn_event_pump(self.weak.clone(), rx);
        }

        if !self.reconnecting.load(Ordering::SeqCst) {
            self.transition(SessionState::Connecting);
        }

        tracing::debug!(url = %self.url, "connecting to server");
        loop {
            match self.transport.connect(self.events_tx.clone()).await {
                Ok(()) => break,
                Err(error @ Error::ConnectTimeout { .. })
                    if self.config.retry_if_timeout_on_connect =>
                {
                    tracing::debug!(error = %error, "connect timed out, retrying");
                }
                Err(error) => {
                    self.shutdown(&format!("closed by error: {error}"), false).await;
                    return Err(error);
                }
            }
        }

        self.update_session().await
    }

    /// Reconcile session state after the transport reports connected: run
    /// the resume protocol on a reconnect, notify the handler and listener
    /// on a fresh connect, and (re)enable the heartbeat.
    async fn update_session(&self) -> Result<()> {
        // a user close can land while the transport connect was in flight
        if self.session.closed_by_user() {
            return Err(Error::ClientClosed);
        }
        if self.reconnecting.load(Ordering::SeqCst) {
            let same_server = self.execute_connect_protocol().await?;
            self.transition(SessionState::Connected);
            self.notifier.fire(ConnectionEvent::Reconnected { same_server });
            if let Some(metrics) = &self.metrics {
                metrics.record_reconnection_success();
            }
        } else {
            self.transition(SessionState::Connected);
            self.session.mark_ever_connected();
            self.handler.after_connection_established(&self.session).await;
            self.notifier.fire(ConnectionEvent::Connected);
        }

        if let Some(interval) = self.config.heartbeat_interval {
            self.heartbeat.enable(&self.session, self.weak.clone(), interval);
        }
        Ok(())
    }

    /// First exchange after a reconnect: `connect` carrying the prior
    /// session id. Success means the same session resumed on the same server
    /// instance. The invalid-session error means the server lost it: every
    /// pending request is failed, the local id cleared, and a bare `connect`
    /// negotiates a fresh session. Returns whether the old session survived.
    async fn execute_connect_protocol(&self) -> Result<bool> {
        match self.request_connected(METHOD_CONNECT, None).await {
            Ok(_) => {
                tracing::info!(url = %self.url, "resumed existing session");
                Ok(true)
            }
            Err(Error::JsonRpc(error)) if error.code == INVALID_SESSION_CODE => {
                self.pending.close_all().await;
                self.session.clear_session_id();
                match self.request_connected(METHOD_CONNECT, None).await {
                    Ok(_) => {
                        tracing::info!(url = %self.url, "negotiated new session");
                        Ok(false)
                    }
                    Err(error) => {
                        self.shutdown(&format!("closed by error: {error}"), false).await;
                        Err(error)
                    }
                }
            }
            Err(error) => {
                self.shutdown(&format!("closed by error: {error}"), false).await;
                Err(error)
            }
        }
    }

    /// Connect if necessary, then send and await one request.
    pub(crate) async fn send_request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<Response> {
        self.connect_if_necessary().await?;
        let start = Instant::now();
        let result = self.request_connected(method, params).await;
        if let Some(metrics) = &self.metrics {
            let status = if result.is_ok() { "success" } else { "error" };
            metrics.record_request(method, status, start.elapsed());
        }
        result
    }

    /// Send one request over the already-connected transport and await its
    /// response. Used directly by the resume protocol, which runs with the
    /// session lock held and must not reacquire it.
    async fn request_connected(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<Response> {
        let id = Id::Number(self.next_id.fetch_add(1, Ordering::Relaxed) as i64);
        let rx = self.pending.reserve(id.clone()).await?;

        let request = Request::new(method, params, Some(id.clone()))
            .with_session_id(self.session.session_id());
        if let Err(error) = self.send_frame(&request).await {
            // never hit the wire; nothing will complete the slot
            self.pending.discard(&id).await;
            return Err(error);
        }

        let is_ping = method == METHOD_PING;
        let request_timeout = self.config.request_timeout;
        let response = match tokio::time::timeout(request_timeout, rx).await {
            Err(_) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_error("timeout");
                }
                return Err(Error::RequestTimeout {
                    id,
                    millis: request_timeout.as_millis() as u64,
                });
            }
            Ok(Err(_)) => return Err(Error::Internal("response channel closed".to_string())),
            Ok(Ok(result)) => result?,
        };

        if is_ping {
            tracing::trace!(id = %id, "<-Res");
        } else {
            tracing::debug!(id = %id, "<-Res");
        }

        if let Some(error) = response.error {
            return Err(Error::JsonRpc(error));
        }
        Ok(response)
    }

    async fn send_frame(&self, request: &Request) -> Result<()> {
        let json = codec::encode(request)?;
        if request.method == METHOD_PING {
            tracing::trace!(frame = %json, "Req->");
        } else {
            tracing::debug!(frame = %json, "Req->");
        }
        self.transport.send_text(&json).await
    }

    /// Fire-and-forget `closeSession` notice. Sent with an id so a server
    /// may answer, but no slot is reserved; a reply is dropped as unmatched.
    async fn send_close_session(&self) -> Result<()> {
        let id = Id::Number(self.next_id.fetch_add(1, Ordering::Relaxed) as i64);
        let request = Request::new(METHOD_CLOSE_SESSION, None, Some(id))
            .with_session_id(self.session.session_id());
        self.send_frame(&request).await
    }

    pub(crate) async fn send_ping(&self) -> Result<Response> {
        self.connect_if_necessary().await?;
        self.request_connected(METHOD_PING, None).await
    }

    /// Receive dispatch: demultiplex one inbound frame. A frame carrying a
    /// `method` member is a server-initiated request; anything else is a
    /// response to a pending request. Unparseable frames are dropped without
    /// closing the transport.
    pub(crate) async fn received_text_message(&self, text: &str) {
        match codec::decode_inbound(text) {
            Ok(Inbound::Request(request)) => self.handle_request_from_server(request).await,
            Ok(Inbound::Response(response)) => self.handle_response_from_server(response).await,
            Err(error) => {
                tracing::error!(error = %error, frame = %text, "dropping unparseable frame");
            }
        }
    }

    async fn handle_response_from_server(&self, response: Response) {
        if let Some(session_id) = &response.session_id {
            self.session.adopt_session_id(session_id);
        }
        self.pending.complete(response).await;
    }

    async fn handle_request_from_server(&self, request: Request) {
        if request.method == METHOD_PING {
            tracing::trace!(method = %request.method, "<-Req");
        } else {
            tracing::debug!(method = %request.method, "<-Req");
        }

        let sender = ResponseSender::new(Arc::clone(&self.transport));
        let session = Arc::clone(&self.session);
        let handler = Arc::clone(&self.handler);

        if self.config.concurrent_server_request {
            tokio::spawn(async move {
                if let Err(error) = handler.handle_request(&session, request, &sender).await {
                    tracing::warn!(error = %error, "server request handler failed");
                }
            });
        } else {
            // runs on the receive task: the handler must not wait on an
            // outbound response here, nobody else will read the reply
            if let Err(error) = self.handler.handle_request(&session, request, &sender).await {
                tracing::warn!(error = %error, "server request handler failed");
            }
        }
    }

    /// The transport dropped without user initiation.
    pub(crate) async fn handle_reconnect_disconnection(&self, code: u16, reason: &str) {
        if self.session.state() == SessionState::Closed {
            return;
        }
        if self.session.closed_by_user() {
            self.pending.close_all().await;
            self.handler.after_connection_closed(&self.session, reason).await;
            self.notifier.fire(ConnectionEvent::Disconnected);
        } else {
            tracing::info!(code, reason, url = %self.url, "transport closed, starting reconnection");
            ReconnectController::start(self, reason);
        }
    }

    /// Force the transport closed and drive the reconnect path, exactly as
    /// if the channel had dropped externally. Used when a heartbeat ping
    /// times out.
    pub(crate) async fn close_with_reconnection(&self) {
        tracing::info!(url = %self.url, "closing transport to force reconnection");
        self.transport.close().await;
        self.handle_reconnect_disconnection(999, "ping timeout").await;
    }

    /// Single-entry teardown. While a reconnect cycle is in progress only
    /// the native transport is closed: the reconnect task owns the decision
    /// to give up and re-enters here with the cycle cleared.
    pub(crate) async fn shutdown(&self, reason: &str, connected_before: bool) {
        let _guard = self.close_lock.lock().await;
        if self.session.state() == SessionState::Closed {
            return;
        }
        if !self.reconnecting.load(Ordering::SeqCst) {
            self.notify_user_client_closed(reason, connected_before).await;
            self.transition(SessionState::Closed);
            self.notifier.shutdown();
        }
        self.transport.close().await;
        self.heartbeat.disable(&self.session);
    }

    /// Tell the user the client is done: `disconnected` when they closed it
    /// or it had been connected, `connectionFailed` otherwise. The two are
    /// mutually exclusive for one lifecycle termination.
    async fn notify_user_client_closed(&self, reason: &str, connected_before: bool) {
        if self.session.closed_by_user() || connected_before {
            self.notifier.fire(ConnectionEvent::Disconnected);
        } else {
            self.notifier.fire(ConnectionEvent::ConnectionFailed);
        }

        self.pending.close_all().await;

        if self.session.ever_connected() {
            self.handler.after_connection_closed(&self.session, reason).await;
        }
    }

    pub(crate) fn transition(&self, state: SessionState) {
        self.session.set_state(state);
        if let Some(metrics) = &self.metrics {
            metrics.update_connection_state(state);
        }
    }
}

fn spawn_event_pump(
    inner: Weak<ClientInner>,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
) {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            match event {
                TransportEvent::Message(text) => inner.received_text_message(&text).await,
                TransportEvent::Closed { code, reason } => {
                    inner.handle_reconnect_disconnection(code, &reason).await;
                }
            }
        }
    });
}

fn to_params(params: impl Serialize) -> Result<Option<serde_json::Value>> {
    let value = serde_json::to_value(params).map_err(|e| Error::Serialization(e.to_string()))?;
    Ok(if value.is_null() { None } else { Some(value) })
}

fn decode_result<R: DeserializeOwned>(response: Response) -> Result<R> {
    let result = response.result.unwrap_or(serde_json::Value::Null);
    serde_json::from_value(result).map_err(|e| Error::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_params_are_omitted() {
        assert!(to_params(()).unwrap().is_none());
        assert!(to_params(serde_json::json!({"x": 1})).unwrap().is_some());
    }

    #[test]
    fn decode_result_reads_the_result_member() {
        let response = Response::success(serde_json::json!({"value": 2}), Some(Id::Number(1)));
        let value: serde_json::Value = decode_result(response).unwrap();
        assert_eq!(value["value"], 2);
    }

    #[test]
    fn decode_result_rejects_shape_mismatch() {
        let response = Response::success(serde_json::json!("text"), Some(Id::Number(1)));
        let result: Result<u64> = decode_result(response);
        assert!(matches!(result, Err(Error::Serialization(_))));
    }
}
