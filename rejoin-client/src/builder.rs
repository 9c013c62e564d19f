//! Client builder.
//!
//! ```rust,no_run
//! use rejoin_client::ClientBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> rejoin_core::Result<()> {
//! let client = ClientBuilder::new("ws://localhost:8080")
//!     .request_timeout(Duration::from_secs(10))
//!     .try_reconnecting_forever(true)
//!     .heartbeat_interval(Duration::from_secs(30))
//!     .connect()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use rejoin_core::Result;
use std::sync::Arc;
use std::time::Duration;

use crate::client::RejoinClient;
use crate::config::ClientConfig;
use crate::handler::{DefaultHandler, ServerRequestHandler};
use crate::listener::ConnectionListener;
use crate::metrics::ClientMetrics;
use crate::transport::{Transport, WsTransport};

/// Fluent configuration for a [`RejoinClient`].
pub struct ClientBuilder {
    url: String,
    config: ClientConfig,
    listener: Option<Arc<dyn ConnectionListener>>,
    handler: Option<Arc<dyn ServerRequestHandler>>,
    transport: Option<Arc<dyn Transport>>,
    enable_metrics: bool,
}

impl ClientBuilder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            config: ClientConfig::default(),
            listener: None,
            handler: None,
            transport: None,
            enable_metrics: false,
        }
    }

    /// Replace the whole configuration at once.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_timeout = timeout;
        self
    }

    pub fn connection_lock_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_lock_timeout = timeout;
        self
    }

    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.config.reconnect_delay = delay;
        self
    }

    /// Send a `closeSession` notice to the server on [`RejoinClient::close`].
    pub fn send_close_message(mut self, yes: bool) -> Self {
        self.config.send_close_message = yes;
        self
    }

    /// Keep retrying a failed reconnect indefinitely instead of giving up.
    pub fn try_reconnecting_forever(mut self, yes: bool) -> Self {
        self.config.try_reconnecting_forever = yes;
        self
    }

    /// Retry the transport connect when it fails with a timeout.
    pub fn retry_if_timeout_on_connect(mut self, yes: bool) -> Self {
        self.config.retry_if_timeout_on_connect = yes;
        self
    }

    /// Run server-request handlers on spawned tasks (the default) or inline
    /// on the receive task. Inline handlers must never issue synchronous
    /// outbound requests.
    pub fn concurrent_server_request(mut self, yes: bool) -> Self {
        self.config.concurrent_server_request = yes;
        self
    }

    /// Ping the server at this interval; a failed ping forces reconnection.
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config.heartbeat_interval = Some(interval);
        self
    }

    /// Receive connection lifecycle events.
    pub fn listener(mut self, listener: Arc<dyn ConnectionListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Handle server-initiated requests and connection lifecycle hooks.
    pub fn handler(mut self, handler: Arc<dyn ServerRequestHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Use a custom transport driver instead of the WebSocket default.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Record OpenTelemetry metrics through the global meter provider.
    pub fn with_metrics(mut self) -> Self {
        self.enable_metrics = true;
        self
    }

    /// Build the client without connecting; the transport connects lazily on
    /// the first request (or on an explicit [`RejoinClient::connect`]).
    pub fn build(self) -> RejoinClient {
        let transport = self.transport.unwrap_or_else(|| {
            Arc::new(WsTransport::new(
                self.url.clone(),
                self.config.connection_timeout,
            ))
        });
        let handler = self
            .handler
            .unwrap_or_else(|| Arc::new(DefaultHandler) as Arc<dyn ServerRequestHandler>);
        let metrics = self
            .enable_metrics
            .then(|| Arc::new(ClientMetrics::new("rejoin-client")));
        RejoinClient::from_parts(self.url, self.config, transport, self.listener, handler, metrics)
    }

    /// Build and connect, surfacing the initial connect failure.
    pub async fn connect(self) -> Result<RejoinClient> {
        let client = self.build();
        client.connect().await?;
        Ok(client)
    }
}
