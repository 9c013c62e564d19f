//! Boundary to the native text-message channel.
//!
//! The coordinator talks to the wire through the [`Transport`] trait and
//! hears back through a [`TransportEvent`] channel handed to `connect`: one
//! event per inbound text frame, plus a single `Closed` event when the
//! channel drops without the client asking for it. A close initiated through
//! [`Transport::close`] is never reported: the coordinator is driving its
//! own teardown in that case and must not see it as a transport loss.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use rejoin_core::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// What a transport driver reports to the session coordinator.
#[derive(Debug)]
pub enum TransportEvent {
    /// One inbound text frame.
    Message(String),
    /// The channel closed and the client did not initiate it.
    Closed { code: u16, reason: String },
}

/// A full-duplex text-message channel.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish the native connection, waiting at most the driver's
    /// connection timeout. A timeout must surface as
    /// [`Error::ConnectTimeout`] so it can be retried separately from other
    /// failures. Inbound frames and non-local closes are reported through
    /// `events` until the connection ends.
    async fn connect(&self, events: mpsc::UnboundedSender<TransportEvent>) -> Result<()>;

    /// Deliver one JSON text frame.
    async fn send_text(&self, text: &str) -> Result<()>;

    /// Close the native connection. Idempotent and infallible.
    async fn close(&self);

    /// Non-blocking snapshot of the connection state.
    fn is_connected(&self) -> bool;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// WebSocket driver over `tokio-tungstenite`.
pub struct WsTransport {
    url: String,
    connection_timeout: Duration,
    sink: Mutex<Option<WsSink>>,
    shared: Arc<Shared>,
    read_task: StdMutex<Option<JoinHandle<()>>>,
}

struct Shared {
    connected: AtomicBool,
    locally_closed: AtomicBool,
}

impl WsTransport {
    pub fn new(url: impl Into<String>, connection_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            connection_timeout,
            sink: Mutex::new(None),
            shared: Arc::new(Shared {
                connected: AtomicBool::new(false),
                locally_closed: AtomicBool::new(false),
            }),
            read_task: StdMutex::new(None),
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, events: mpsc::UnboundedSender<TransportEvent>) -> Result<()> {
        let attempt = connect_async(&self.url);
        let (stream, _) = match tokio::time::timeout(self.connection_timeout, attempt).await {
            Err(_) => {
                return Err(Error::ConnectTimeout {
                    url: self.url.clone(),
                    millis: self.connection_timeout.as_millis() as u64,
                })
            }
            Ok(Err(e)) => return Err(Error::Transport(e.to_string())),
            Ok(Ok(ok)) => ok,
        };

        let (sink, stream) = stream.split();
        *self.sink.lock().await = Some(sink);
        self.shared.locally_closed.store(false, Ordering::SeqCst);
        self.shared.connected.store(true, Ordering::SeqCst);

        let handle = tokio::spawn(read_loop(stream, events, Arc::clone(&self.shared)));
        if let Some(old) = self.read_task.lock().unwrap().replace(handle) {
            old.abort();
        }
        Ok(())
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        let mut guard = self.sink.lock().await;
        let sink = guard
            .as_mut()
            .ok_or_else(|| Error::Transport("not connected".to_string()))?;
        sink.send(Message::Text(text.to_string()))
            .await
            .map_err(|e| Error::Transport(e.to_string()))
    }

    async fn close(&self) {
        self.shared.locally_closed.store(true, Ordering::SeqCst);
        self.shared.connected.store(false, Ordering::SeqCst);
        if let Some(mut sink) = self.sink.lock().await.take() {
            let _ = sink.send(Message::Close(None)).await;
        }
        if let Some(task) = self.read_task.lock().unwrap().take() {
            task.abort();
        }
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }
}

async fn read_loop(
    mut stream: SplitStream<WsStream>,
    events: mpsc::UnboundedSender<TransportEvent>,
    shared: Arc<Shared>,
) {
    let close_event = loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                if events.send(TransportEvent::Message(text)).is_err() {
                    return;
                }
            }
            Some(Ok(Message::Close(frame))) => {
                break match frame {
                    Some(f) => TransportEvent::Closed {
                        code: f.code.into(),
                        reason: f.reason.into_owned(),
                    },
                    None => TransportEvent::Closed {
                        code: 1005,
                        reason: String::new(),
                    },
                }
            }
            // binary, ping and pong frames are not part of the protocol
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                break TransportEvent::Closed {
                    code: 1006,
                    reason: e.to_string(),
                }
            }
            None => {
                break TransportEvent::Closed {
                    code: 1006,
                    reason: "connection reset".to_string(),
                }
            }
        }
    };

    shared.connected.store(false, Ordering::SeqCst);
    if !shared.locally_closed.load(Ordering::SeqCst) {
        let _ = events.send(close_event);
    }
}
