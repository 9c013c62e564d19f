//! Shared test utilities: a mock WebSocket server that can be scripted to
//! speak the session protocol, plus listener and polling helpers.
#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use rejoin_client::ConnectionListener;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// What the scripted handler wants done with an inbound frame.
pub enum ServerReply {
    Text(String),
    Close,
    Ignore,
}

enum Inject {
    Text(String),
    Close,
}

/// Mock WebSocket server for client testing.
///
/// The TCP listener stays bound across connection drops, so a reconnecting
/// client lands back on the same address. The handler closure is invoked
/// with the zero-based connection index and the raw inbound frame; every
/// inbound frame is also mirrored to a capture channel for assertions.
pub struct MockSessionServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    message_rx: mpsc::Receiver<String>,
    inject_slot: Arc<Mutex<Option<mpsc::UnboundedSender<Inject>>>>,
    refuse: Arc<AtomicUsize>,
    connections: Arc<AtomicUsize>,
}

impl MockSessionServer {
    pub async fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(usize, &str) -> ServerReply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (message_tx, message_rx) = mpsc::channel::<String>(100);
        let inject_slot: Arc<Mutex<Option<mpsc::UnboundedSender<Inject>>>> =
            Arc::new(Mutex::new(None));
        let refuse = Arc::new(AtomicUsize::new(0));
        let connections = Arc::new(AtomicUsize::new(0));

        let handler = Arc::new(handler);
        {
            let inject_slot = Arc::clone(&inject_slot);
            let refuse = Arc::clone(&refuse);
            let connections = Arc::clone(&connections);
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = shutdown_rx.recv() => break,
                        accepted = listener.accept() => {
                            let Ok((stream, _)) = accepted else { break };
                            if refuse.load(Ordering::SeqCst) > 0 {
                                refuse.fetch_sub(1, Ordering::SeqCst);
                                drop(stream);
                                continue;
                            }
                            let index = connections.fetch_add(1, Ordering::SeqCst);
                            let handler = Arc::clone(&handler);
                            let message_tx = message_tx.clone();
                            let inject_slot = Arc::clone(&inject_slot);
                            tokio::spawn(run_connection(
                                stream, index, handler, message_tx, inject_slot,
                            ));
                        }
                    }
                }
            });
        }

        // give the accept loop a moment to come up
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            shutdown_tx,
            message_rx,
            inject_slot,
            refuse,
            connections,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Next frame the server received, within 5 seconds.
    pub async fn next_message(&mut self) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(5), self.message_rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Drop the next `n` TCP connections before the WebSocket handshake.
    pub fn refuse_next(&self, n: usize) {
        self.refuse.store(n, Ordering::SeqCst);
    }

    /// How many WebSocket connections were accepted so far.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Push an unsolicited frame to the current connection.
    pub async fn push(&self, text: impl Into<String>) {
        if let Some(tx) = self.inject_slot.lock().await.as_ref() {
            let _ = tx.send(Inject::Text(text.into()));
        }
    }

    /// Close the current connection from the server side.
    pub async fn kick(&self) {
        if let Some(tx) = self.inject_slot.lock().await.as_ref() {
            let _ = tx.send(Inject::Close);
        }
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

async fn run_connection<F>(
    stream: TcpStream,
    index: usize,
    handler: Arc<F>,
    message_tx: mpsc::Sender<String>,
    inject_slot: Arc<Mutex<Option<mpsc::UnboundedSender<Inject>>>>,
) where
    F: Fn(usize, &str) -> ServerReply + Send + Sync + 'static,
{
    let Ok(ws) = accept_async(stream).await else {
        return;
    };
    let (mut write, mut read) = ws.split();
    let (inject_tx, mut inject_rx) = mpsc::unbounded_channel();
    *inject_slot.lock().await = Some(inject_tx);

    loop {
        tokio::select! {
            inbound = read.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    let _ = message_tx.send(text.clone()).await;
                    match handler(index, &text) {
                        ServerReply::Text(reply) => {
                            let _ = write.send(Message::Text(reply)).await;
                        }
                        ServerReply::Close => {
                            let _ = write.send(Message::Close(None)).await;
                            break;
                        }
                        ServerReply::Ignore => {}
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            },
            injected = inject_rx.recv() => match injected {
                Some(Inject::Text(text)) => {
                    let _ = write.send(Message::Text(text)).await;
                }
                Some(Inject::Close) | None => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },
        }
    }
}

pub fn parse_frame(text: &str) -> serde_json::Value {
    serde_json::from_str(text).unwrap()
}

pub fn method_of(frame: &serde_json::Value) -> Option<&str> {
    frame.get("method").and_then(|m| m.as_str())
}

pub fn id_of(frame: &serde_json::Value) -> i64 {
    frame["id"].as_i64().unwrap()
}

pub fn ok_response(id: i64, result: serde_json::Value, session_id: Option<&str>) -> String {
    let mut response = serde_json::json!({
        "jsonrpc": "2.0",
        "result": result,
        "id": id,
    });
    if let Some(session_id) = session_id {
        response["sessionId"] = serde_json::json!(session_id);
    }
    response.to_string()
}

pub fn error_response(id: i64, code: i32, message: &str) -> String {
    serde_json::json!({
        "jsonrpc": "2.0",
        "error": {"code": code, "message": message},
        "id": id,
    })
    .to_string()
}

/// Listener that records every event name, in order.
#[derive(Default)]
pub struct RecordingListener {
    events: StdMutex<Vec<String>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        let prefixed = format!("{name}:");
        self.events()
            .iter()
            .filter(|e| e.as_str() == name || e.starts_with(&prefixed))
            .count()
    }

    fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }
}

impl ConnectionListener for RecordingListener {
    fn connected(&self) {
        self.push("connected");
    }
    fn disconnected(&self) {
        self.push("disconnected");
    }
    fn connection_failed(&self) {
        self.push("connection_failed");
    }
    fn reconnecting(&self) {
        self.push("reconnecting");
    }
    fn reconnected(&self, same_server: bool) {
        self.push(format!("reconnected:{same_server}"));
    }
}

/// Poll `cond` every 10 ms until it holds or `timeout` elapses.
pub async fn wait_until(cond: impl Fn() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
