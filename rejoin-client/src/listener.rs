//! Connection lifecycle notifications.
//!
//! Listener callbacks never run on the task that produced the event: events
//! are queued to a single dispatcher task, which both keeps callers from
//! blocking on user code and preserves event order (`reconnecting` is always
//! observed before its paired `reconnected` or `connection_failed`). A
//! listener is free to call back into the client from a callback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Callbacks for connection lifecycle events. All methods default to no-ops;
/// implement the ones you care about.
pub trait ConnectionListener: Send + Sync {
    /// First successful connect of this client.
    fn connected(&self) {}
    /// The client closed after having been connected.
    fn disconnected(&self) {}
    /// The initial connect failed, or a reconnect gave up before ever
    /// having been connected.
    fn connection_failed(&self) {}
    /// A non-user transport loss was observed; reconnection is starting.
    fn reconnecting(&self) {}
    /// Reconnection succeeded. `same_server` is true when the previous
    /// session was resumed, false when a new session had to be negotiated.
    fn reconnected(&self, _same_server: bool) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectionEvent {
    Connected,
    Disconnected,
    ConnectionFailed,
    Reconnecting,
    Reconnected { same_server: bool },
}

pub(crate) struct ListenerNotifier {
    listener: Option<Arc<dyn ConnectionListener>>,
    tx: Mutex<Option<mpsc::UnboundedSender<ConnectionEvent>>>,
    closed: AtomicBool,
}

impl ListenerNotifier {
    pub fn new(listener: Option<Arc<dyn ConnectionListener>>) -> Self {
        Self {
            listener,
            tx: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Queue one event for the dispatcher task. No-op without a listener or
    /// after shutdown. The dispatcher is started lazily on first use.
    pub fn fire(&self, event: ConnectionEvent) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        let Some(listener) = &self.listener else {
            return;
        };
        tracing::debug!(?event, "firing connection event");
        let mut guard = self.tx.lock().unwrap();
        let tx = guard.get_or_insert_with(|| spawn_dispatcher(Arc::clone(listener)));
        if tx.send(event).is_err() {
            let tx = spawn_dispatcher(Arc::clone(listener));
            let _ = tx.send(event);
            *guard = Some(tx);
        }
    }

    /// Stop accepting events. Events already queued still drain to the
    /// listener; nothing new fires after this returns.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

fn spawn_dispatcher(listener: Arc<dyn ConnectionListener>) -> mpsc::UnboundedSender<ConnectionEvent> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            dispatch(&*listener, event);
        }
    });
    tx
}

fn dispatch(listener: &dyn ConnectionListener, event: ConnectionEvent) {
    match event {
        ConnectionEvent::Connected => listener.connected(),
        ConnectionEvent::Disconnected => listener.disconnected(),
        ConnectionEvent::ConnectionFailed => listener.connection_failed(),
        ConnectionEvent::Reconnecting => listener.reconnecting(),
        ConnectionEvent::Reconnected { same_server } => listener.reconnected(same_server),
    }
}
