//! Session identity and lifecycle state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// Lifecycle state of the client session.
///
/// ```text
/// Disconnected → Connecting → Connected ⇄ Reconnecting
///                     ↓            ↓            ↓
///                   Closed ←───────┴────────────┘
/// ```
///
/// `Closed` is terminal: a closed client must be discarded. `Reconnecting`
/// is entered only from `Connected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Closed,
}

/// The server-bound logical identity of this client.
///
/// A session outlives individual transport connections: the server-assigned
/// id is carried across reconnects and revalidated by the resume exchange.
#[derive(Debug)]
pub struct Session {
    session_id: RwLock<Option<String>>,
    state: RwLock<SessionState>,
    closed_by_user: AtomicBool,
    ever_connected: AtomicBool,
    heartbeating: AtomicBool,
}

impl Session {
    pub(crate) fn new() -> Self {
        Self {
            session_id: RwLock::new(None),
            state: RwLock::new(SessionState::Disconnected),
            closed_by_user: AtomicBool::new(false),
            ever_connected: AtomicBool::new(false),
            heartbeating: AtomicBool::new(false),
        }
    }

    /// The server-assigned session id, once one has been negotiated.
    pub fn session_id(&self) -> Option<String> {
        self.session_id.read().unwrap().clone()
    }

    /// Adopt a server-reported session id, unless one is already set.
    pub(crate) fn adopt_session_id(&self, session_id: &str) {
        let mut guard = self.session_id.write().unwrap();
        if guard.is_none() {
            tracing::debug!(session_id, "session id adopted");
            *guard = Some(session_id.to_string());
        }
    }

    pub(crate) fn clear_session_id(&self) {
        *self.session_id.write().unwrap() = None;
    }

    pub fn state(&self) -> SessionState {
        *self.state.read().unwrap()
    }

    pub(crate) fn set_state(&self, state: SessionState) {
        *self.state.write().unwrap() = state;
    }

    /// Enter `Reconnecting`, permitted only from `Connected`. Returns false
    /// otherwise, which also keeps racing transport-close reports from
    /// starting two reconnect cycles.
    pub(crate) fn begin_reconnecting(&self) -> bool {
        let mut guard = self.state.write().unwrap();
        if *guard == SessionState::Connected {
            *guard = SessionState::Reconnecting;
            true
        } else {
            false
        }
    }

    pub fn closed_by_user(&self) -> bool {
        self.closed_by_user.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_closed_by_user(&self) {
        self.closed_by_user.store(true, Ordering::SeqCst);
    }

    pub fn ever_connected(&self) -> bool {
        self.ever_connected.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_ever_connected(&self) {
        self.ever_connected.store(true, Ordering::SeqCst);
    }

    pub fn heartbeating(&self) -> bool {
        self.heartbeating.load(Ordering::SeqCst)
    }

    pub(crate) fn set_heartbeating(&self, on: bool) {
        self.heartbeating.store(on, Ordering::SeqCst);
    }
}
