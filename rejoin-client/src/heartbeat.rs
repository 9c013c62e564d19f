//! Periodic heartbeat pings.
//!
//! Enabled at every successful (re)connect when configured, disabled when a
//! reconnect cycle starts and at teardown. Pings are serialized: the next
//! interval starts only after the previous ping resolves. A ping that fails
//! or times out forces the transport closed, which drives the regular
//! reconnect path.

use std::sync::{Mutex, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::client::ClientInner;
use crate::session::{Session, SessionState};

pub(crate) struct Heartbeat {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Heartbeat {
    pub fn new() -> Self {
        Self {
            task: Mutex::new(None),
        }
    }

    pub fn enable(&self, session: &Session, inner: Weak<ClientInner>, interval: Duration) {
        let mut guard = self.task.lock().unwrap();
        if guard.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        tracing::debug!(interval_ms = interval.as_millis() as u64, "heartbeat enabled");
        session.set_heartbeating(true);
        *guard = Some(tokio::spawn(run(inner, interval)));
    }

    pub fn disable(&self, session: &Session) {
        session.set_heartbeating(false);
        if let Some(task) = self.task.lock().unwrap().take() {
            task.abort();
        }
    }
}

async fn run(inner: Weak<ClientInner>, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;
        let Some(inner) = inner.upgrade() else {
            return;
        };
        if inner.session.state() != SessionState::Connected {
            return;
        }
        if let Err(error) = inner.send_ping().await {
            tracing::warn!(error = %error, "heartbeat ping failed, forcing reconnection");
            inner.close_with_reconnection().await;
            return;
        }
    }
}
