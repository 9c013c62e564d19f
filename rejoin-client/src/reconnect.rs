//! Reconnection after a non-user transport loss.
//!
//! One spawned task per cycle serializes the attempts: first immediately,
//! then every `reconnect_delay`. The task holds only a weak reference to the
//! client internals, so an abandoned client is collected mid-cycle instead
//! of being kept alive by its own retry loop.

use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::client::ClientInner;
use crate::listener::ConnectionEvent;
use crate::session::SessionState;

pub(crate) struct ReconnectController;

impl ReconnectController {
    /// Begin a reconnect cycle: flip the session to `Reconnecting` (a no-op
    /// unless it is currently `Connected`), fire `reconnecting`, stop the
    /// heartbeat, and schedule the attempt task.
    pub(crate) fn start(inner: &ClientInner, close_reason: &str) {
        if !inner.session.begin_reconnecting() {
            return;
        }
        inner.reconnecting.store(true, Ordering::SeqCst);
        inner.notifier.fire(ConnectionEvent::Reconnecting);
        inner.heartbeat.disable(&inner.session);
        if let Some(metrics) = &inner.metrics {
            metrics.update_connection_state(SessionState::Reconnecting);
        }

        let weak = inner.weak.clone();
        let close_reason = close_reason.to_string();
        tokio::spawn(async move {
            let mut delay = Duration::ZERO;
            loop {
                tokio::time::sleep(delay).await;

                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if inner.session.closed_by_user() || !inner.reconnecting.load(Ordering::SeqCst) {
                    return;
                }

                tracing::debug!(url = %inner.url, "reconnect attempt");
                if let Some(metrics) = &inner.metrics {
                    metrics.record_reconnection_attempt();
                }

                match inner.connect_if_necessary().await {
                    Ok(()) => {
                        inner.reconnecting.store(false, Ordering::SeqCst);
                        return;
                    }
                    Err(error) if inner.config.try_reconnecting_forever => {
                        tracing::debug!(error = %error, "reconnect attempt failed, retrying");
                        delay = inner.config.reconnect_delay;
                    }
                    Err(error) => {
                        tracing::warn!(
                            error = %error,
                            url = %inner.url,
                            reason = %close_reason,
                            "giving up on reconnection"
                        );
                        inner.reconnecting.store(false, Ordering::SeqCst);
                        // a reconnect only ever starts from Connected, so
                        // this termination counts as a disconnect
                        inner.shutdown(&close_reason, true).await;
                        return;
                    }
                }
            }
        });
    }
}
