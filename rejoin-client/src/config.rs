//! Client configuration.

use std::env;
use std::time::Duration;

/// Environment variable overriding the process-wide default request timeout,
/// in milliseconds. A per-instance setting always wins over it.
pub const REQUEST_TIMEOUT_ENV: &str = "REJOIN_REQUEST_TIMEOUT_MS";

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_CONNECTION_LOCK_TIMEOUT_MS: u64 = 25_000;
const DEFAULT_RECONNECT_DELAY_MS: u64 = 5_000;

/// The full set of client options. Usually set through [`crate::ClientBuilder`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Maximum wait between sending a request and receiving its response.
    pub request_timeout: Duration,
    /// Maximum wait for the transport to connect.
    pub connection_timeout: Duration,
    /// Maximum wait to acquire the session-wide serialization lock. Running
    /// into this is treated as a fatal stuck state.
    pub connection_lock_timeout: Duration,
    /// Delay between attempts when reconnecting forever.
    pub reconnect_delay: Duration,
    /// Send a `closeSession` notice to the server before tearing down.
    pub send_close_message: bool,
    /// Keep retrying a failed reconnect indefinitely instead of giving up.
    pub try_reconnecting_forever: bool,
    /// Retry the transport connect when it fails with a timeout
    /// specifically; other connect errors still surface immediately.
    pub retry_if_timeout_on_connect: bool,
    /// Run server-initiated request handlers on spawned tasks. Disabling
    /// this runs handlers on the receive task, which deadlocks if a handler
    /// issues a synchronous outbound request.
    pub concurrent_server_request: bool,
    /// Ping the server at this interval once connected. A failed ping forces
    /// the transport closed and drives the reconnect path.
    pub heartbeat_interval: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(default_request_timeout_ms()),
            connection_timeout: Duration::from_millis(DEFAULT_CONNECTION_TIMEOUT_MS),
            connection_lock_timeout: Duration::from_millis(DEFAULT_CONNECTION_LOCK_TIMEOUT_MS),
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            send_close_message: false,
            try_reconnecting_forever: false,
            retry_if_timeout_on_connect: false,
            concurrent_server_request: true,
            heartbeat_interval: None,
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    env::var(REQUEST_TIMEOUT_ENV)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS)
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test covers both the plain defaults and the env override; the env
    // variable is process-global, so probing it from parallel tests would
    // race.
    #[test]
    fn defaults_and_env_override() {
        env::remove_var(REQUEST_TIMEOUT_ENV);
        let config = ClientConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.connection_lock_timeout, Duration::from_secs(25));
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert!(!config.send_close_message);
        assert!(!config.try_reconnecting_forever);
        assert!(!config.retry_if_timeout_on_connect);
        assert!(config.concurrent_server_request);
        assert!(config.heartbeat_interval.is_none());

        env::set_var(REQUEST_TIMEOUT_ENV, "1234");
        let config = ClientConfig::default();
        assert_eq!(config.request_timeout, Duration::from_millis(1234));

        env::set_var(REQUEST_TIMEOUT_ENV, "not-a-number");
        let config = ClientConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(60));

        env::remove_var(REQUEST_TIMEOUT_ENV);
    }
}
