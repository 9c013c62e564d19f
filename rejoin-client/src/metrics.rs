//! OpenTelemetry instruments for client health.
//!
//! Instruments are created through the global meter provider, so recording
//! is a no-op unless the application installs one. Enabled per client via
//! [`crate::ClientBuilder::with_metrics`].

use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter};
use opentelemetry::{global, KeyValue};
use std::time::Duration;

use crate::session::SessionState;

pub struct ClientMetrics {
    /// 0=disconnected, 1=connecting, 2=connected, 3=reconnecting, 4=closed
    connection_state: Gauge<i64>,
    requests_total: Counter<u64>,
    request_duration: Histogram<f64>,
    errors_total: Counter<u64>,
    reconnection_attempts: Counter<u64>,
    reconnection_success: Counter<u64>,
}

impl ClientMetrics {
    pub fn new(service_name: impl Into<String>) -> Self {
        let name: &'static str = Box::leak(service_name.into().into_boxed_str());
        let meter = global::meter(name);
        Self::with_meter(&meter)
    }

    pub fn with_meter(meter: &Meter) -> Self {
        Self {
            connection_state: meter
                .i64_gauge("rejoin.client.connection.state")
                .with_description(
                    "Connection state (0=disconnected, 1=connecting, 2=connected, 3=reconnecting, 4=closed)",
                )
                .build(),
            requests_total: meter
                .u64_counter("rejoin.client.requests.total")
                .with_description("Total number of requests sent")
                .build(),
            request_duration: meter
                .f64_histogram("rejoin.client.request.duration")
                .with_description("Request duration in seconds")
                .build(),
            errors_total: meter
                .u64_counter("rejoin.client.errors.total")
                .with_description("Total number of errors encountered")
                .build(),
            reconnection_attempts: meter
                .u64_counter("rejoin.client.reconnection.attempts")
                .with_description("Total number of reconnection attempts")
                .build(),
            reconnection_success: meter
                .u64_counter("rejoin.client.reconnection.success")
                .with_description("Total number of successful reconnections")
                .build(),
        }
    }

    pub(crate) fn update_connection_state(&self, state: SessionState) {
        let value = match state {
            SessionState::Disconnected => 0,
            SessionState::Connecting => 1,
            SessionState::Connected => 2,
            SessionState::Reconnecting => 3,
            SessionState::Closed => 4,
        };
        self.connection_state.record(value, &[]);
    }

    pub(crate) fn record_request(&self, method: &str, status: &str, duration: Duration) {
        let attributes = &[
            KeyValue::new("method", method.to_string()),
            KeyValue::new("status", status.to_string()),
        ];
        self.requests_total.add(1, attributes);
        self.request_duration.record(duration.as_secs_f64(), attributes);
    }

    pub(crate) fn record_error(&self, kind: &str) {
        self.errors_total
            .add(1, &[KeyValue::new("error_type", kind.to_string())]);
    }

    pub(crate) fn record_reconnection_attempt(&self) {
        self.reconnection_attempts.add(1, &[]);
    }

    pub(crate) fn record_reconnection_success(&self) {
        self.reconnection_success.add(1, &[]);
    }
}
