//! Metrics collection and exposition.
//!
//! # Metrics
//! - `camille_connections_accepted_total` (counter)
//! - `camille_active_connections` (gauge): sessions currently open
//! - `camille_requests_total` (counter): completed requests by method
//! - `camille_parse_errors_total` (counter): rejected requests by error kind
//! - `camille_sessions_closed_total` (counter): closed sessions by reason
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::http::{Method, ParseError};

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn connection_opened() {
    counter!("camille_connections_accepted_total").increment(1);
    gauge!("camille_active_connections").increment(1.0);
}

pub fn connection_closed() {
    gauge!("camille_active_connections").decrement(1.0);
}

pub fn record_request(method: Method) {
    counter!("camille_requests_total", "method" => method.as_str()).increment(1);
}

pub fn record_parse_error(error: ParseError) {
    counter!("camille_parse_errors_total", "kind" => error.as_str()).increment(1);
}

pub fn record_session_closed(reason: &'static str) {
    counter!("camille_sessions_closed_total", "reason" => reason).increment(1);
}
