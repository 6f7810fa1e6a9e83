//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_tls_reloads_total` (counter): certificate (re)loads by outcome
//! - `proxy_tls_earliest_expiry_seconds` (gauge): time until the first chain expiry
//! - `proxy_tls_health_checks_total` (counter): monitor cycles by outcome
//! - `proxy_lifecycle_state` (gauge): 0=Bootstrap, 1=Daemon, 2=Shutdown
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so tests need no setup

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::lifecycle::LifecycleState;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_cert_reload(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!("proxy_tls_reloads_total", "outcome" => outcome).increment(1);
}

pub fn record_cert_expiry(remaining_secs: i64) {
    metrics::gauge!("proxy_tls_earliest_expiry_seconds").set(remaining_secs as f64);
}

pub fn record_health_check(outcome: &'static str) {
    metrics::counter!("proxy_tls_health_checks_total", "outcome" => outcome).increment(1);
}

pub fn record_lifecycle_state(state: LifecycleState) {
    let value = match state {
        LifecycleState::Bootstrap => 0.0,
        LifecycleState::Daemon => 1.0,
        LifecycleState::Shutdown => 2.0,
    };
    metrics::gauge!("proxy_lifecycle_state").set(value);
}
