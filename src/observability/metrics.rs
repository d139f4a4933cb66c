//! Metrics collection and exposition.
//!
//! # Metrics
//! - `wallet_rpc_requests_total` (counter): calls by method, outcome
//! - `wallet_rpc_request_duration_seconds` (histogram): latency by method
//! - `wallet_endpoint_health` (gauge): per role, 1=healthy 0.5=slow 0=degraded/down, -1=unknown/offline
//! - `wallet_endpoint_probe_latency_seconds` (histogram): successful probes by role
//! - `wallet_endpoint_rotations_total` (counter): by from/to role
//! - `wallet_transactions_submitted_total` (counter): by outcome
//! - `wallet_transactions_finalized_total` (counter): by terminal status

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

use crate::health::{EndpointHealth, EndpointRole};

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_rpc_call(method: &str, ok: bool, elapsed: Duration) {
    let outcome = if ok { "ok" } else { "error" };
    metrics::counter!(
        "wallet_rpc_requests_total",
        "method" => method.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("wallet_rpc_request_duration_seconds", "method" => method.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_endpoint_health(role: EndpointRole, health: &EndpointHealth) {
    let value = match health {
        EndpointHealth::Healthy(_) => 1.0,
        EndpointHealth::Slow(_) => 0.5,
        EndpointHealth::Degraded(_) | EndpointHealth::Down(_) => 0.0,
        EndpointHealth::Unknown | EndpointHealth::Offline => -1.0,
    };
    metrics::gauge!("wallet_endpoint_health", "role" => role.as_str()).set(value);
}

pub fn record_probe_latency(role: EndpointRole, latency: Duration) {
    metrics::histogram!("wallet_endpoint_probe_latency_seconds", "role" => role.as_str())
        .record(latency.as_secs_f64());
}

pub fn record_rotation(from: EndpointRole, to: EndpointRole) {
    metrics::counter!(
        "wallet_endpoint_rotations_total",
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
}

/// `outcome` is "pending" on success or the failing error's kind.
pub fn record_submission(outcome: &'static str) {
    metrics::counter!("wallet_transactions_submitted_total", "outcome" => outcome).increment(1);
}

pub fn record_finalized(status: &'static str) {
    metrics::counter!("wallet_transactions_finalized_total", "status" => status).increment(1);
}
