//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): completed requests by method, status
//! - `http_request_duration_seconds` (histogram): latency to body completion
//!
//! Recording is a no-op until [`init_metrics`] installs the Prometheus
//! recorder, so tests and development runs pay nothing.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus metrics listener started");
    Ok(())
}

/// Record one completed request.
pub fn record_request(method: &str, status: u16, elapsed: Duration) {
    let method = method.to_owned();
    metrics::counter!(
        "http_requests_total",
        "method" => method.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("http_request_duration_seconds", "method" => method)
        .record(elapsed.as_secs_f64());
}
