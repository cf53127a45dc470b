//! Prometheus metrics for the proxy.
//!
//! The recorder is installed once per process; later calls to [`install`]
//! return the same handle so routers built in tests share it.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::warn;

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder and return a handle for rendering.
pub fn install() -> PrometheusHandle {
    HANDLE
        .get_or_init(|| {
            let recorder = PrometheusBuilder::new().build_recorder();
            let handle = recorder.handle();
            if metrics::set_global_recorder(recorder).is_err() {
                warn!("A global metrics recorder was already installed");
            }
            handle
        })
        .clone()
}

/// Count a finished `/proxy` request by response status.
pub fn record_request(status: u16) {
    counter!("playlist_proxy_requests_total", "status" => status.to_string()).increment(1);
}

/// Record time from request arrival until the response head was produced.
pub fn record_duration(start: Instant) {
    histogram!("playlist_proxy_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Count a processed playlist definition (`ok`, `skipped`, `fetch_error`).
pub fn record_definition(outcome: &'static str) {
    counter!("playlist_proxy_definitions_total", "outcome" => outcome).increment(1);
}

/// Count a fetch failure by kind.
pub fn record_fetch_error(kind: &'static str) {
    counter!("playlist_proxy_fetch_errors_total", "kind" => kind).increment(1);
}

pub fn record_line_rewritten() {
    counter!("playlist_proxy_lines_rewritten_total").increment(1);
}

pub fn record_bytes_streamed(bytes: u64) {
    counter!("playlist_proxy_bytes_streamed_total").increment(bytes);
}
