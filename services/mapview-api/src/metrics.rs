//! Request and render counters, exported through the Prometheus recorder.

use std::time::Duration;

/// Count one protocol request ("wms", "wmts", "wfs", "navigation").
pub fn record_request(protocol: &'static str) {
    metrics::counter!("mapview_requests_total", "protocol" => protocol).increment(1);
}

/// Record one render call outcome and duration.
pub fn record_render(elapsed: Duration, success: bool) {
    let outcome = if success { "ok" } else { "error" };
    metrics::counter!("mapview_renders_total", "outcome" => outcome).increment(1);
    metrics::histogram!("mapview_render_seconds").record(elapsed.as_secs_f64());
}
