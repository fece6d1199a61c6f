//! Request metrics
//!
//! - `api_requests_total` (counter): labels `status`, `method`
//! - `api_request_duration_seconds` (histogram): label `status`
//! - `api_replays_total` (counter): requests replayed after a refresh

/// Record one completed HTTP exchange (every attempt, replays included).
pub fn record_request(status: u16, method: &str, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!("api_requests_total", "status" => status_str.clone(), "method" => method.to_string())
        .increment(1);
    metrics::histogram!("api_request_duration_seconds", "status" => status_str)
        .record(duration_secs);
}

pub fn record_replay() {
    metrics::counter!("api_replays_total").increment(1);
}
