use metrics::{counter, histogram};
use std::time::Duration;

/// Record one dispatched API request (each attempt counts, replays included).
pub fn record_request(method: &str, status: u16, elapsed: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];

    counter!("api_requests_total", &labels).increment(1);
    histogram!("api_request_duration_seconds", &labels).record(elapsed.as_secs_f64());
}

/// Record the outcome of a refresh-token exchange.
pub fn record_refresh(outcome: &'static str) {
    counter!("token_refresh_total", "outcome" => outcome).increment(1);
}
