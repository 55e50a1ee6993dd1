//! Parse and fetch metrics recorded through the `metrics` facade.
//!
//! The library never installs a recorder; without one these calls are no-ops.

use std::time::Instant;

/// Count a terminal parse outcome and the bytes it consumed.
pub fn record_parse(outcome: &'static str, bytes: u64) {
    ::metrics::counter!("mss_manifest_parses_total", "outcome" => outcome).increment(1);
    ::metrics::histogram!("mss_manifest_parse_bytes").record(bytes as f64);
}

pub fn record_parse_duration(started_at: Instant) {
    ::metrics::histogram!("mss_manifest_parse_duration_seconds")
        .record(started_at.elapsed().as_secs_f64());
}

pub fn record_fetch_retry() {
    ::metrics::counter!("mss_manifest_fetch_retries_total").increment(1);
}
