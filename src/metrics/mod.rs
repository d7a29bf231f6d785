//! Prometheus metrics.
//!
//! Covers the HTTP admin surface plus the four background workers: bets
//! admitted and cancelled, fills and liquidity consumed by the matching and
//! liquidity engines, and events resolved. No market-data or order-book
//! metrics -- those belong to a surface outside this core (spec's
//! Non-goals).

#![allow(dead_code)]

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

pub mod names {
    // HTTP admin surface
    pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "http_requests_in_flight";

    // Admission / cancellation
    pub const BETS_PLACED_TOTAL: &str = "bets_placed_total";
    pub const BETS_CANCELLED_TOTAL: &str = "bets_cancelled_total";
    pub const BET_ADMISSION_DURATION_SECONDS: &str = "bet_admission_duration_seconds";

    // Matching worker
    pub const MATCHED_FILLS_TOTAL: &str = "matched_fills_total";
    pub const MATCHING_TICK_DURATION_SECONDS: &str = "matching_tick_duration_seconds";
    pub const MATCHING_TICK_FAILURES_TOTAL: &str = "matching_tick_failures_total";

    // Liquidity engine
    pub const LIQUIDITY_SYNTHESIZED_TOTAL: &str = "liquidity_synthesized_total";
    pub const LIQUIDITY_CONSUMED: &str = "liquidity_consumed";
    pub const LIQUIDITY_TICK_DURATION_SECONDS: &str = "liquidity_tick_duration_seconds";

    // Event state / resolver
    pub const EVENT_TRANSITIONS_TOTAL: &str = "event_transitions_total";
    pub const EVENTS_RESOLVED_TOTAL: &str = "events_resolved_total";
    pub const RESOLVER_TICK_DURATION_SECONDS: &str = "resolver_tick_duration_seconds";
}

pub mod labels {
    pub const METHOD: &str = "method";
    pub const ENDPOINT: &str = "endpoint";
    pub const STATUS: &str = "status";
    pub const BET_TYPE: &str = "bet_type";
    pub const WORKER: &str = "worker";
    pub const TO_STATUS: &str = "to_status";
}

/// Installs the process-wide Prometheus recorder and returns the handle the
/// admin surface renders on `/metrics`.
pub fn init_metrics() -> PrometheusHandle {
    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(names::HTTP_REQUEST_DURATION_SECONDS.to_string()),
            &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )
        .unwrap()
        .set_buckets_for_metric(
            Matcher::Full(names::BET_ADMISSION_DURATION_SECONDS.to_string()),
            &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.5, 1.0],
        )
        .unwrap()
        .set_buckets_for_metric(
            Matcher::Full(names::MATCHING_TICK_DURATION_SECONDS.to_string()),
            &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )
        .unwrap()
        .set_buckets_for_metric(
            Matcher::Full(names::LIQUIDITY_TICK_DURATION_SECONDS.to_string()),
            &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )
        .unwrap()
        .set_buckets_for_metric(
            Matcher::Full(names::RESOLVER_TICK_DURATION_SECONDS.to_string()),
            &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )
        .unwrap();

    builder.install_recorder().expect("failed to install Prometheus recorder")
}

// ---------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------

pub fn record_http_request(method: &str, endpoint: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    counter!(
        names::HTTP_REQUESTS_TOTAL,
        labels::METHOD => method.to_string(),
        labels::ENDPOINT => endpoint.to_string(),
        labels::STATUS => status_str.clone()
    )
    .increment(1);

    histogram!(
        names::HTTP_REQUEST_DURATION_SECONDS,
        labels::METHOD => method.to_string(),
        labels::ENDPOINT => endpoint.to_string(),
        labels::STATUS => status_str
    )
    .record(duration_secs);
}

pub fn set_http_requests_in_flight(delta: i64) {
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).set(delta as f64);
}

// ---------------------------------------------------------------------
// Admission / cancellation
// ---------------------------------------------------------------------

pub fn record_bet_placed(bet_type: &str, duration_secs: f64) {
    counter!(names::BETS_PLACED_TOTAL, labels::BET_TYPE => bet_type.to_string()).increment(1);
    histogram!(names::BET_ADMISSION_DURATION_SECONDS).record(duration_secs);
}

pub fn record_bet_cancelled(bet_type: &str) {
    counter!(names::BETS_CANCELLED_TOTAL, labels::BET_TYPE => bet_type.to_string()).increment(1);
}

// ---------------------------------------------------------------------
// Matching worker
// ---------------------------------------------------------------------

pub fn record_matched_fills(count: u64) {
    counter!(names::MATCHED_FILLS_TOTAL).increment(count);
}

pub fn record_matching_tick(duration_secs: f64) {
    histogram!(names::MATCHING_TICK_DURATION_SECONDS).record(duration_secs);
}

pub fn record_matching_tick_failure() {
    counter!(names::MATCHING_TICK_FAILURES_TOTAL).increment(1);
}

// ---------------------------------------------------------------------
// Liquidity engine
// ---------------------------------------------------------------------

pub fn record_liquidity_synthesized(count: u64) {
    counter!(names::LIQUIDITY_SYNTHESIZED_TOTAL).increment(count);
}

pub fn set_liquidity_consumed(event_id: &str, consumed: f64) {
    gauge!(names::LIQUIDITY_CONSUMED, "event_id" => event_id.to_string()).set(consumed);
}

pub fn record_liquidity_tick(duration_secs: f64) {
    histogram!(names::LIQUIDITY_TICK_DURATION_SECONDS).record(duration_secs);
}

// ---------------------------------------------------------------------
// Event state / resolver
// ---------------------------------------------------------------------

pub fn record_event_transition(to_status: &str) {
    counter!(names::EVENT_TRANSITIONS_TOTAL, labels::TO_STATUS => to_status.to_string()).increment(1);
}

pub fn record_events_resolved(count: u64) {
    counter!(names::EVENTS_RESOLVED_TOTAL).increment(count);
}

pub fn record_resolver_tick(duration_secs: f64) {
    histogram!(names::RESOLVER_TICK_DURATION_SECONDS).record(duration_secs);
}

// ---------------------------------------------------------------------
// Timer helper
// ---------------------------------------------------------------------

pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_measures_elapsed_time() {
        let timer = Timer::new();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let elapsed = timer.elapsed_secs();
        assert!(elapsed >= 0.01);
        assert!(elapsed < 0.5);
    }

    #[test]
    fn metric_names_are_stable() {
        assert_eq!(names::HTTP_REQUESTS_TOTAL, "http_requests_total");
        assert_eq!(names::BETS_PLACED_TOTAL, "bets_placed_total");
        assert_eq!(names::MATCHED_FILLS_TOTAL, "matched_fills_total");
    }
}
