use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Duel lifecycle
    pub static ref DUELS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "duels_total",
        "Duel lifecycle events",
        &["event"]
    )
    .unwrap();

    pub static ref DUELS_ACTIVE: IntGauge = register_int_gauge!(
        "duels_active",
        "Number of duels currently in the active state"
    )
    .unwrap();

    pub static ref DUEL_ANSWERS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "duel_answers_total",
        "Duel answer submissions by arbitration outcome",
        &["outcome"]
    )
    .unwrap();

    pub static ref REWARD_HOOK_FAILURES_TOTAL: IntCounter = register_int_counter!(
        "reward_hook_failures_total",
        "Reward hook calls that failed and were swallowed"
    )
    .unwrap();

    // Question provisioning
    pub static ref QUESTIONS_PROVISIONED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "questions_provisioned_total",
        "Questions served through the seen-question filter",
        &["result"]
    )
    .unwrap();

    // Presence
    pub static ref HEARTBEATS_TOTAL: IntCounter = register_int_counter!(
        "presence_heartbeats_total",
        "Total number of presence heartbeats received"
    )
    .unwrap();

    // Solo practice
    pub static ref SOLO_SESSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "solo_sessions_total",
        "Solo practice sessions by lifecycle event",
        &["event"]
    )
    .unwrap();
}

pub fn record_answer_outcome(outcome: &str) {
    DUEL_ANSWERS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_duel_event(event: &str) {
    DUELS_TOTAL.with_label_values(&[event]).inc();
}

pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}
