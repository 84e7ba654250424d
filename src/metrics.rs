/// Prometheus metrics for CivicFix
///
/// Covers HTTP traffic, the citizen workflow (reports, votes, logins),
/// moderation actions and background jobs.

use axum::{
    extract::{MatchedPath, Request},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};
use std::time::Instant;

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, route, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "civicfix_http_requests_total",
        "Total number of HTTP requests",
        &["method", "route", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "civicfix_http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "route"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .unwrap();

    pub static ref HTTP_REQUESTS_ACTIVE: IntGauge = register_int_gauge!(
        "civicfix_http_requests_active",
        "Number of HTTP requests currently being processed"
    )
    .unwrap();

    // ========== Workflow Metrics ==========

    pub static ref ISSUES_REPORTED_TOTAL: IntCounter = register_int_counter!(
        "civicfix_issues_reported_total",
        "Total number of issues reported by citizens"
    )
    .unwrap();

    /// Vote toggles by direction ("on" / "off")
    pub static ref VOTES_TOGGLED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "civicfix_votes_toggled_total",
        "Total number of vote toggles",
        &["direction"]
    )
    .unwrap();

    /// Login attempts by outcome
    pub static ref LOGINS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "civicfix_logins_total",
        "Total number of login attempts",
        &["outcome"]
    )
    .unwrap();

    // ========== Moderation Metrics ==========

    pub static ref MODERATION_ACTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "civicfix_moderation_actions_total",
        "Total number of moderation actions",
        &["action"]
    )
    .unwrap();

    // ========== Background Job Metrics ==========

    pub static ref BACKGROUND_JOBS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "civicfix_background_jobs_total",
        "Total number of background job executions",
        &["job", "status"]
    )
    .unwrap();

    pub static ref BACKGROUND_JOB_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "civicfix_background_job_duration_seconds",
        "Background job execution time in seconds",
        &["job"],
        vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 30.0]
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }

    String::from_utf8(buffer).unwrap_or_default()
}

/// `GET /metrics`
pub async fn metrics_handler() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        render_metrics(),
    )
        .into_response()
}

/// Record an HTTP request
pub fn record_http_request(method: &str, route: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, route, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, route])
        .observe(duration);
}

pub fn record_issue_reported() {
    ISSUES_REPORTED_TOTAL.inc();
}

pub fn record_vote(voted: bool) {
    VOTES_TOGGLED_TOTAL
        .with_label_values(&[if voted { "on" } else { "off" }])
        .inc();
}

/// Record a login attempt ("success", "invalid", "banned")
pub fn record_login(outcome: &str) {
    LOGINS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_moderation_action(action: &str) {
    MODERATION_ACTIONS_TOTAL.with_label_values(&[action]).inc();
}

/// Record a background job execution
pub fn record_background_job(job: &str, status: &str, duration: f64) {
    BACKGROUND_JOBS_TOTAL.with_label_values(&[job, status]).inc();
    BACKGROUND_JOB_DURATION_SECONDS
        .with_label_values(&[job])
        .observe(duration);
}

/// Middleware recording request counts and latencies by matched route
pub async fn track_http_metrics(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    // Label by route template so ids don't explode cardinality
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    HTTP_REQUESTS_ACTIVE.inc();
    let started = Instant::now();
    let response = next.run(request).await;
    HTTP_REQUESTS_ACTIVE.dec();

    record_http_request(
        &method,
        &route,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );

    response
}
