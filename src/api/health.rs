use crate::observability::{HealthChecker, MetricsRecorder};
use crate::rate_limit::RateLimiter;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

/// GET /health/live - Liveness probe
#[tracing::instrument(skip(health_checker))]
pub async fn liveness(State(health_checker): State<Arc<HealthChecker>>) -> impl IntoResponse {
    Json(health_checker.liveness().await)
}

/// GET /health/ready - Readiness probe
///
/// 503 while the rate limit store is unreachable
#[tracing::instrument(skip(health_checker))]
pub async fn readiness(State(health_checker): State<Arc<HealthChecker>>) -> impl IntoResponse {
    let status = health_checker.readiness().await;

    let code = if status.status == "ok" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (code, Json(status))
}

/// GET /metrics - Prometheus metrics
pub async fn metrics(State(limiter): State<RateLimiter>) -> Result<String, StatusCode> {
    if let Some(keys) = limiter.tracked_keys() {
        MetricsRecorder::set_rate_limit_tracked_keys(keys);
    }

    MetricsRecorder::export().map_err(|e| {
        tracing::error!("Failed to export metrics: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}
