use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

// Metrics registry
static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap()
});

static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latency in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.010, 0.050, 0.100, 0.500, 1.0, 5.0]
    )
    .unwrap()
});

static RATE_LIMIT_DECISIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "rate_limit_decisions_total",
        "Rate limiter admissions and denials",
        &["scope", "decision"]
    )
    .unwrap()
});

static RATE_LIMIT_STORE_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "rate_limit_store_errors_total",
        "Rate limit checks that failed open because the store errored",
        &["backend"]
    )
    .unwrap()
});

// Keys are never evicted, so this only grows
static RATE_LIMIT_TRACKED_KEYS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "rate_limit_tracked_keys",
        "Number of rate limit buckets held in memory"
    )
    .unwrap()
});

pub struct MetricsRecorder;

impl MetricsRecorder {
    pub fn record_http_request(method: &str, path: &str, status: u16) {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&[method, path, &status.to_string()])
            .inc();
    }

    pub fn record_http_duration(method: &str, path: &str, duration: f64) {
        HTTP_REQUEST_DURATION
            .with_label_values(&[method, path])
            .observe(duration);
    }

    pub fn record_rate_limit_decision(scope: &str, allowed: bool) {
        let decision = if allowed { "allowed" } else { "denied" };
        RATE_LIMIT_DECISIONS_TOTAL
            .with_label_values(&[scope, decision])
            .inc();
    }

    pub fn record_rate_limit_store_error(backend: &str) {
        RATE_LIMIT_STORE_ERRORS_TOTAL
            .with_label_values(&[backend])
            .inc();
    }

    pub fn set_rate_limit_tracked_keys(count: usize) {
        RATE_LIMIT_TRACKED_KEYS.set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Export all metrics in Prometheus format
    pub fn export() -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        encoder.encode_to_string(&metric_families)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_includes_rate_limit_metrics() {
        MetricsRecorder::record_rate_limit_decision("/metrics-test", true);
        MetricsRecorder::record_rate_limit_decision("/metrics-test", false);
        MetricsRecorder::set_rate_limit_tracked_keys(3);

        let exported = MetricsRecorder::export().unwrap();
        assert!(exported.contains("rate_limit_decisions_total"));
        assert!(exported.contains("scope=\"/metrics-test\""));
        assert!(exported.contains("rate_limit_tracked_keys"));
    }
}
