use crate::errors::AppError;
use crate::rate_limit::identity::request_identity;
use crate::rate_limit::limiter::RateLimiter;
use crate::rate_limit::sliding_window::{RateLimitOptions, RateLimitResult};
use axum::{
    extract::{OriginalUri, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// A limiter paired with the policy of one endpoint
#[derive(Clone)]
pub struct RateLimitGuard {
    limiter: RateLimiter,
    options: Arc<RateLimitOptions>,
}

impl RateLimitGuard {
    pub fn new(limiter: RateLimiter, options: RateLimitOptions) -> Self {
        Self {
            limiter,
            options: Arc::new(options),
        }
    }
}

/// Rate limiting middleware.
///
/// Admitted requests continue with the quota headers added to the response;
/// denied ones get 429 without reaching the handler.
pub async fn rate_limit_middleware(
    State(guard): State<RateLimitGuard>,
    request: Request,
    next: Next,
) -> Response {
    let identity = request_identity(&request);
    let scope = request_scope(&request);
    let limit = guard.options.limit();

    let result = guard.limiter.check(&identity, &scope, &guard.options).await;

    if !result.ok {
        let retry_after = result.retry_after.unwrap_or(1);
        tracing::warn!(
            identity = %identity,
            scope = %guard.options.key().unwrap_or(&scope),
            limit = %limit,
            retry_after = %retry_after,
            "Rate limit exceeded"
        );

        let mut response = AppError::RateLimited { retry_after }.into_response();
        add_rate_limit_headers(response.headers_mut(), &result, limit);
        return response;
    }

    let mut response = next.run(request).await;
    add_rate_limit_headers(response.headers_mut(), &result, limit);

    response
}

/// Full request path, including any prefix stripped by nesting
fn request_scope(request: &Request) -> String {
    request
        .extensions()
        .get::<OriginalUri>()
        .map(|OriginalUri(uri)| uri.path())
        .unwrap_or_else(|| request.uri().path())
        .to_string()
}

/// Add rate limit headers to response
pub fn add_rate_limit_headers(headers: &mut HeaderMap, result: &RateLimitResult, limit: u32) {
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(result.remaining));

    if !result.ok {
        if let Some(retry_after) = result.retry_after {
            headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::clock::ManualClock;
    use crate::rate_limit::sliding_window::InMemoryHitStore;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware::from_fn_with_state,
        routing::post,
        Router,
    };
    use tower::ServiceExt;

    fn app(limit: u32, window_ms: u64) -> (Arc<ManualClock>, Router) {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = RateLimiter::new(Arc::new(InMemoryHitStore::with_clock(clock.clone())));
        let guard = RateLimitGuard::new(
            limiter,
            RateLimitOptions::new(limit, window_ms).unwrap(),
        );

        let router = Router::new().route(
            "/limited",
            post(|| async { "done" })
                .route_layer(from_fn_with_state(guard, rate_limit_middleware)),
        );

        (clock, router)
    }

    fn request_from(ip: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/limited")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_headers_for_admitted_request() {
        let mut headers = HeaderMap::new();
        add_rate_limit_headers(&mut headers, &RateLimitResult::allowed(3), 5);

        assert_eq!(headers["x-ratelimit-limit"], "5");
        assert_eq!(headers["x-ratelimit-remaining"], "3");
        assert!(headers.get(header::RETRY_AFTER).is_none());
    }

    #[test]
    fn test_headers_for_denied_request() {
        let mut headers = HeaderMap::new();
        add_rate_limit_headers(&mut headers, &RateLimitResult::denied(8), 2);

        assert_eq!(headers["x-ratelimit-limit"], "2");
        assert_eq!(headers["x-ratelimit-remaining"], "0");
        assert_eq!(headers[header::RETRY_AFTER], "8");
    }

    #[tokio::test]
    async fn test_middleware_admits_then_rejects() {
        let (clock, router) = app(2, 10_000);

        let response = router.clone().oneshot(request_from("1.2.3.4")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-remaining"], "1");

        clock.set(1_000);
        let response = router.clone().oneshot(request_from("1.2.3.4")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-remaining"], "0");

        clock.set(2_000);
        let response = router.clone().oneshot(request_from("1.2.3.4")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["x-ratelimit-limit"], "2");
        assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
        assert_eq!(response.headers()["retry-after"], "8");

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"]["code"], "rate_limited");
    }

    #[tokio::test]
    async fn test_middleware_separates_clients() {
        let (_clock, router) = app(1, 60_000);

        let response = router.clone().oneshot(request_from("1.1.1.1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router.clone().oneshot(request_from("1.1.1.1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let response = router.clone().oneshot(request_from("2.2.2.2")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
