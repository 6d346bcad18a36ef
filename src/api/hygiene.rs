// Request hygiene shared by every /api route

use crate::errors::AppError;
use crate::observability::MetricsRecorder;
use axum::{
    extract::{MatchedPath, Request},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Propagates or assigns `X-Request-Id`, gives bare 405s the failure
/// envelope, and records request metrics.
pub async fn api_hygiene(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let request_id = request_id(&request);

    let span = tracing::info_span!(
        "api_request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    let mut response = next.run(request).instrument(span).await;

    if response.status() == StatusCode::METHOD_NOT_ALLOWED {
        response = method_not_allowed(response);
    }

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let status = response.status().as_u16();
    MetricsRecorder::record_http_request(method.as_str(), &path, status);
    MetricsRecorder::record_http_duration(
        method.as_str(),
        &path,
        started.elapsed().as_secs_f64(),
    );

    response
}

/// 415 for body-carrying methods without a JSON content type.
///
/// Mounted with `route_layer`, so unmatched methods are answered with 405
/// before this runs.
pub async fn require_json(request: Request, next: Next) -> Response {
    if carries_body(request.method()) && !declares_json(request.headers()) {
        tracing::debug!("Refused request without a JSON content type");
        return AppError::UnsupportedMediaType.into_response();
    }

    next.run(request).await
}

fn request_id(request: &Request) -> String {
    request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn carries_body(method: &Method) -> bool {
    [Method::POST, Method::PUT, Method::PATCH].contains(method)
}

fn declares_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.to_ascii_lowercase().contains("application/json"))
}

/// Re-render the router's empty 405, keeping its `Allow` header
fn method_not_allowed(response: Response) -> Response {
    let allow = response.headers().get(header::ALLOW).cloned();

    let mut rendered = AppError::MethodNotAllowed { allow: Vec::new() }.into_response();
    if let Some(allow) = allow {
        rendered.headers_mut().insert(header::ALLOW, allow);
    }

    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/thing", get(|| async { "thing" }).post(|| async { "posted" }))
            .route("/read-only", get(|| async { "read" }))
            .route_layer(middleware::from_fn(require_json))
            .layer(middleware::from_fn(api_hygiene))
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/thing")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-request-id"], "abc-123");
    }

    #[tokio::test]
    async fn test_request_id_is_generated() {
        let response = app()
            .oneshot(Request::builder().uri("/thing").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let id = response.headers()["x-request-id"].to_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn test_body_methods_require_json() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/thing")
                    .header("x-request-id", "r-1")
                    .header(header::CONTENT_TYPE, "text/plain")
                    .body(Body::from("hello"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(response.headers()["x-request-id"], "r-1");

        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/thing")
                    .header(header::CONTENT_TYPE, "Application/JSON; charset=utf-8")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_wrong_method_wins_over_content_type() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/read-only")
                    .header(header::CONTENT_TYPE, "text/plain")
                    .body(Body::from("hello"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let allow = response.headers()[header::ALLOW].to_str().unwrap();
        assert!(allow.contains("GET"));
        assert!(!allow.contains("POST"));
    }

    #[tokio::test]
    async fn test_method_not_allowed_gets_envelope() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/thing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let allow = response.headers()[header::ALLOW].to_str().unwrap().to_string();
        assert!(allow.contains("GET"));

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "method_not_allowed");
    }
}
