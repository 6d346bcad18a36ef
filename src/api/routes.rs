use crate::{
    api::{auth, health, hygiene, payments, time, users},
    config::Config,
    directory::UserDirectory,
    errors::{AppError, ErrorBody, Result},
    observability::HealthChecker,
    rate_limit::{rate_limit_middleware, RateLimitGuard, RateLimitOptions, RateLimiter},
};
use axum::{
    extract::FromRef,
    http::{header, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::any::Any;
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub config: Arc<Config>,
    pub limiter: RateLimiter,
    pub users: Arc<UserDirectory>,
    pub health_checker: Arc<HealthChecker>,
}

impl AppState {
    pub fn new(config: Config, limiter: RateLimiter) -> Self {
        Self {
            config: Arc::new(config),
            health_checker: Arc::new(HealthChecker::new(limiter.clone())),
            limiter,
            users: Arc::new(UserDirectory::new()),
        }
    }
}

pub fn create_router(state: AppState) -> Result<Router> {
    let checkout = RateLimitGuard::new(
        state.limiter.clone(),
        RateLimitOptions::try_from(&state.config.rate_limit.checkout)?,
    );
    let register = RateLimitGuard::new(
        state.limiter.clone(),
        RateLimitOptions::try_from(&state.config.rate_limit.register)?,
    );

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    let router = Router::new()
        // Health endpoints
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/metrics", get(health::metrics))
        .nest("/api", api_routes(checkout, register))
        // Add middleware
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains; preload"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'self'; script-src 'self'; object-src 'none';"),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    Ok(router)
}

fn api_routes(checkout: RateLimitGuard, register: RateLimitGuard) -> Router<AppState> {
    Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/auth/register",
            post(auth::register)
                .route_layer(middleware::from_fn_with_state(register, rate_limit_middleware)),
        )
        .route(
            "/stripe/checkout",
            post(payments::checkout)
                .route_layer(middleware::from_fn_with_state(checkout, rate_limit_middleware)),
        )
        .route("/stripe/ping", get(payments::ping))
        .route("/stripe/webhook", post(payments::webhook))
        .route("/time", get(time::current_time))
        // Only reached once a method route matched, so 405 takes precedence
        .route_layer(middleware::from_fn(hygiene::require_json))
        .layer(middleware::from_fn(hygiene::api_hygiene))
}

/// Panics become the same 500 envelope as any other internal error
fn handle_panic(_panic: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("Handler panicked");

    let status = StatusCode::INTERNAL_SERVER_ERROR;
    let code = AppError::Internal(String::new()).code();
    (status, Json(ErrorBody::new(code, "Internal server error"))).into_response()
}
